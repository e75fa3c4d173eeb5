//! Mock caller context.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use gpiodev_core::{
    BackendError, BackendResult, CallerContext, RequestRecord, Status, Ticket, PAYLOAD_SIZE,
};

/// Record of one completion signal observed by the caller.
#[derive(Debug, Clone)]
pub struct Completion {
    /// Ticket of the completed request.
    pub ticket: Ticket,
    /// Terminal status.
    pub status: Status,
    /// Bytes produced.
    pub actual: u32,
}

/// Caller context backed by an in-memory payload buffer.
///
/// One `MockCaller` accompanies one request, mirroring how a host threads
/// a per-request context through the dispatcher. Completions are recorded
/// rather than delivered anywhere, so tests can assert how many terminal
/// signals a request received and with what status.
pub struct MockCaller {
    payload: Mutex<[u8; PAYLOAD_SIZE]>,
    completions: Mutex<Vec<Completion>>,
    background: AtomicBool,
}

impl Default for MockCaller {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCaller {
    /// Create a caller with a zeroed payload area.
    pub fn new() -> Self {
        Self {
            payload: Mutex::new([0; PAYLOAD_SIZE]),
            completions: Mutex::new(Vec::new()),
            background: AtomicBool::new(false),
        }
    }

    /// Create a caller whose payload area starts with the given bytes.
    pub fn with_payload(bytes: &[u8]) -> Self {
        let caller = Self::new();
        caller.payload.lock()[..bytes.len()].copy_from_slice(bytes);
        caller
    }

    /// Snapshot of the payload area.
    pub fn payload(&self) -> [u8; PAYLOAD_SIZE] {
        *self.payload.lock()
    }

    /// Byte of the payload area at `offset`.
    pub fn payload_byte(&self, offset: usize) -> u8 {
        self.payload.lock()[offset]
    }

    /// Snapshot of all completions observed so far.
    pub fn completions(&self) -> Vec<Completion> {
        self.completions.lock().clone()
    }

    /// Number of completion signals observed.
    pub fn completion_count(&self) -> usize {
        self.completions.lock().len()
    }

    /// Block until at least `n` completions arrive or the timeout expires.
    ///
    /// Returns `true` if the count was reached. Polling is fine here: the
    /// deferred path completes from a worker thread and tests only need an
    /// upper bound.
    pub fn wait_for_completions(&self, n: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if self.completion_count() >= n {
                return true;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        self.completion_count() >= n
    }
}

impl CallerContext for MockCaller {
    fn read_payload(&self, buf: &mut [u8]) -> BackendResult<()> {
        let payload = self.payload.lock();
        let n = buf.len().min(payload.len());
        buf[..n].copy_from_slice(&payload[..n]);
        Ok(())
    }

    fn write_payload(&self, offset: usize, data: &[u8]) -> BackendResult<()> {
        let mut payload = self.payload.lock();
        let end = offset.checked_add(data.len()).filter(|&e| e <= payload.len());
        let Some(end) = end else {
            return Err(BackendError::PayloadOutOfRange {
                offset,
                len: data.len(),
                size: payload.len(),
            });
        };
        payload[offset..end].copy_from_slice(data);
        Ok(())
    }

    fn complete(&self, record: RequestRecord) {
        self.completions.lock().push(Completion {
            ticket: record.ticket,
            status: record.status,
            actual: record.actual,
        });
    }

    fn set_background(&self) {
        self.background.store(true, Ordering::SeqCst);
    }

    fn is_background(&self) -> bool {
        self.background.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gpiodev_core::UnitHandle;

    #[test]
    fn test_payload_copy_in_out() {
        let caller = MockCaller::with_payload(&[4, 1]);
        let mut buf = [0u8; PAYLOAD_SIZE];
        caller.read_payload(&mut buf).expect("read");
        assert_eq!(buf[0], 4);
        assert_eq!(buf[1], 1);

        caller.write_payload(1, &[7]).expect("write");
        assert_eq!(caller.payload_byte(1), 7);
    }

    #[test]
    fn test_write_out_of_range() {
        let caller = MockCaller::new();
        assert!(matches!(
            caller.write_payload(PAYLOAD_SIZE, &[1]),
            Err(BackendError::PayloadOutOfRange { .. })
        ));
    }

    #[test]
    fn test_completion_recording() {
        let caller = MockCaller::new();
        assert_eq!(caller.completion_count(), 0);

        let mut record = RequestRecord::new(UnitHandle(1), 1, Ticket(9));
        record.status = Status::Aborted;
        caller.complete(record);

        let completions = caller.completions();
        assert_eq!(completions.len(), 1);
        assert_eq!(completions[0].ticket, Ticket(9));
        assert_eq!(completions[0].status, Status::Aborted);
    }

    #[test]
    fn test_background_flag() {
        let caller = MockCaller::new();
        assert!(!caller.is_background());
        caller.set_background();
        assert!(caller.is_background());
    }
}
