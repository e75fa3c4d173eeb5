//! The dispatch routine: a pure command interpreter.
//!
//! [`execute`] takes one request record and runs it against a unit's
//! [`LineSet`], reporting a [`Disposition`]: terminal status, bytes
//! produced, and whether the command deferred. It has no knowledge of
//! queues or workers; both the quick path and the worker loop call it the
//! same way.
//!
//! Side effect discipline: only `Configure` mutates line ownership.
//! `Read` and `Write` assume the channel was configured earlier; the
//! backend rejects unconfigured access and the fault is surfaced as an
//! [`Status::IoError`] on the current command only.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use gpiodev_core::{
    BackendError, CallerContext, Command, DeviceDescriptor, Direction, Level, Line, LineChip,
    Pull, RequestRecord, Status, Trigger, PAYLOAD_DIRECTION, PAYLOAD_PULL, PAYLOAD_TRIGGER,
    PAYLOAD_VALUE,
};

/// Outcome of one dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Disposition {
    /// Terminal status for the record (meaningless while `deferred`).
    pub status: Status,
    /// Bytes produced by the command.
    pub actual: u32,
    /// Command did not complete and must be parked in the pending registry.
    pub deferred: bool,
}

impl Disposition {
    /// Completed successfully, producing `actual` bytes.
    pub fn ok(actual: u32) -> Self {
        Self {
            status: Status::Ok,
            actual,
            deferred: false,
        }
    }

    /// Completed with an error status.
    pub fn error(status: Status) -> Self {
        Self {
            status,
            actual: 0,
            deferred: false,
        }
    }

    /// Did not complete; caller must park the request.
    pub fn deferred() -> Self {
        Self {
            status: Status::Ok,
            actual: 0,
            deferred: true,
        }
    }
}

/// A unit's view of its chip and configured lines.
pub struct LineSet {
    chip: Arc<dyn LineChip>,
    consumer: String,
    lines: Mutex<HashMap<u8, Arc<dyn Line>>>,
}

impl LineSet {
    /// Create an empty line set over a chip.
    pub fn new(chip: Arc<dyn LineChip>, consumer: String) -> Self {
        Self {
            chip,
            consumer,
            lines: Mutex::new(HashMap::new()),
        }
    }

    /// The line configured for a channel, if any.
    pub fn configured(&self, channel: u8) -> Option<Arc<dyn Line>> {
        self.lines.lock().get(&channel).cloned()
    }

    fn store(&self, channel: u8, line: Arc<dyn Line>) {
        self.lines.lock().insert(channel, line);
    }
}

/// Whether a command code is eligible for quick (synchronous) completion.
///
/// `Wait` never is; everything else, unknown codes included, completes
/// without deferral (unknown codes complete inline with `NoCommand`).
pub fn can_quick(command: u16) -> bool {
    !matches!(Command::from_raw(command), Some(Command::Wait))
}

/// Execute one command against a unit's lines.
pub fn execute(record: &RequestRecord, lines: &LineSet, ctx: &dyn CallerContext) -> Disposition {
    match Command::from_raw(record.command) {
        Some(Command::Read) => read(record, lines, ctx),
        Some(Command::Write) => write(record, lines),
        Some(Command::Wait) => wait(record),
        Some(Command::Configure) => configure(record, lines),
        Some(Command::Query) => query(ctx),
        None => {
            warn!(command = record.command, "unknown command code");
            Disposition::error(Status::NoCommand)
        }
    }
}

fn io_fault(command: &'static str, channel: u8, err: &BackendError) -> Disposition {
    warn!(command, channel, error = %err, "backend fault");
    Disposition::error(Status::IoError)
}

fn read(record: &RequestRecord, lines: &LineSet, ctx: &dyn CallerContext) -> Disposition {
    let channel = record.channel();
    let Some(line) = lines.configured(channel) else {
        return io_fault("read", channel, &BackendError::NotConfigured { channel });
    };
    let level = match line.get_value() {
        Ok(level) => level,
        Err(e) => return io_fault("read", channel, &e),
    };
    debug!(channel, level = level.as_u8(), "read line");
    match ctx.write_payload(PAYLOAD_VALUE, &[level.as_u8()]) {
        Ok(()) => Disposition::ok(1),
        Err(e) => io_fault("read", channel, &e),
    }
}

fn write(record: &RequestRecord, lines: &LineSet) -> Disposition {
    let channel = record.channel();
    let level = Level::from_u8(record.payload[PAYLOAD_VALUE]);
    let Some(line) = lines.configured(channel) else {
        return io_fault("write", channel, &BackendError::NotConfigured { channel });
    };
    match line.set_value(level) {
        Ok(()) => {
            debug!(channel, level = level.as_u8(), "wrote line");
            Disposition::ok(0)
        }
        Err(e) => io_fault("write", channel, &e),
    }
}

fn wait(record: &RequestRecord) -> Disposition {
    let channel = record.channel();
    let Some(trigger) = Trigger::from_raw(record.payload[PAYLOAD_TRIGGER]) else {
        return Disposition::error(Status::BadLength);
    };
    // Completion arrives only through resolve or abort.
    debug!(channel, ?trigger, "wait deferred");
    Disposition::deferred()
}

fn configure(record: &RequestRecord, lines: &LineSet) -> Disposition {
    let channel = record.channel();
    let Some(direction) = Direction::from_raw(record.payload[PAYLOAD_DIRECTION]) else {
        return Disposition::error(Status::BadLength);
    };
    let Some(pull) = Pull::from_raw(record.payload[PAYLOAD_PULL]) else {
        return Disposition::error(Status::BadLength);
    };

    let line = match lines.chip.get_line(channel) {
        Ok(line) => line,
        Err(e) => return io_fault("configure", channel, &e),
    };
    let requested = match direction {
        Direction::Input => line.request_input(&lines.consumer),
        Direction::Output => line.request_output(&lines.consumer, Level::Low),
    };
    if let Err(e) = requested {
        return io_fault("configure", channel, &e);
    }
    if pull != Pull::None {
        // Real chips on this path cannot express bias; accepted without effect.
        warn!(channel, ?pull, "pull mode not supported; accepted without effect");
    }
    lines.store(channel, line);
    debug!(channel, ?direction, "configured line");
    Disposition::ok(0)
}

fn query(ctx: &dyn CallerContext) -> Disposition {
    let descriptor = DeviceDescriptor::current().encode();
    match ctx.write_payload(0, &descriptor) {
        Ok(()) => Disposition::ok(descriptor.len() as u32),
        Err(e) => io_fault("query", 0, &e),
    }
}
