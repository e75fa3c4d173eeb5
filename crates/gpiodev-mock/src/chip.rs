//! In-memory line backend.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use gpiodev_core::{BackendError, BackendResult, Direction, GpioBackend, Level, Line, LineChip};

/// Default number of lines on a mock chip.
const DEFAULT_LINES: u32 = 64;

/// Backend that creates in-memory chips on demand.
///
/// Chips are shared by name, so two units opening the same chip observe
/// the same line state, matching real hardware.
#[derive(Default)]
pub struct MockBackend {
    chips: Mutex<HashMap<String, Arc<MockChip>>>,
    fail_open: AtomicBool,
}

impl MockBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `open_chip` fail, for open-failure tests.
    pub fn set_fail_open(&self, fail: bool) {
        self.fail_open.store(fail, Ordering::SeqCst);
    }

    /// Get the chip for a name if it has already been opened.
    pub fn chip(&self, name: &str) -> Option<Arc<MockChip>> {
        self.chips.lock().get(name).cloned()
    }
}

impl GpioBackend for MockBackend {
    fn open_chip(&self, name: &str) -> BackendResult<Arc<dyn LineChip>> {
        if self.fail_open.load(Ordering::SeqCst) {
            return Err(BackendError::ChipNotFound {
                name: name.to_string(),
                message: "mock open failure injected".to_string(),
            });
        }
        let chip = self
            .chips
            .lock()
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(MockChip::new(name, DEFAULT_LINES)))
            .clone();
        debug!(chip = name, "opened mock chip");
        Ok(chip)
    }
}

/// One in-memory chip.
pub struct MockChip {
    name: String,
    max_lines: u32,
    lines: Mutex<HashMap<u8, Arc<MockLine>>>,
    fail_get_line: AtomicBool,
}

impl MockChip {
    /// Create a chip with the given line count.
    pub fn new(name: &str, max_lines: u32) -> Self {
        Self {
            name: name.to_string(),
            max_lines,
            lines: Mutex::new(HashMap::new()),
            fail_get_line: AtomicBool::new(false),
        }
    }

    /// Make every subsequent `get_line` fail.
    pub fn set_fail_get_line(&self, fail: bool) {
        self.fail_get_line.store(fail, Ordering::SeqCst);
    }

    /// Typed access to a line for test assertions.
    pub fn line(&self, channel: u8) -> Option<Arc<MockLine>> {
        self.lines.lock().get(&channel).cloned()
    }
}

impl LineChip for MockChip {
    fn get_line(&self, channel: u8) -> BackendResult<Arc<dyn Line>> {
        if self.fail_get_line.load(Ordering::SeqCst) {
            return Err(BackendError::Hardware {
                message: "mock get_line failure injected".to_string(),
            });
        }
        if u32::from(channel) >= self.max_lines {
            return Err(BackendError::InvalidChannel {
                channel,
                max: self.max_lines,
            });
        }
        let line = self
            .lines
            .lock()
            .entry(channel)
            .or_insert_with(|| Arc::new(MockLine::new(channel)))
            .clone();
        Ok(line)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Default)]
struct LineState {
    level: Option<Level>,
    direction: Option<Direction>,
    consumer: Option<String>,
}

/// One in-memory line.
pub struct MockLine {
    channel: u8,
    state: Mutex<LineState>,
    fail_io: AtomicBool,
}

impl MockLine {
    fn new(channel: u8) -> Self {
        Self {
            channel,
            state: Mutex::new(LineState::default()),
            fail_io: AtomicBool::new(false),
        }
    }

    /// Make every subsequent `get_value`/`set_value` fail.
    pub fn set_fail_io(&self, fail: bool) {
        self.fail_io.store(fail, Ordering::SeqCst);
    }

    /// Current level, if the line has ever been driven or configured.
    pub fn level(&self) -> Option<Level> {
        self.state.lock().level
    }

    /// Configured direction, if any.
    pub fn direction(&self) -> Option<Direction> {
        self.state.lock().direction
    }

    /// Consumer label from the last request, if any.
    pub fn consumer(&self) -> Option<String> {
        self.state.lock().consumer.clone()
    }

    fn check_io(&self) -> BackendResult<()> {
        if self.fail_io.load(Ordering::SeqCst) {
            return Err(BackendError::Hardware {
                message: format!("mock i/o failure injected on line {}", self.channel),
            });
        }
        Ok(())
    }
}

impl Line for MockLine {
    fn request_input(&self, consumer: &str) -> BackendResult<()> {
        let mut state = self.state.lock();
        state.direction = Some(Direction::Input);
        state.consumer = Some(consumer.to_string());
        state.level.get_or_insert(Level::Low);
        Ok(())
    }

    fn request_output(&self, consumer: &str, initial: Level) -> BackendResult<()> {
        let mut state = self.state.lock();
        state.direction = Some(Direction::Output);
        state.consumer = Some(consumer.to_string());
        state.level = Some(initial);
        Ok(())
    }

    fn get_value(&self) -> BackendResult<Level> {
        self.check_io()?;
        let state = self.state.lock();
        if state.direction.is_none() {
            return Err(BackendError::NotConfigured {
                channel: self.channel,
            });
        }
        Ok(state.level.unwrap_or(Level::Low))
    }

    fn set_value(&self, level: Level) -> BackendResult<()> {
        self.check_io()?;
        let mut state = self.state.lock();
        if state.direction.is_none() {
            return Err(BackendError::NotConfigured {
                channel: self.channel,
            });
        }
        state.level = Some(level);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chip_shared_by_name() {
        let backend = MockBackend::new();
        let a = backend.open_chip("gpiochip0").expect("open");
        let _b = backend.open_chip("gpiochip0").expect("open");
        a.get_line(3).expect("line");
        let chip = backend.chip("gpiochip0").expect("chip");
        assert!(chip.line(3).is_some());
        assert!(chip.line(4).is_none());
    }

    #[test]
    fn test_unconfigured_access_rejected() {
        let chip = MockChip::new("gpiochip0", 8);
        let line = chip.get_line(0).expect("line");
        assert!(matches!(
            line.get_value(),
            Err(BackendError::NotConfigured { channel: 0 })
        ));
        assert!(matches!(
            line.set_value(Level::High),
            Err(BackendError::NotConfigured { channel: 0 })
        ));
    }

    #[test]
    fn test_output_write_then_read() {
        let chip = MockChip::new("gpiochip0", 8);
        let line = chip.get_line(4).expect("line");
        line.request_output("gpiodev", Level::Low).expect("request");
        line.set_value(Level::High).expect("set");
        assert_eq!(line.get_value().expect("get"), Level::High);
        let mock = chip.line(4).expect("mock line");
        assert_eq!(mock.direction(), Some(Direction::Output));
        assert_eq!(mock.consumer().as_deref(), Some("gpiodev"));
    }

    #[test]
    fn test_invalid_channel() {
        let chip = MockChip::new("gpiochip0", 8);
        assert!(matches!(
            chip.get_line(8),
            Err(BackendError::InvalidChannel { channel: 8, max: 8 })
        ));
    }

    #[test]
    fn test_fault_injection() {
        let chip = MockChip::new("gpiochip0", 8);
        let line = chip.get_line(1).expect("line");
        line.request_input("gpiodev").expect("request");
        let mock = chip.line(1).expect("mock line");
        mock.set_fail_io(true);
        assert!(line.get_value().is_err());
        mock.set_fail_io(false);
        assert!(line.get_value().is_ok());

        let backend = MockBackend::new();
        backend.set_fail_open(true);
        assert!(backend.open_chip("gpiochip0").is_err());
    }
}
