//! Capability traits over the physical line backend.
//!
//! The dispatcher never talks to hardware directly; it goes through a
//! [`GpioBackend`] that hands out [`LineChip`]s, which in turn hand out
//! individually requestable [`Line`]s. A channel must be requested as
//! input or output before its value can be read or written; backends
//! reject unconfigured access with
//! [`BackendError::NotConfigured`](crate::BackendError::NotConfigured).

use std::sync::Arc;

use crate::error::BackendResult;

/// Logic level of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

impl Level {
    /// Interpret a payload byte: zero is low, anything else is high.
    pub fn from_u8(raw: u8) -> Self {
        if raw == 0 {
            Self::Low
        } else {
            Self::High
        }
    }

    /// Wire byte for this level.
    pub fn as_u8(self) -> u8 {
        match self {
            Self::Low => 0,
            Self::High => 1,
        }
    }

    /// True for `High`.
    pub fn is_high(self) -> bool {
        self == Self::High
    }
}

/// Factory for line chips, injected into the unit table at construction.
pub trait GpioBackend: Send + Sync {
    /// Open the named chip, acquiring whatever underlying resource backs it.
    fn open_chip(&self, name: &str) -> BackendResult<Arc<dyn LineChip>>;
}

/// One group of hardware lines (a chip).
pub trait LineChip: Send + Sync {
    /// Get the line for a channel index. Does not configure the line.
    fn get_line(&self, channel: u8) -> BackendResult<Arc<dyn Line>>;

    /// Name the chip was opened with.
    fn name(&self) -> &str;
}

/// A single hardware line.
pub trait Line: Send + Sync {
    /// Request the line as an input, tagged with a consumer label.
    fn request_input(&self, consumer: &str) -> BackendResult<()>;

    /// Request the line as an output with an initial level.
    fn request_output(&self, consumer: &str, initial: Level) -> BackendResult<()>;

    /// Read the current level.
    fn get_value(&self) -> BackendResult<Level>;

    /// Drive the line to a level.
    fn set_value(&self, level: Level) -> BackendResult<()>;
}
