//! Completion status codes reported back to the caller.

use std::fmt;

/// Terminal status of a request record.
///
/// Every request reaches exactly one terminal status. The raw byte from
/// [`Status::code`] is what the caller context stores at the status offset
/// of the caller's request buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    /// Command completed successfully.
    Ok = 0,
    /// Request buffer or payload too short for the command.
    BadLength = 1,
    /// The unit is held exclusively by another opener.
    UnitBusy = 2,
    /// Unit could not be opened (pool full, backend unavailable, stale handle).
    OpenFailed = 3,
    /// Unknown command code.
    NoCommand = 4,
    /// Request was cancelled before it could complete.
    Aborted = 5,
    /// Command understood but not supported by this device.
    Unsupported = 6,
    /// Backend fault while executing the command.
    IoError = 7,
}

impl Status {
    /// Raw status byte for the caller's request buffer.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Decode a raw status byte.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Ok),
            1 => Some(Self::BadLength),
            2 => Some(Self::UnitBusy),
            3 => Some(Self::OpenFailed),
            4 => Some(Self::NoCommand),
            5 => Some(Self::Aborted),
            6 => Some(Self::Unsupported),
            7 => Some(Self::IoError),
            _ => None,
        }
    }

    /// True for any status other than `Ok`.
    pub fn is_error(self) -> bool {
        self != Self::Ok
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Ok => "ok",
            Self::BadLength => "bad_length",
            Self::UnitBusy => "unit_busy",
            Self::OpenFailed => "open_failed",
            Self::NoCommand => "no_command",
            Self::Aborted => "aborted",
            Self::Unsupported => "unsupported",
            Self::IoError => "io_error",
        };
        write!(f, "{}", label)
    }
}
