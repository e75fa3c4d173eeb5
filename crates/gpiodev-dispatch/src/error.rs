//! Error types for dispatcher operations.

use thiserror::Error;

use gpiodev_core::{BackendError, Status, UnitHandle};

/// Result type alias for dispatcher operations.
pub type Result<T> = std::result::Result<T, DeviceError>;

/// Errors returned synchronously from the dispatcher's entry points.
///
/// Command failures during execution never surface here; they travel in
/// the request record's [`Status`] byte. These errors cover setup failures
/// (`open`), stale handles, and configuration problems.
#[derive(Error, Debug)]
pub enum DeviceError {
    /// Caller request buffer shorter than the supported layout.
    #[error("Request buffer too short: {len} bytes, need at least {min}")]
    BadLength { len: usize, min: usize },

    /// The physical unit is held exclusively by another opener.
    #[error("Unit {unit} is held exclusively by another opener")]
    UnitBusy { unit: u32 },

    /// Unit could not be opened.
    #[error("Open failed: {message}")]
    OpenFailed { message: String },

    /// Handle does not name any currently open unit.
    #[error("Stale unit handle {0}")]
    StaleHandle(UnitHandle),

    /// The unit's worker queue has shut down.
    #[error("Unit worker queue is closed")]
    QueueClosed,

    /// Invalid dispatcher configuration.
    #[error("Invalid configuration: {message}")]
    Config { message: String },

    /// Backend fault.
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl DeviceError {
    /// Status byte equivalent for reporting through a request record.
    pub fn status(&self) -> Status {
        match self {
            Self::BadLength { .. } => Status::BadLength,
            Self::UnitBusy { .. } => Status::UnitBusy,
            Self::OpenFailed { .. } | Self::StaleHandle(_) => Status::OpenFailed,
            Self::QueueClosed | Self::Config { .. } => Status::OpenFailed,
            Self::Backend(_) => Status::IoError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DeviceError::BadLength { len: 12, min: 48 };
        assert!(err.to_string().contains("12"));
        assert!(err.to_string().contains("48"));
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            DeviceError::UnitBusy { unit: 0 }.status(),
            Status::UnitBusy
        );
        assert_eq!(
            DeviceError::StaleHandle(UnitHandle(9)).status(),
            Status::OpenFailed
        );
        let backend = DeviceError::Backend(BackendError::NotConfigured { channel: 2 });
        assert_eq!(backend.status(), Status::IoError);
    }
}
