//! Error types for backend and caller-buffer operations.

use thiserror::Error;

/// Result type alias for backend operations.
pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Errors reported by a line backend or by caller-buffer access.
///
/// These errors never cross the caller boundary directly; the dispatcher
/// maps them onto a [`Status`](crate::Status) byte in the request record
/// (typically [`Status::IoError`](crate::Status::IoError)) and logs the
/// underlying cause.
#[derive(Error, Debug)]
pub enum BackendError {
    /// The named chip could not be opened.
    #[error("Failed to open chip '{name}': {message}")]
    ChipNotFound { name: String, message: String },

    /// Permission denied when opening the chip.
    #[error("Permission denied for chip '{name}'")]
    PermissionDenied { name: String },

    /// The chip is already held by another process.
    #[error("Chip '{name}' is busy (in use by another process)")]
    ChipBusy { name: String },

    /// Channel index outside the chip's line count.
    #[error("Invalid channel {channel}: chip has {max} lines")]
    InvalidChannel { channel: u8, max: u32 },

    /// Read or write on a line that was never configured.
    #[error("Channel {channel} is not configured")]
    NotConfigured { channel: u8 },

    /// The line is already requested by another consumer.
    #[error("Channel {channel} is in use by '{consumer}'")]
    LineBusy { channel: u8, consumer: String },

    /// Access outside the caller's payload area.
    #[error("Payload access out of range: offset {offset} + {len} bytes exceeds {size}")]
    PayloadOutOfRange {
        offset: usize,
        len: usize,
        size: usize,
    },

    /// Operation not supported by this backend.
    #[error("Operation not supported: {message}")]
    NotSupported { message: String },

    /// Fault reported by the hardware itself.
    #[error("Hardware error: {message}")]
    Hardware { message: String },

    /// I/O error from the operating system.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BackendError {
    /// Check if this is a "chip busy" type error.
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::ChipBusy { .. } | Self::LineBusy { .. })
    }

    /// Check if this error indicates an unconfigured channel.
    pub fn is_not_configured(&self) -> bool {
        matches!(self, Self::NotConfigured { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BackendError::InvalidChannel {
            channel: 70,
            max: 64,
        };
        assert!(err.to_string().contains("70"));
        assert!(err.to_string().contains("64"));
    }

    #[test]
    fn test_error_predicates() {
        assert!(BackendError::ChipBusy {
            name: "gpiochip0".into()
        }
        .is_busy());
        assert!(BackendError::NotConfigured { channel: 3 }.is_not_configured());
        assert!(!BackendError::NotConfigured { channel: 3 }.is_busy());
    }
}
