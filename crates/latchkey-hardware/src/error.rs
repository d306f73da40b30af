//! Error types for hardware operations.
//!
//! This module defines error types specific to hardware device operations,
//! covering reader disconnection, output line faults, malformed reader data
//! and device initialization failures.

use crate::types::LineId;

/// Result type alias for hardware operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

/// Errors that can occur during hardware device operations.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// Device is not connected or has been disconnected.
    #[error("Device disconnected: {device}")]
    Disconnected { device: String },

    /// Writing an output line failed.
    #[error("Line write failed on {line}: {message}")]
    LineWrite { line: LineId, message: String },

    /// Invalid data received from device.
    #[error("Invalid data: {message}")]
    InvalidData { message: String },

    /// Device initialization failed.
    #[error("Initialization failed: {message}")]
    InitializationFailed { message: String },

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HardwareError {
    /// Create a new disconnected error.
    pub fn disconnected(device: impl Into<String>) -> Self {
        Self::Disconnected {
            device: device.into(),
        }
    }

    /// Create a new line write error.
    pub fn line_write(line: LineId, message: impl Into<String>) -> Self {
        Self::LineWrite {
            line,
            message: message.into(),
        }
    }

    /// Create a new invalid data error.
    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }

    /// Create a new initialization failed error.
    pub fn initialization_failed(message: impl Into<String>) -> Self {
        Self::InitializationFailed {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disconnected_error() {
        let error = HardwareError::disconnected("Wiegand reader");
        assert!(matches!(error, HardwareError::Disconnected { .. }));
        assert_eq!(error.to_string(), "Device disconnected: Wiegand reader");
    }

    #[test]
    fn test_line_write_error() {
        let error = HardwareError::line_write(LineId::Lock, "permission denied");
        assert!(matches!(
            error,
            HardwareError::LineWrite {
                line: LineId::Lock,
                ..
            }
        ));
        assert_eq!(
            error.to_string(),
            "Line write failed on lock: permission denied"
        );
    }

    #[test]
    fn test_invalid_data_error() {
        let error = HardwareError::invalid_data("expected '<bits> <value>'");
        assert_eq!(
            error.to_string(),
            "Invalid data: expected '<bits> <value>'"
        );
    }

    #[test]
    fn test_initialization_failed_error() {
        let error = HardwareError::initialization_failed("cannot export gpio27");
        assert_eq!(
            error.to_string(),
            "Initialization failed: cannot export gpio27"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let error: HardwareError = io.into();
        assert!(matches!(error, HardwareError::Io(_)));
    }
}
