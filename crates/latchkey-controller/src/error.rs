//! Error types for the access controller

use latchkey_core::Credential;
use latchkey_hardware::HardwareError;
use latchkey_storage::StorageError;
use thiserror::Error;

/// Result type alias for controller operations
pub type Result<T> = std::result::Result<T, ControllerError>;

/// Errors that can occur in the controller
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Keypad frame whose value is not a digit or control key
    #[error("Invalid credential event: {bits}-bit frame with value {value}")]
    InvalidCredentialEvent { bits: u8, value: u64 },

    /// Credential not present in the authorization table
    #[error("Access denied for {credential}")]
    AccessDenied { credential: Credential },

    /// Authorization table could not be consulted
    #[error("Authorization source unavailable: {source}")]
    AuthoritySourceUnavailable {
        #[from]
        source: StorageError,
    },

    /// An output line could not be driven
    #[error("Door actuation fault: {source}")]
    ActuationFault {
        #[from]
        source: HardwareError,
    },

    /// Every reader has stopped producing events
    #[error("Reader disconnected: {0}")]
    ReaderDisconnected(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file is not valid JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ControllerError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Whether this error means "not authorized" rather than a fault.
    pub fn is_denial(&self) -> bool {
        matches!(self, Self::AccessDenied { .. })
    }
}
