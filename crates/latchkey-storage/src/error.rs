use std::path::PathBuf;
use thiserror::Error;

/// Storage-specific error types for the Latchkey authorization table.
///
/// Every variant means the table could not be consulted. Callers must treat
/// these as "source unavailable", never as "credential not found".
#[derive(Debug, Error)]
pub enum StorageError {
    /// The table file could not be read
    #[error("Cannot read authorization table {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The table file is not a well-formed `key,name,type` CSV
    #[error("Malformed authorization table: {0}")]
    Csv(#[from] csv::Error),

    /// Database connection or query execution failed
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The source was configured with unusable parameters
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The source is known to be offline
    #[error("Authorization source unavailable: {0}")]
    Unavailable(String),
}

impl StorageError {
    /// Create an I/O error for a table path.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Specialized result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
