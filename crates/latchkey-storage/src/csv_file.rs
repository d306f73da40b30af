//! CSV-backed authorization table.
//!
//! The file has a header row and one record per line:
//!
//! ```text
//! key,name,type
//! 1234,Alice,pin
//! 4242424,Bob,fob
//! ```
//!
//! The whole file is parsed on every lookup. A file that cannot be read or
//! contains a malformed row makes the table unavailable as a whole.

use crate::error::{StorageError, StorageResult};
use crate::source::AuthorizationSource;
use csv::{ReaderBuilder, Trim};
use latchkey_core::AuthorizationRecord;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Authorization table stored as a CSV file.
#[derive(Debug, Clone)]
pub struct CsvAuthorizationSource {
    path: PathBuf,
}

impl CsvAuthorizationSource {
    /// Create a source reading `path`. The file is not opened until the
    /// first lookup.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the table file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse every record in file order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if the file cannot be read and
    /// `StorageError::Csv` if any row is malformed.
    pub async fn load(&self) -> StorageResult<Vec<AuthorizationRecord>> {
        let contents = tokio::fs::read(&self.path)
            .await
            .map_err(|e| StorageError::io(&self.path, e))?;
        parse_records(&contents)
    }
}

/// Parse a `key,name,type` table.
///
/// # Errors
///
/// Returns `StorageError::Csv` on the first malformed row.
pub fn parse_records(contents: &[u8]) -> StorageResult<Vec<AuthorizationRecord>> {
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .from_reader(contents);

    reader
        .deserialize::<AuthorizationRecord>()
        .map(|row| -> StorageResult<AuthorizationRecord> {
            let row = row?;
            Ok(AuthorizationRecord::new(row.key, row.name, row.credential_type))
        })
        .collect()
}

impl AuthorizationSource for CsvAuthorizationSource {
    async fn find(&self, key: &str) -> StorageResult<Option<AuthorizationRecord>> {
        let records = self.load().await?;
        debug!("Loaded {} records from {}", records.len(), self.path.display());
        Ok(records.into_iter().find(|record| record.matches(key)))
    }

    fn describe(&self) -> String {
        format!("csv:{}", self.path.display())
    }
}
