#![allow(async_fn_in_trait)]

use crate::csv_file::CsvAuthorizationSource;
use crate::error::StorageResult;
use crate::memory::MemoryAuthorizationSource;
use crate::sqlite::SqliteAuthorizationSource;
use latchkey_core::AuthorizationRecord;

/// Read-only lookup over the authorization table.
///
/// Implementations consult their backing store on every call; nothing is
/// cached between lookups, so edits to the table take effect on the next
/// credential presented.
///
/// # Implementation Note
///
/// This trait uses native async trait methods (Edition 2024 feature),
/// eliminating the need for the async-trait crate.
pub trait AuthorizationSource: Send + Sync {
    /// Find the first record, in table order, whose key equals `key` exactly.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`](crate::StorageError) if the table could not
    /// be read. A missing key is `Ok(None)`, never an error.
    async fn find(&self, key: &str) -> StorageResult<Option<AuthorizationRecord>>;

    /// Human-readable description of the backing store, for logs.
    fn describe(&self) -> String;
}

/// Enum wrapper for authorization source dispatch.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyAuthorizationSource {
    /// CSV file read on every lookup.
    Csv(CsvAuthorizationSource),

    /// SQLite table queried on every lookup.
    Sqlite(SqliteAuthorizationSource),

    /// In-memory table for tests and simulation.
    Memory(MemoryAuthorizationSource),
}

impl AuthorizationSource for AnyAuthorizationSource {
    async fn find(&self, key: &str) -> StorageResult<Option<AuthorizationRecord>> {
        match self {
            Self::Csv(source) => source.find(key).await,
            Self::Sqlite(source) => source.find(key).await,
            Self::Memory(source) => source.find(key).await,
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Csv(source) => source.describe(),
            Self::Sqlite(source) => source.describe(),
            Self::Memory(source) => source.describe(),
        }
    }
}

impl From<CsvAuthorizationSource> for AnyAuthorizationSource {
    fn from(source: CsvAuthorizationSource) -> Self {
        Self::Csv(source)
    }
}

impl From<SqliteAuthorizationSource> for AnyAuthorizationSource {
    fn from(source: SqliteAuthorizationSource) -> Self {
        Self::Sqlite(source)
    }
}

impl From<MemoryAuthorizationSource> for AnyAuthorizationSource {
    fn from(source: MemoryAuthorizationSource) -> Self {
        Self::Memory(source)
    }
}
