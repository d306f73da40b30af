use crate::error::{StorageError, StorageResult};
use crate::source::AuthorizationSource;
use latchkey_core::AuthorizationRecord;
use std::sync::{Arc, PoisonError, RwLock};

#[derive(Debug, Default)]
struct MemoryTable {
    records: Vec<AuthorizationRecord>,
    unavailable: bool,
}

/// In-memory authorization table.
///
/// Clones share the same table, so a test can keep one clone to edit the
/// records (or take the source offline) while the controller owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryAuthorizationSource {
    table: Arc<RwLock<MemoryTable>>,
}

impl MemoryAuthorizationSource {
    /// Create a source holding `records` in table order.
    pub fn new(records: Vec<AuthorizationRecord>) -> Self {
        let source = Self::default();
        source.set_records(records);
        source
    }

    /// Replace the whole table.
    pub fn set_records(&self, records: Vec<AuthorizationRecord>) {
        self.table
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .records = records;
    }

    /// Append one record at the end of the table.
    pub fn push(&self, record: AuthorizationRecord) {
        self.table
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .records
            .push(record);
    }

    /// Make every lookup fail with `StorageError::Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.table
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .unavailable = unavailable;
    }
}

impl AuthorizationSource for MemoryAuthorizationSource {
    async fn find(&self, key: &str) -> StorageResult<Option<AuthorizationRecord>> {
        let table = self.table.read().unwrap_or_else(PoisonError::into_inner);
        if table.unavailable {
            return Err(StorageError::Unavailable("memory table offline".to_string()));
        }
        Ok(table.records.iter().find(|r| r.matches(key)).cloned())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
