use std::sync::RwLock;

use feed_api::{EventStore, StoreError, StoredRecord};

// ═══════════════════════════════════════════════════════════════
//  MemoryEventStore
// ═══════════════════════════════════════════════════════════════

/// In-memory append-only storage. Для `--dry-run` и тестов, где
/// дисковая persistence не нужна.
pub struct MemoryEventStore {
    records: RwLock<Vec<StoredRecord>>,
    /// Если задано, каждый append завершается этой ошибкой.
    fail_with: Option<String>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            fail_with: None,
        }
    }

    /// A store whose every `append` fails with a backend error.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            fail_with: Some(message.into()),
        }
    }

    /// Snapshot of the stored rows in insertion order.
    pub fn records(&self) -> Vec<StoredRecord> {
        match self.records.read() {
            Ok(buf) => buf.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl Default for MemoryEventStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EventStore for MemoryEventStore {
    fn append(&self, record: &StoredRecord) -> Result<(), StoreError> {
        if let Some(msg) = &self.fail_with {
            return Err(StoreError::backend(std::io::Error::other(msg.clone())));
        }
        let mut buf = self.records.write().map_err(|_| StoreError::LockPoisoned)?;
        buf.push(record.clone());
        Ok(())
    }

    fn count(&self) -> Result<u64, StoreError> {
        let buf = self.records.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(buf.len() as u64)
    }
}
