use crate::error::StoreError;
use crate::types::StoredRecord;

/// Storage plugin trait: append-only table of [`StoredRecord`]s.
///
/// One instance per partition. Implementations must never drop a record
/// silently; any failure is returned to the caller.
pub trait EventStore: Send + Sync {
    /// Insert one row.
    fn append(&self, record: &StoredRecord) -> Result<(), StoreError>;

    /// Number of rows currently stored.
    fn count(&self) -> Result<u64, StoreError>;
}
