use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use feed_api::{EventStore, StoreError, StoredRecord};
use rusqlite::{Connection, params};

use crate::config::SqliteStoreConfig;

/// Idempotent DDL: повторное открытие существующей базы ничего не ломает.
const CREATE_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS event (
    project TEXT NOT NULL,
    creation_date TEXT NOT NULL,
    identifier TEXT NOT NULL,
    payload_text TEXT NOT NULL
);
";

const INSERT: &str =
    "INSERT INTO event (project, creation_date, identifier, payload_text) VALUES (?1, ?2, ?3, ?4)";

// ════════════════════════════════════════════════════════════════
//  SqliteEventStore
// ════════════════════════════════════════════════════════════════

/// Одна партиция в отдельном файле SQLite, таблица `event`.
///
/// Каждый append является отдельным autocommit INSERT: после возврата `Ok`
/// строка уже на диске.
pub struct SqliteEventStore {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl SqliteEventStore {
    pub fn open(path: &Path, config: &SqliteStoreConfig) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path).map_err(StoreError::backend)?;
        conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))
            .map_err(StoreError::backend)?;
        if config.wal_mode {
            conn.pragma_update(None, "journal_mode", "WAL")
                .map_err(StoreError::backend)?;
        }
        conn.execute_batch(CREATE_TABLE).map_err(StoreError::backend)?;

        tracing::debug!(path = %path.display(), wal = config.wal_mode, "event store opened");
        Ok(Self {
            conn: Mutex::new(conn),
            path: Some(path.to_path_buf()),
        })
    }

    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(StoreError::backend)?;
        conn.execute_batch(CREATE_TABLE).map_err(StoreError::backend)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: None,
        })
    }

    /// `None` для in-memory базы.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }
}

impl EventStore for SqliteEventStore {
    fn append(&self, record: &StoredRecord) -> Result<(), StoreError> {
        let conn = self.lock_conn()?;
        conn.execute(
            INSERT,
            params![
                record.project,
                record.creation_date,
                record.identifier,
                record.payload_text
            ],
        )
        .map_err(StoreError::backend)?;
        Ok(())
    }

    fn count(&self) -> Result<u64, StoreError> {
        let conn = self.lock_conn()?;
        let n: i64 = conn
            .query_row("SELECT COUNT(*) FROM event", [], |row| row.get(0))
            .map_err(StoreError::backend)?;
        Ok(n.max(0) as u64)
    }
}
