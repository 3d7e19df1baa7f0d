use std::path::PathBuf;

use feed_api::Partition;

// ════════════════════════════════════════════════════════════════
//  Configuration
// ════════════════════════════════════════════════════════════════

/// Секция `[storage]`: по одному файлу базы на партицию.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct SqliteStoreConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_even_file")]
    pub even_file: String,
    #[serde(default = "default_odd_file")]
    pub odd_file: String,
    /// `PRAGMA journal_mode=WAL` при открытии.
    #[serde(default)]
    pub wal_mode: bool,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

fn default_data_dir() -> String {
    "db".into()
}
fn default_even_file() -> String {
    "even.sqlite".into()
}
fn default_odd_file() -> String {
    "odd.sqlite".into()
}
fn default_busy_timeout_ms() -> u64 {
    5000
}

impl Default for SqliteStoreConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            even_file: default_even_file(),
            odd_file: default_odd_file(),
            wal_mode: false,
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

impl SqliteStoreConfig {
    /// `{data_dir}/{even_file}` или `{data_dir}/{odd_file}`.
    pub fn path_for(&self, partition: Partition) -> PathBuf {
        let file = match partition {
            Partition::Even => &self.even_file,
            Partition::Odd => &self.odd_file,
        };
        PathBuf::from(&self.data_dir).join(file)
    }
}
