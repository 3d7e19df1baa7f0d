use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use feed_api::{
    Credentials, FeedConnection, FeedError, FeedTransport, JsonLinesConnection, StreamFilter,
};

// ════════════════════════════════════════════════════════════════
//  Configuration
// ════════════════════════════════════════════════════════════════

/// `[feed.config]` при `transport = "file"`.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct FileReplayConfig {
    /// NDJSON-файл: одно событие на строку.
    pub path: PathBuf,
    #[serde(default)]
    pub max_line_bytes: usize,
}

// ════════════════════════════════════════════════════════════════
//  FileReplayTransport
// ════════════════════════════════════════════════════════════════

/// Replays a captured stream from disk.
///
/// Файл отдаётся ровно один раз: повторный `subscribe` возвращает
/// `Closed`, так что переподключения runner'а не дублируют строки.
/// Фильтр не применяется, файл уже содержит отобранные события.
pub struct FileReplayTransport {
    config: FileReplayConfig,
    delivered: bool,
}

impl FileReplayTransport {
    pub fn new(config: FileReplayConfig) -> Self {
        Self {
            config,
            delivered: false,
        }
    }
}

impl FeedTransport for FileReplayTransport {
    fn authenticate(&mut self, _credentials: &Credentials) -> Result<(), FeedError> {
        Ok(())
    }

    fn subscribe(&mut self, _filter: &StreamFilter) -> Result<Box<dyn FeedConnection>, FeedError> {
        if self.delivered {
            return Err(FeedError::closed(format!(
                "replay of {} already delivered",
                self.config.path.display()
            )));
        }
        let file = File::open(&self.config.path)
            .map_err(|e| FeedError::io(format!("open {}: {e}", self.config.path.display())))?;
        self.delivered = true;
        tracing::info!(path = %self.config.path.display(), "replaying feed file");
        Ok(Box::new(JsonLinesConnection::new(
            BufReader::new(file),
            self.config.max_line_bytes,
        )))
    }
}
