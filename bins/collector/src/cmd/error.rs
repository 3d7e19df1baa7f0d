use feed_api::{FeedError, StoreError};
use ingest::IngestError;

#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    #[error("{0}")]
    Config(String),

    #[error("{0}")]
    Feed(#[from] FeedError),

    #[error("store: {0}")]
    Store(#[from] StoreError),

    #[error("{0}")]
    Ingest(#[from] IngestError),

    #[error("ingest worker: {0}")]
    Join(String),

    #[error("signal handler: {0}")]
    Signal(std::io::Error),
}
