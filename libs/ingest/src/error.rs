use feed_api::{FeedError, StoreError};

/// Событие отброшено как некорректное. Не считается сбоем фида.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("payload is not an object")]
    NotAnObject,

    #[error("missing field '{0}'")]
    MissingField(String),

    #[error("field '{field}' is not a string")]
    NotAString { field: String },

    #[error("bad timestamp '{value}': {reason}")]
    BadTimestamp { value: String, reason: String },

    #[error("timestamp '{0}' not found in serialized payload")]
    OccurrenceNotFound(String),
}

/// Ошибка обработки одного события listener'ом.
#[derive(Debug, thiserror::Error)]
pub enum ListenError {
    #[error("malformed event: {0}")]
    Malformed(#[from] EventError),

    #[error("serialize payload: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("store: {0}")]
    Store(#[from] StoreError),
}

/// Причина одного сбоя сессии. Все варианты одинаково расходуют
/// бюджет повторов.
#[derive(Debug, thiserror::Error)]
pub enum FailureCause {
    #[error("credentials: {0}")]
    Credentials(FeedError),

    #[error("feed: {0}")]
    Feed(FeedError),

    #[error("serialize payload: {0}")]
    Serialize(serde_json::Error),

    #[error("store: {0}")]
    Store(StoreError),
}

/// Терминальная ошибка runner'а.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("giving up after {failures} consecutive failures, last: {source}")]
    RetriesExhausted {
        failures: u32,
        #[source]
        source: FailureCause,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum DescriptorError {
    #[error("descriptor io ({path}): {source}")]
    Io { path: String, source: std::io::Error },

    #[error("descriptor json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid project name '{0}' for a descriptor file")]
    InvalidName(String),
}
