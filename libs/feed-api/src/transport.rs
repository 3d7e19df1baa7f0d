use crate::error::FeedError;
use crate::types::{Credentials, StreamFilter};

/// Открытая подписка на фид. Одно событие на вызов.
pub trait FeedConnection: Send {
    /// Blocking receive of the next raw record.
    ///
    /// `Ok(None)` means the provider closed the stream.
    fn next_event(&mut self) -> Result<Option<serde_json::Value>, FeedError>;
}

/// Transport plugin trait for push-style feeds.
///
/// The runner calls `authenticate` and then `subscribe` on every
/// (re)connection attempt; an implementation may keep session state between
/// the two calls.
pub trait FeedTransport: Send {
    /// Establish an authenticated session with the provider.
    fn authenticate(&mut self, credentials: &Credentials) -> Result<(), FeedError>;

    /// Open a long-lived filtered subscription.
    fn subscribe(&mut self, filter: &StreamFilter) -> Result<Box<dyn FeedConnection>, FeedError>;
}

/// Источник учётных данных. Читается заново при каждой аутентификации.
pub trait CredentialSource: Send {
    fn load(&self) -> Result<Credentials, FeedError>;
}

impl CredentialSource for Credentials {
    fn load(&self) -> Result<Credentials, FeedError> {
        Ok(self.clone())
    }
}
