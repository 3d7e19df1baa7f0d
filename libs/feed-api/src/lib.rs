//! Общие типы и trait-швы между ядром ингеста и его плагинами
//! (transport, storage, credentials).

pub mod error;
pub mod lines;
pub mod storage;
pub mod transport;
pub mod types;

pub use error::{ErrorKind, FeedError, StoreError};
pub use lines::JsonLinesConnection;
pub use storage::EventStore;
pub use transport::{CredentialSource, FeedConnection, FeedTransport};
pub use types::{Credentials, Partition, StoredRecord, StreamFilter};
