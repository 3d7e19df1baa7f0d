mod config;
mod oauth;
mod transport;

pub use config::HttpStreamConfig;
pub use oauth::{OAuth1Keys, authorization_header};
pub use transport::{HttpStreamTransport, classify_status};
