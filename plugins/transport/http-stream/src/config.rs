// ════════════════════════════════════════════════════════════════
//  Configuration
// ════════════════════════════════════════════════════════════════

/// Параметры HTTP-стрима провайдера (`[feed.config]` при `transport = "http"`).
#[derive(Debug, Clone, serde::Deserialize)]
pub struct HttpStreamConfig {
    /// Filter endpoint; POST с `track` и `language`.
    #[serde(default = "default_stream_url")]
    pub stream_url: String,
    /// Обмен consumer key/secret на app-only bearer token.
    #[serde(default = "default_token_url")]
    pub token_url: String,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Предел длины одной строки стрима (0 = без ограничения).
    #[serde(default = "default_max_line_bytes")]
    pub max_line_bytes: usize,
}

fn default_stream_url() -> String {
    "https://stream.twitter.com/1.1/statuses/filter.json".into()
}
fn default_token_url() -> String {
    "https://api.twitter.com/oauth2/token".into()
}
fn default_connect_timeout_ms() -> u64 {
    10_000
}
fn default_max_line_bytes() -> usize {
    1024 * 1024
}

impl Default for HttpStreamConfig {
    fn default() -> Self {
        Self {
            stream_url: default_stream_url(),
            token_url: default_token_url(),
            connect_timeout_ms: default_connect_timeout_ms(),
            max_line_bytes: default_max_line_bytes(),
        }
    }
}
