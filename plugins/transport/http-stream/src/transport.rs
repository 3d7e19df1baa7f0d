use std::io::BufReader;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use feed_api::{Credentials, ErrorKind, FeedConnection, FeedError, FeedTransport, JsonLinesConnection, StreamFilter};
use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};

use crate::config::HttpStreamConfig;
use crate::oauth::{self, OAuth1Keys};

/// Ответ token endpoint'а (`grant_type=client_credentials`).
#[derive(serde::Deserialize)]
struct TokenResponse {
    token_type: String,
    access_token: String,
}

/// Map a non-success HTTP status onto a feed error kind.
pub fn classify_status(status: StatusCode) -> ErrorKind {
    match status.as_u16() {
        401 | 403 => ErrorKind::Auth,
        420 | 429 => ErrorKind::RateLimited,
        _ => ErrorKind::Io,
    }
}

fn status_error(what: &str, resp: Response) -> FeedError {
    let status = resp.status();
    let body = resp.text().unwrap_or_default();
    let body = body.trim();
    let snippet: String = body.chars().take(200).collect();
    FeedError::new(classify_status(status), format!("{what}: HTTP {status}: {snippet}"))
}

/// Как подписывается запрос к стриму.
#[derive(Debug, Clone, PartialEq, Eq)]
enum StreamAuth {
    /// Каждый запрос подписывается заново (свежие nonce и timestamp).
    OAuth1(OAuth1Keys),
    Bearer(String),
}

impl StreamAuth {
    fn mode(&self) -> &'static str {
        match self {
            StreamAuth::OAuth1(_) => "oauth1 user context",
            StreamAuth::Bearer(_) => "bearer",
        }
    }
}

// ════════════════════════════════════════════════════════════════
//  HttpStreamTransport
// ════════════════════════════════════════════════════════════════

/// Долгоживущий HTTP-стрим с newline-delimited JSON.
///
/// `authenticate` только выбирает способ авторизации (и при необходимости
/// получает bearer token); соединение со стримом открывается в `subscribe`.
pub struct HttpStreamTransport {
    client: Client,
    config: HttpStreamConfig,
    auth: Option<StreamAuth>,
}

impl HttpStreamTransport {
    pub fn new(config: HttpStreamConfig) -> Result<Self, FeedError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .timeout(None::<Duration>)
            .build()
            .map_err(|e| FeedError::config(format!("http client: {e}")))?;
        Ok(Self::with_client(client, config))
    }

    fn with_client(client: Client, config: HttpStreamConfig) -> Self {
        Self {
            client,
            config,
            auth: None,
        }
    }

    fn exchange_token(&self, key: &str, secret: &str) -> Result<String, FeedError> {
        let resp = self
            .client
            .post(&self.config.token_url)
            .basic_auth(key, Some(secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .map_err(|e| FeedError::io(format!("token request: {e}")))?;
        if !resp.status().is_success() {
            return Err(status_error("token request", resp));
        }

        let token: TokenResponse = resp
            .json()
            .map_err(|e| FeedError::format_err(format!("token response: {e}")))?;
        if !token.token_type.eq_ignore_ascii_case("bearer") {
            return Err(FeedError::auth(format!("unexpected token type '{}'", token.token_type)));
        }
        Ok(token.access_token)
    }

    fn sign(
        &self,
        request: RequestBuilder,
        auth: &StreamAuth,
        params: &[(&str, &str)],
    ) -> Result<RequestBuilder, FeedError> {
        match auth {
            StreamAuth::Bearer(token) => Ok(request.bearer_auth(token)),
            StreamAuth::OAuth1(keys) => {
                let timestamp = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_secs())
                    .unwrap_or_default();
                let header = oauth::authorization_header(
                    keys,
                    "POST",
                    &self.config.stream_url,
                    params,
                    &oauth::nonce(),
                    timestamp,
                )?;
                Ok(request.header(AUTHORIZATION, header))
            }
        }
    }
}

impl FeedTransport for HttpStreamTransport {
    fn authenticate(&mut self, credentials: &Credentials) -> Result<(), FeedError> {
        self.auth = None;
        if credentials.access_token.is_some() != credentials.access_token_secret.is_some() {
            return Err(FeedError::auth("access_token and access_token_secret must be set together"));
        }

        let auth = match OAuth1Keys::from_credentials(credentials) {
            Some(keys) => StreamAuth::OAuth1(keys),
            None => match (&credentials.bearer_token, &credentials.consumer_key, &credentials.consumer_secret) {
                (Some(token), _, _) => StreamAuth::Bearer(token.clone()),
                (None, Some(key), Some(secret)) => StreamAuth::Bearer(self.exchange_token(key, secret)?),
                _ => return Err(FeedError::auth("no usable credentials")),
            },
        };
        tracing::debug!(mode = auth.mode(), "stream auth ready");
        self.auth = Some(auth);
        Ok(())
    }

    fn subscribe(&mut self, filter: &StreamFilter) -> Result<Box<dyn FeedConnection>, FeedError> {
        let auth = self
            .auth
            .as_ref()
            .ok_or_else(|| FeedError::auth("subscribe before authenticate"))?;

        let track = filter.track.join(",");
        let languages = filter.languages.join(",");
        let mut params = vec![("track", track.as_str())];
        if !filter.languages.is_empty() {
            params.push(("language", languages.as_str()));
        }

        let request = self
            .client
            .post(&self.config.stream_url)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(oauth::form_body(&params));
        let resp = self
            .sign(request, auth, &params)?
            .send()
            .map_err(|e| FeedError::io(format!("stream connect: {e}")))?;
        if !resp.status().is_success() {
            return Err(status_error("stream connect", resp));
        }

        tracing::info!(url = %self.config.stream_url, auth = auth.mode(), "stream connected");
        Ok(Box::new(JsonLinesConnection::new(
            BufReader::new(resp),
            self.config.max_line_bytes,
        )))
    }
}
