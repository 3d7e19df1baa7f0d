use base64::Engine;
use hmac::{Hmac, Mac};
use rand::Rng;
use rand::distributions::Alphanumeric;
use sha1::Sha1;

use feed_api::{Credentials, FeedError};

type HmacSha1 = Hmac<Sha1>;

/// Ключи OAuth 1.0a user context: consumer-пара приложения и access-пара
/// пользователя.
#[derive(Clone, PartialEq, Eq)]
pub struct OAuth1Keys {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub token: String,
    pub token_secret: String,
}

impl OAuth1Keys {
    /// `None`, если хотя бы одного из четырёх значений нет.
    pub fn from_credentials(credentials: &Credentials) -> Option<Self> {
        Some(Self {
            consumer_key: credentials.consumer_key.clone()?,
            consumer_secret: credentials.consumer_secret.clone()?,
            token: credentials.access_token.clone()?,
            token_secret: credentials.access_token_secret.clone()?,
        })
    }
}

impl std::fmt::Debug for OAuth1Keys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuth1Keys").finish_non_exhaustive()
    }
}

/// RFC 3986 percent-encoding: everything except `A-Z a-z 0-9 - . _ ~`.
pub(crate) fn encode(s: &str) -> String {
    urlencoding::encode(s).into_owned()
}

/// `application/x-www-form-urlencoded` body with the same encoding the
/// signature uses.
pub(crate) fn form_body(params: &[(&str, &str)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", encode(k), encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

pub(crate) fn nonce() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

/// HMAC-SHA1 signature over the signature base string, base64-encoded.
///
/// `params` are the request parameters (query and form body); the
/// `oauth_*` protocol parameters are added here.
pub fn signature(
    keys: &OAuth1Keys,
    method: &str,
    url: &str,
    params: &[(&str, &str)],
    nonce: &str,
    timestamp: u64,
) -> Result<String, FeedError> {
    let timestamp = timestamp.to_string();
    let protocol = protocol_params(keys, nonce, &timestamp);

    let mut pairs: Vec<(String, String)> = params
        .iter()
        .chain(protocol.iter())
        .map(|(k, v)| (encode(k), encode(v)))
        .collect();
    pairs.sort();
    let param_string = pairs
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let base = format!(
        "{}&{}&{}",
        method.to_ascii_uppercase(),
        encode(url),
        encode(&param_string)
    );
    let key = format!("{}&{}", encode(&keys.consumer_secret), encode(&keys.token_secret));

    let mut mac = HmacSha1::new_from_slice(key.as_bytes())
        .map_err(|e| FeedError::auth(format!("oauth signing key: {e}")))?;
    mac.update(base.as_bytes());
    Ok(base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes()))
}

/// Value of the `Authorization` header for one signed request.
pub fn authorization_header(
    keys: &OAuth1Keys,
    method: &str,
    url: &str,
    params: &[(&str, &str)],
    nonce: &str,
    timestamp: u64,
) -> Result<String, FeedError> {
    let sig = signature(keys, method, url, params, nonce, timestamp)?;
    let timestamp = timestamp.to_string();

    let mut header = protocol_params(keys, nonce, &timestamp);
    header.push(("oauth_signature", sig.as_str()));
    header.sort();

    let fields = header
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", encode(k), encode(v)))
        .collect::<Vec<_>>()
        .join(", ");
    Ok(format!("OAuth {fields}"))
}

fn protocol_params<'a>(keys: &'a OAuth1Keys, nonce: &'a str, timestamp: &'a str) -> Vec<(&'a str, &'a str)> {
    vec![
        ("oauth_consumer_key", keys.consumer_key.as_str()),
        ("oauth_nonce", nonce),
        ("oauth_signature_method", "HMAC-SHA1"),
        ("oauth_timestamp", timestamp),
        ("oauth_token", keys.token.as_str()),
        ("oauth_version", "1.0"),
    ]
}
