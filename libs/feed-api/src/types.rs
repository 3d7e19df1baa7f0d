use serde::{Deserialize, Serialize};

// ════════════════════════════════════════════════════════════════
//  Credentials
// ════════════════════════════════════════════════════════════════

/// Учётные данные провайдера фида.
///
/// Варианты по приоритету:
/// - consumer key/secret + access token/secret: OAuth 1.0a user context;
/// - заранее выданный bearer token;
/// - только consumer key/secret: транспорт сам обменяет их на app-only токен.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub consumer_key: Option<String>,
    #[serde(default)]
    pub consumer_secret: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub access_token_secret: Option<String>,
    #[serde(default)]
    pub bearer_token: Option<String>,
}

impl Credentials {
    pub fn is_empty(&self) -> bool {
        self.bearer_token.is_none() && (self.consumer_key.is_none() || self.consumer_secret.is_none())
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn mask(v: &Option<String>) -> &'static str {
            if v.is_some() { "***" } else { "-" }
        }
        f.debug_struct("Credentials")
            .field("consumer_key", &mask(&self.consumer_key))
            .field("consumer_secret", &mask(&self.consumer_secret))
            .field("access_token", &mask(&self.access_token))
            .field("access_token_secret", &mask(&self.access_token_secret))
            .field("bearer_token", &mask(&self.bearer_token))
            .finish()
    }
}

// ════════════════════════════════════════════════════════════════
//  StreamFilter
// ════════════════════════════════════════════════════════════════

/// Фильтр подписки: track-термы и необязательные коды языков.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamFilter {
    pub track: Vec<String>,
    #[serde(default)]
    pub languages: Vec<String>,
}

impl StreamFilter {
    pub fn new(track: Vec<String>, languages: Vec<String>) -> Self {
        Self { track, languages }
    }
}

// ════════════════════════════════════════════════════════════════
//  Partition
// ════════════════════════════════════════════════════════════════

/// Одна из двух живых партиций хранилища.
///
/// `Even` (partition A): чётное число суток с Unix epoch,
/// `Odd` (partition B): нечётное.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Partition {
    Even,
    Odd,
}

impl Partition {
    pub fn label(self) -> &'static str {
        match self {
            Partition::Even => "A",
            Partition::Odd => "B",
        }
    }
}

impl std::fmt::Display for Partition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Partition::Even => f.write_str("even"),
            Partition::Odd => f.write_str("odd"),
        }
    }
}

// ════════════════════════════════════════════════════════════════
//  StoredRecord
// ════════════════════════════════════════════════════════════════

/// Строка партиции. Создаётся listener'ом, никогда не обновляется.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRecord {
    /// Метка коллекции, постоянна на время жизни процесса.
    pub project: String,
    /// UTC-день создания события, `YYYY-MM-DD`.
    pub creation_date: String,
    /// Идентификатор события как есть.
    pub identifier: String,
    /// Сериализованный payload с нормализованными timestamp'ами.
    pub payload_text: String,
}
