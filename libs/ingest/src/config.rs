use std::path::PathBuf;

use serde::Deserialize;

use feed_api::{CredentialSource, Credentials, FeedError};

// ═══════════════════════════════════════════════════════════════
//  Project Config
// ═══════════════════════════════════════════════════════════════

/// Секция `[project]`: имя коллекции и фильтр подписки.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectConfig {
    pub name: Option<String>,
    #[serde(default)]
    pub track: Vec<String>,
    #[serde(default)]
    pub languages: Vec<String>,
}

// ═══════════════════════════════════════════════════════════════
//  Runner Config
// ═══════════════════════════════════════════════════════════════

/// Секция `[runner]`: бюджет повторов и имена полей события.
#[derive(Debug, Clone, Deserialize)]
pub struct RunnerConfig {
    /// Потолок подряд идущих сбоев; превышение завершает процесс.
    #[serde(default = "default_max_failures")]
    pub max_failures: u32,
    /// Пауза перед переподключением (0 = сразу).
    #[serde(default)]
    pub retry_delay_ms: u64,
    /// Поле с временем создания (на любом уровне вложенности).
    #[serde(default = "default_created_at_field")]
    pub created_at_field: String,
    /// Поле с идентификатором события (верхний уровень).
    #[serde(default = "default_id_field")]
    pub id_field: String,
}

fn default_max_failures() -> u32 {
    10
}
fn default_created_at_field() -> String {
    "created_at".into()
}
fn default_id_field() -> String {
    "id_str".into()
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            max_failures: default_max_failures(),
            retry_delay_ms: 0,
            created_at_field: default_created_at_field(),
            id_field: default_id_field(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Descriptor Config
// ═══════════════════════════════════════════════════════════════

/// Секция `[descriptor]`: куда писать описание проекта.
#[derive(Debug, Clone, Deserialize)]
pub struct DescriptorConfig {
    #[serde(default = "default_descriptor_enabled")]
    pub enabled: bool,
    #[serde(default = "default_descriptor_dir")]
    pub dir: String,
}

fn default_descriptor_enabled() -> bool {
    true
}
fn default_descriptor_dir() -> String {
    "temp".into()
}

impl Default for DescriptorConfig {
    fn default() -> Self {
        Self {
            enabled: default_descriptor_enabled(),
            dir: default_descriptor_dir(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  File credentials
// ═══════════════════════════════════════════════════════════════

/// Reads the `[credentials]` section of the TOML config on every call, so a
/// reconnect picks up rotated keys without a restart.
#[derive(Debug, Clone)]
pub struct FileCredentials {
    path: PathBuf,
}

#[derive(Deserialize)]
struct CredentialsFile {
    #[serde(default)]
    credentials: Credentials,
}

impl FileCredentials {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CredentialSource for FileCredentials {
    fn load(&self) -> Result<Credentials, FeedError> {
        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| FeedError::config(format!("cannot read {}: {e}", self.path.display())))?;
        let file: CredentialsFile = toml::from_str(&content)
            .map_err(|e| FeedError::config(format!("bad config {}: {e}", self.path.display())))?;
        if file.credentials.is_empty() {
            return Err(FeedError::auth(format!(
                "no credentials in {}: need consumer_key + consumer_secret (optionally with access_token + access_token_secret) or bearer_token",
                self.path.display()
            )));
        }
        Ok(file.credentials)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runner_defaults() {
        let cfg: RunnerConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.max_failures, 10);
        assert_eq!(cfg.retry_delay_ms, 0);
        assert_eq!(cfg.created_at_field, "created_at");
        assert_eq!(cfg.id_field, "id_str");
    }

    #[test]
    fn file_credentials_reread_each_time() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[credentials]\nbearer_token = \"first\"\n").unwrap();

        let source = FileCredentials::new(&path);
        assert_eq!(source.load().unwrap().bearer_token.as_deref(), Some("first"));

        std::fs::write(
            &path,
            "[project]\nname = \"p\"\n\n[credentials]\nconsumer_key = \"ck\"\nconsumer_secret = \"cs\"\n",
        )
        .unwrap();
        let creds = source.load().unwrap();
        assert_eq!(creds.consumer_key.as_deref(), Some("ck"));
        assert!(creds.bearer_token.is_none());
    }

    #[test]
    fn user_context_tokens_are_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[credentials]\nconsumer_key = \"ck\"\nconsumer_secret = \"cs\"\n\
             access_token = \"at\"\naccess_token_secret = \"ats\"\n",
        )
        .unwrap();
        let creds = FileCredentials::new(&path).load().unwrap();
        assert_eq!(creds.access_token.as_deref(), Some("at"));
        assert_eq!(creds.access_token_secret.as_deref(), Some("ats"));
    }

    #[test]
    fn missing_credentials_is_auth_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[project]\nname = \"p\"\n").unwrap();
        let err = FileCredentials::new(&path).load().unwrap_err();
        assert_eq!(err.kind(), feed_api::ErrorKind::Auth);
    }

    #[test]
    fn missing_file_is_config_error() {
        let err = FileCredentials::new("/nonexistent/config.toml").load().unwrap_err();
        assert_eq!(err.kind(), feed_api::ErrorKind::Config);
    }
}
