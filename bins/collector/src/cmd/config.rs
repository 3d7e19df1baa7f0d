use std::path::{Path, PathBuf};

use clap::Args;
use serde::Deserialize;

use ingest::{DescriptorConfig, ProjectConfig, RunnerConfig};
use storage_sqlite::SqliteStoreConfig;
use transport_file_replay::FileReplayConfig;
use transport_http_stream::HttpStreamConfig;

use super::error::CollectorError;

// ═══════════════════════════════════════════════════════════════
//  Config file (TOML)
// ═══════════════════════════════════════════════════════════════

/// Секция `[credentials]` здесь не читается: её читает `FileCredentials`
/// заново при каждой аутентификации.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub project: ProjectConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub storage: SqliteStoreConfig,
    #[serde(default)]
    pub runner: RunnerConfig,
    #[serde(default)]
    pub descriptor: DescriptorConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    #[default]
    Http,
    File,
}

/// Секция `[feed]`. Незаданные поля берутся из умолчаний транспорта.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedConfig {
    #[serde(default)]
    pub transport: TransportKind,
    pub stream_url: Option<String>,
    pub token_url: Option<String>,
    pub replay_file: Option<PathBuf>,
    pub connect_timeout_ms: Option<u64>,
    pub max_line_bytes: Option<usize>,
}

impl FeedConfig {
    pub fn http(&self) -> HttpStreamConfig {
        let mut cfg = HttpStreamConfig::default();
        if let Some(url) = &self.stream_url {
            cfg.stream_url = url.clone();
        }
        if let Some(url) = &self.token_url {
            cfg.token_url = url.clone();
        }
        if let Some(ms) = self.connect_timeout_ms {
            cfg.connect_timeout_ms = ms;
        }
        if let Some(n) = self.max_line_bytes {
            cfg.max_line_bytes = n;
        }
        cfg
    }

    pub fn file(&self) -> Result<FileReplayConfig, CollectorError> {
        let path = self
            .replay_file
            .clone()
            .ok_or_else(|| CollectorError::Config("[feed] replay_file is required with transport = \"file\"".into()))?;
        Ok(FileReplayConfig {
            path,
            max_line_bytes: self.max_line_bytes.unwrap_or(0),
        })
    }
}

pub fn load_config(path: &Path) -> Result<Config, CollectorError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| CollectorError::Config(format!("cannot read config {}: {e}", path.display())))?;
    toml::from_str(&content).map_err(|e| CollectorError::Config(format!("bad config {}: {e}", path.display())))
}

// ═══════════════════════════════════════════════════════════════
//  CLI args
// ═══════════════════════════════════════════════════════════════

#[derive(Args, Clone, Debug, Default)]
pub struct CollectArgs {
    /// Путь к config.toml
    #[arg(long, default_value = "config.toml", env = "FEED_COLLECTOR_CONFIG")]
    pub config: String,

    /// Имя проекта (метка каждой сохранённой записи)
    #[arg(short = 'p', long)]
    pub project: Option<String>,

    /// Track-термы фильтра, через пробел или запятую
    #[arg(short = 't', long, num_args = 1.., value_delimiter = ',')]
    pub track: Vec<String>,

    /// Коды языков (напр. en es)
    #[arg(short = 'l', long, num_args = 1.., value_delimiter = ',')]
    pub languages: Vec<String>,

    /// Хранить события в памяти вместо SQLite
    #[arg(long)]
    pub dry_run: bool,
}

// ═══════════════════════════════════════════════════════════════
//  Effective: merged config
// ═══════════════════════════════════════════════════════════════

/// Итоговая конфигурация после мержа: config.toml < env/CLI
#[derive(Debug, Clone)]
pub struct Effective {
    pub config_path: PathBuf,
    /// Файл конфигурации существует, из него читаются credentials.
    pub config_found: bool,
    pub project: String,
    pub track: Vec<String>,
    pub languages: Vec<String>,
    pub feed: FeedConfig,
    pub storage: SqliteStoreConfig,
    pub runner: RunnerConfig,
    pub descriptor: DescriptorConfig,
    pub dry_run: bool,
}

impl Effective {
    pub fn new(args: &CollectArgs) -> Result<Self, CollectorError> {
        let config_path = PathBuf::from(&args.config);
        let config_found = config_path.exists();
        let cfg = if config_found {
            load_config(&config_path)?
        } else {
            Config::default()
        };

        let project = args
            .project
            .clone()
            .or(cfg.project.name)
            .ok_or_else(|| CollectorError::Config("project name required: --project or [project] name".into()))?;

        let track = if args.track.is_empty() { cfg.project.track } else { args.track.clone() };
        if track.is_empty() {
            return Err(CollectorError::Config("at least one track term required: --track or [project] track".into()));
        }
        let languages = if args.languages.is_empty() {
            cfg.project.languages
        } else {
            args.languages.clone()
        };

        Ok(Self {
            config_path,
            config_found,
            project,
            track,
            languages,
            feed: cfg.feed,
            storage: cfg.storage,
            runner: cfg.runner,
            descriptor: cfg.descriptor,
            dry_run: args.dry_run,
        })
    }
}
