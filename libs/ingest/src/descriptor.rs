use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;

use crate::error::DescriptorError;
use crate::normalize::CANONICAL_FORMAT;

/// Описание запуска: имя проекта, фильтр и момент создания.
///
/// Публикуется один раз до старта ингеста; ядро от результата не зависит.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectDescriptor {
    pub name: String,
    pub track: Vec<String>,
    pub languages: Vec<String>,
    pub created_at: String,
}

impl ProjectDescriptor {
    pub fn new(name: impl Into<String>, track: Vec<String>, languages: Vec<String>) -> Self {
        Self {
            name: name.into(),
            track,
            languages,
            created_at: Utc::now().format(CANONICAL_FORMAT).to_string(),
        }
    }
}

pub trait DescriptorSink {
    /// Publish the descriptor, returning where it went.
    fn publish(&self, descriptor: &ProjectDescriptor) -> Result<String, DescriptorError>;
}

/// Writes `{dir}/{name}.json` as a single JSON line.
pub struct LocalDescriptorSink {
    dir: PathBuf,
}

impl LocalDescriptorSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Имя проекта становится именем файла, поэтому разделители путей
    /// и `.`/`..` запрещены.
    fn path_for(&self, name: &str) -> Result<PathBuf, DescriptorError> {
        let invalid = name.is_empty()
            || name == "."
            || name == ".."
            || name.contains(['/', '\\', '\0']);
        if invalid {
            return Err(DescriptorError::InvalidName(name.to_string()));
        }
        Ok(self.dir.join(format!("{name}.json")))
    }
}

fn io_err(path: &Path, source: std::io::Error) -> DescriptorError {
    DescriptorError::Io { path: path.display().to_string(), source }
}

impl DescriptorSink for LocalDescriptorSink {
    fn publish(&self, descriptor: &ProjectDescriptor) -> Result<String, DescriptorError> {
        let path = self.path_for(&descriptor.name)?;
        std::fs::create_dir_all(&self.dir).map_err(|e| io_err(&self.dir, e))?;
        let line = serde_json::to_string(descriptor)?;
        std::fs::write(&path, format!("{line}\n")).map_err(|e| io_err(&path, e))?;
        Ok(path.display().to_string())
    }
}
