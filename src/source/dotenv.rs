//! Dotenv file source
//!
//! A dotenv file is a document source: one read of the file caches every
//! variable it defines, so every parameter reading the same file shares a
//! single fetch per TTL window. Keys are case-sensitive.

use chrono::{DateTime, Utc};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::{Document, Refresh, Source, SourceKey, DEFAULT_TTL};
use crate::error::SourceFetchError;

pub const DEFAULT_DOTENV_PATH: &str = ".env";

#[derive(Clone)]
pub struct DotEnvFile {
    path: String,
    dotenv_path: PathBuf,
    ttl: Option<Duration>,
}

impl DotEnvFile {
    /// Read variable `path` from `.env` in the working directory.
    pub fn new<S: Into<String>>(path: S) -> Self {
        Self {
            path: path.into(),
            dotenv_path: PathBuf::from(DEFAULT_DOTENV_PATH),
            ttl: Some(DEFAULT_TTL),
        }
    }

    pub fn with_dotenv_path<P: AsRef<Path>>(mut self, dotenv_path: P) -> Self {
        self.dotenv_path = dotenv_path.as_ref().to_path_buf();
        self
    }

    /// `None` or a zero duration caches the file for the life of the host.
    pub fn with_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.ttl = ttl.filter(|ttl| !ttl.is_zero());
        self
    }

    pub fn dotenv_path(&self) -> &Path {
        &self.dotenv_path
    }

    fn display_path(&self) -> String {
        self.dotenv_path.display().to_string()
    }
}

impl fmt::Debug for DotEnvFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DotEnvFile(path=\"{}\", dotenv_path=\"{}\")",
            self.path,
            self.dotenv_path.display()
        )
    }
}

impl Source for DotEnvFile {
    fn key(&self) -> SourceKey {
        SourceKey::new("DotEnvFile").with(self.display_path())
    }

    fn field(&self) -> &str {
        &self.path
    }

    fn fetch(&self) -> Result<Document, SourceFetchError> {
        let path = self.display_path();
        let entries = dotenvy::from_path_iter(&self.dotenv_path)
            .map_err(|e| SourceFetchError::read(path.clone(), e.to_string()))?;

        let mut document = Document::new();
        for entry in entries {
            let (key, value) = entry.map_err(|e| match e {
                dotenvy::Error::Io(io) => SourceFetchError::read(path.clone(), io.to_string()),
                other => SourceFetchError::malformed(path.clone(), other.to_string()),
            })?;
            document.insert(key, value);
        }
        Ok(document)
    }

    fn refresh(&self) -> Refresh {
        match self.ttl {
            Some(ttl) => Refresh::Ttl(ttl),
            None => Refresh::Once,
        }
    }

    fn marker(&self) -> Option<String> {
        let modified = std::fs::metadata(&self.dotenv_path)
            .and_then(|metadata| metadata.modified())
            .ok()?;
        Some(DateTime::<Utc>::from(modified).to_rfc3339())
    }
}
