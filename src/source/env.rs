//! Environment variable source

use std::env::VarError;
use std::fmt;

use super::{value_document, Document, Source, SourceKey};
use crate::error::SourceFetchError;

/// Reads one environment variable. The variable name is the optional prefix
/// followed by the path, upper-cased.
#[derive(Clone)]
pub struct Env {
    path: String,
    prefix: Option<String>,
    variable: String,
}

impl Env {
    pub fn new<S: Into<String>>(path: S) -> Self {
        let path = path.into();
        let variable = path.to_uppercase();
        Self {
            path,
            prefix: None,
            variable,
        }
    }

    pub fn with_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        let prefix = prefix.into();
        self.variable = format!("{}{}", prefix, self.path).to_uppercase();
        self.prefix = Some(prefix);
        self
    }

    /// Name of the variable that is looked up.
    pub fn variable(&self) -> &str {
        &self.variable
    }
}

impl fmt::Debug for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.prefix {
            Some(prefix) => write!(f, "Env(path=\"{}\", prefix=\"{}\")", self.path, prefix),
            None => write!(f, "Env(path=\"{}\")", self.path),
        }
    }
}

impl Source for Env {
    fn key(&self) -> SourceKey {
        SourceKey::new("Env").with(self.variable.as_str())
    }

    fn field(&self) -> &str {
        &self.variable
    }

    fn fetch(&self) -> Result<Document, SourceFetchError> {
        match std::env::var(&self.variable) {
            Ok(value) => Ok(value_document(&self.variable, Some(value))),
            Err(VarError::NotPresent) => Ok(value_document(&self.variable, None)),
            Err(VarError::NotUnicode(_)) => Err(SourceFetchError::malformed(
                self.variable.as_str(),
                "value is not valid unicode",
            )),
        }
    }
}
