//! Literal default sources

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use zeroize::Zeroizing;

use super::{value_document, Document, Source, SourceKey};
use crate::error::SourceFetchError;

const FIELD: &str = "value";

/// A fixed value, always available.
#[derive(Clone)]
pub struct DefaultValue {
    value: String,
}

impl DefaultValue {
    pub fn new<S: Into<String>>(value: S) -> Self {
        Self {
            value: value.into(),
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Default(value=\"{}\")", self.value)
    }
}

impl Source for DefaultValue {
    fn key(&self) -> SourceKey {
        SourceKey::new("Default").with(self.value.as_str())
    }

    fn field(&self) -> &str {
        FIELD
    }

    fn fetch(&self) -> Result<Document, SourceFetchError> {
        Ok(value_document(FIELD, Some(self.value.clone())))
    }
}

static NEXT_SECRET_ID: AtomicU64 = AtomicU64::new(1);

/// A fixed value that never appears in descriptions, logs or cache keys.
#[derive(Clone)]
pub struct DefaultSecret {
    id: u64,
    value: Arc<Zeroizing<String>>,
}

impl DefaultSecret {
    pub fn new<S: Into<String>>(value: S) -> Self {
        Self {
            id: NEXT_SECRET_ID.fetch_add(1, Ordering::Relaxed),
            value: Arc::new(Zeroizing::new(value.into())),
        }
    }
}

impl fmt::Debug for DefaultSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DefaultSecret(value=\"*** redacted ***\")")
    }
}

impl Source for DefaultSecret {
    fn key(&self) -> SourceKey {
        SourceKey::new("DefaultSecret").with(format!("#{}", self.id))
    }

    fn field(&self) -> &str {
        FIELD
    }

    fn fetch(&self) -> Result<Document, SourceFetchError> {
        Ok(value_document(FIELD, Some(self.value.as_str().to_string())))
    }
}
