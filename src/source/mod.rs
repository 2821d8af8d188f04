//! Source descriptors
//!
//! A source is a pluggable origin of a configuration value. Descriptors
//! never hold a value themselves: they name the record they read
//! ([`SourceKey`]), the field within it, and how to fetch it. The cache
//! store of whichever object composes them decides when the fetch runs.

pub mod default;
pub mod dotenv;
pub mod env;
pub mod fallback;
pub mod machine;

pub use default::{DefaultSecret, DefaultValue};
pub use dotenv::DotEnvFile;
pub use env::Env;
pub use fallback::Sources;
pub use machine::{FetchMachine, MachineKind, SourceResult, SourceState};

use crate::error::SourceFetchError;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

/// Default lifetime of a cached document before it may be fetched again.
pub const DEFAULT_TTL: Duration = Duration::from_secs(15);

/// Field name to raw value, as returned by a single fetch.
pub type Document = HashMap<String, String>;

/// Identity of an external record: source kind plus the constructor
/// arguments that distinguish it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceKey(Vec<String>);

impl SourceKey {
    pub fn new<S: Into<String>>(kind: S) -> Self {
        Self(vec![kind.into()])
    }

    pub fn with<S: Into<String>>(mut self, part: S) -> Self {
        self.0.push(part.into());
        self
    }

    pub fn kind(&self) -> &str {
        &self.0[0]
    }

    pub fn parts(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for SourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.0.join(", "))
    }
}

/// Raw value produced by a source, or the "nothing" sentinel.
///
/// `Nothing` means the source declined to produce a value (or has not been
/// fetched yet). It drives fallback and is never handed to a caller as a
/// resolved configuration value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceValue {
    Value(String),
    Nothing,
}

impl SourceValue {
    pub fn is_nothing(&self) -> bool {
        matches!(self, Self::Nothing)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Value(value) => Some(value),
            Self::Nothing => None,
        }
    }

    pub fn into_option(self) -> Option<String> {
        match self {
            Self::Value(value) => Some(value),
            Self::Nothing => None,
        }
    }
}

impl From<Option<String>> for SourceValue {
    fn from(value: Option<String>) -> Self {
        value.map_or(Self::Nothing, Self::Value)
    }
}

/// When a cached record may be fetched again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refresh {
    /// Fetch once; retry only while the source has never succeeded.
    Once,
    /// Re-fetch when the record is older than the given lifetime.
    Ttl(Duration),
}

impl Refresh {
    pub fn machine_kind(&self) -> MachineKind {
        match self {
            Self::Once => MachineKind::Basic,
            Self::Ttl(_) => MachineKind::Expirable,
        }
    }
}

/// A lazily fetched configuration source.
///
/// Value sources return a document with at most one entry, keyed by
/// [`Source::field`]. Document sources return every field the record holds
/// so that siblings sharing the same [`SourceKey`] are served from a single
/// round trip.
pub trait Source: fmt::Debug + Send + Sync {
    /// Identity of the record this descriptor reads.
    fn key(&self) -> SourceKey;

    /// Field read out of the fetched record.
    fn field(&self) -> &str;

    /// Fetch the record. A missing field means "nothing".
    fn fetch(&self) -> Result<Document, SourceFetchError>;

    fn refresh(&self) -> Refresh {
        Refresh::Once
    }

    /// External change marker recorded alongside a TTL record.
    fn marker(&self) -> Option<String> {
        None
    }

    /// Printable form used by parameter introspection.
    fn describe(&self) -> String {
        format!("{self:?}")
    }
}

/// Build a single-entry document for a value source.
pub fn value_document(field: &str, value: Option<String>) -> Document {
    let mut document = Document::new();
    if let Some(value) = value {
        document.insert(field.to_string(), value);
    }
    document
}
