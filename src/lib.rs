//! config-composer - Lazy, cached configuration resolution
//!
//! Typed parameters are declared once and resolved on demand from layered
//! source groups. Each group owns a cache of fetched records guarded by a
//! fetch state machine; expirable sources are re-read once their TTL lapses
//! and keep serving the last good record when a re-read fails.

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod source;
pub mod spec;
pub mod utils;

// Re-export commonly used types
pub use cache::{CacheStore, Clock, SystemClock, TtlPolicy};
pub use crate::config::{Config, ParameterInfo, SourceStatus};
pub use error::{ComposerError, Result, SourceFetchError};
pub use source::{
    DefaultSecret, DefaultValue, DotEnvFile, Env, Refresh, Source, SourceKey, SourceResult,
    SourceState, SourceValue, Sources,
};
pub use spec::{
    ComposedSourceSpec, ParameterSpec, ParameterType, ParameterValue, SecretValue, SourceGroup,
    SourceRegistry,
};
