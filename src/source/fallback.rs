//! Fallback chains
//!
//! A chain tries its sources left to right through the host's cache store and
//! returns the first value that is not "nothing". Earlier sources are always
//! consulted first, with whatever fetch that implies. The chain itself caches
//! nothing: repeated resolutions rely on each source's cache entry.

use std::fmt;
use std::sync::Arc;
use tracing::debug;

use super::{Source, SourceResult, SourceValue};
use crate::cache::CacheStore;

#[derive(Clone, Default)]
pub struct Sources {
    sources: Vec<Arc<dyn Source>>,
}

impl Sources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a source with lower priority than those already present.
    pub fn or<S: Source + 'static>(mut self, source: S) -> Self {
        self.sources.push(Arc::new(source));
        self
    }

    pub fn or_shared(mut self, source: Arc<dyn Source>) -> Self {
        self.sources.push(source);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Source>> {
        self.sources.iter()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn resolve(&self, cache: &CacheStore) -> SourceValue {
        for source in &self.sources {
            let value = cache.resolve(source.as_ref());
            if !value.is_nothing() {
                return value;
            }
            debug!("{} produced nothing, falling back", source.describe());
        }
        SourceValue::Nothing
    }

    /// Printable descriptions, in priority order.
    pub fn describe(&self) -> Vec<String> {
        self.sources.iter().map(|source| source.describe()).collect()
    }

    /// Cache state of every source in the chain, without triggering fetches.
    pub fn results(&self, cache: &CacheStore) -> Vec<(String, SourceResult)> {
        self.sources
            .iter()
            .map(|source| (source.describe(), cache.result(source.as_ref())))
            .collect()
    }
}

impl fmt::Debug for Sources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.sources.iter()).finish()
    }
}

impl<S: Source + 'static> From<S> for Sources {
    fn from(source: S) -> Self {
        Self::new().or(source)
    }
}

impl FromIterator<Arc<dyn Source>> for Sources {
    fn from_iter<I: IntoIterator<Item = Arc<dyn Source>>>(iter: I) -> Self {
        Self {
            sources: iter.into_iter().collect(),
        }
    }
}
