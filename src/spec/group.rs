//! Source groups and their composition
//!
//! A [`SourceGroup`] maps parameter names to fallback chains. Groups are
//! plain definitions: they can be shared between any number of configs.
//! A [`ComposedSourceSpec`] stacks groups in priority order and gives each a
//! cache store of its own; the first group that defines a name answers for
//! it and later groups are never consulted for that name.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::cache::{CacheStore, Clock, SystemClock};
use crate::source::{SourceResult, SourceValue, Sources};

#[derive(Debug, Clone, Default)]
pub struct SourceGroup {
    name: String,
    entries: BTreeMap<String, Sources>,
}

impl SourceGroup {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            entries: BTreeMap::new(),
        }
    }

    /// Define (or redefine) the chain backing `parameter`.
    pub fn with<S: Into<String>, C: Into<Sources>>(mut self, parameter: S, sources: C) -> Self {
        self.insert(parameter, sources);
        self
    }

    pub fn insert<S: Into<String>, C: Into<Sources>>(&mut self, parameter: S, sources: C) {
        self.entries.insert(parameter.into(), sources.into());
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, parameter: &str) -> Option<&Sources> {
        self.entries.get(parameter)
    }

    pub fn defines(&self, parameter: &str) -> bool {
        self.entries.contains_key(parameter)
    }

    pub fn parameters(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug)]
struct Layer {
    group: SourceGroup,
    cache: CacheStore,
}

/// Groups stacked by priority, each with an independent cache.
#[derive(Debug)]
pub struct ComposedSourceSpec {
    layers: Vec<Layer>,
}

impl ComposedSourceSpec {
    /// Earlier groups shadow later ones.
    pub fn new<I: IntoIterator<Item = SourceGroup>>(groups: I) -> Self {
        Self::with_clock(groups, Arc::new(SystemClock))
    }

    pub fn with_clock<I: IntoIterator<Item = SourceGroup>>(
        groups: I,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let layers = groups
            .into_iter()
            .map(|group| Layer {
                group,
                cache: CacheStore::with_clock(Arc::clone(&clock)),
            })
            .collect();
        Self { layers }
    }

    fn layer(&self, parameter: &str) -> Option<&Layer> {
        self.layers.iter().find(|layer| layer.group.defines(parameter))
    }

    /// Chain answering for `parameter`, with the cache it resolves through.
    pub fn lookup(&self, parameter: &str) -> Option<(&Sources, &CacheStore)> {
        self.layer(parameter).and_then(|layer| {
            layer
                .group
                .get(parameter)
                .map(|sources| (sources, &layer.cache))
        })
    }

    pub fn defines(&self, parameter: &str) -> bool {
        self.layer(parameter).is_some()
    }

    /// `None` when no group defines `parameter`.
    pub fn resolve(&self, parameter: &str) -> Option<SourceValue> {
        self.lookup(parameter)
            .map(|(sources, cache)| sources.resolve(cache))
    }

    /// Name of the group answering for `parameter`.
    pub fn group_of(&self, parameter: &str) -> Option<&str> {
        self.layer(parameter).map(|layer| layer.group.name())
    }

    pub fn results(&self, parameter: &str) -> Option<Vec<(String, SourceResult)>> {
        self.lookup(parameter)
            .map(|(sources, cache)| sources.results(cache))
    }

    pub fn groups(&self) -> impl Iterator<Item = &SourceGroup> {
        self.layers.iter().map(|layer| &layer.group)
    }

    pub fn cache(&self, index: usize) -> Option<&CacheStore> {
        self.layers.get(index).map(|layer| &layer.cache)
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

impl From<SourceGroup> for ComposedSourceSpec {
    fn from(group: SourceGroup) -> Self {
        Self::new([group])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::DefaultValue;

    #[test]
    fn test_earlier_group_shadows_later() {
        let g1 = SourceGroup::new("g1").with("foo", DefaultValue::new("x"));
        let g2 = SourceGroup::new("g2")
            .with("foo", DefaultValue::new("y"))
            .with("bar", DefaultValue::new("z"));
        let composed = ComposedSourceSpec::new([g1, g2]);

        assert_eq!(composed.resolve("foo").unwrap().as_str(), Some("x"));
        assert_eq!(composed.resolve("bar").unwrap().as_str(), Some("z"));
        assert_eq!(composed.group_of("foo"), Some("g1"));
        assert_eq!(composed.group_of("bar"), Some("g2"));
        assert!(composed.resolve("baz").is_none());
    }

    #[test]
    fn test_shadowed_group_is_never_fetched() {
        let g1 = SourceGroup::new("g1").with("foo", DefaultValue::new("x"));
        let g2 = SourceGroup::new("g2").with("foo", DefaultValue::new("y"));
        let composed = ComposedSourceSpec::new([g1, g2]);

        composed.resolve("foo");

        assert_eq!(composed.cache(0).map(CacheStore::len), Some(1));
        assert_eq!(composed.cache(1).map(CacheStore::len), Some(0));
    }

    #[test]
    fn test_many_groups() {
        let groups = (0..5).map(|i| {
            SourceGroup::new(format!("g{i}"))
                .with(format!("p{i}"), DefaultValue::new(i.to_string()))
        });
        let composed = ComposedSourceSpec::new(groups);

        assert_eq!(composed.len(), 5);
        for i in 0..5 {
            assert_eq!(
                composed.resolve(&format!("p{i}")).unwrap().into_option(),
                Some(i.to_string())
            );
        }
    }

    #[test]
    fn test_shared_group_definitions_keep_independent_caches() {
        let group = SourceGroup::new("shared").with("foo", DefaultValue::new("x"));
        let first = ComposedSourceSpec::from(group.clone());
        let second = ComposedSourceSpec::from(group);

        first.resolve("foo");

        assert_eq!(first.cache(0).map(CacheStore::len), Some(1));
        assert_eq!(second.cache(0).map(CacheStore::len), Some(0));
    }
}
