//! Config resolver
//!
//! A [`Config`] binds a parameter schema to a composed source spec. It keeps
//! no cache of its own: every lookup delegates to the composed groups, whose
//! cache stores decide whether a fetch happens. The composed spec is held
//! behind an `Arc`, so resolvers made with [`Config::with_parameters`] share
//! one set of group caches.

use std::sync::Arc;
use tracing::debug;

use super::info::{ParameterInfo, SourceStatus};
use crate::cache::Clock;
use crate::error::{ComposerError, Result};
use crate::source::SourceValue;
use crate::spec::{
    load_groups, load_groups_from_env, ComposedSourceSpec, ParameterDef, ParameterSpec,
    ParameterValue, SourceGroup, SourceRegistry,
};

#[derive(Debug)]
pub struct Config {
    parameters: ParameterSpec,
    sources: Arc<ComposedSourceSpec>,
}

impl Config {
    pub fn new<S: Into<Arc<ComposedSourceSpec>>>(parameters: ParameterSpec, sources: S) -> Self {
        Self {
            parameters,
            sources: sources.into(),
        }
    }

    /// A resolver over the same composed sources, and so the same caches,
    /// with a different parameter schema.
    pub fn with_parameters(&self, parameters: ParameterSpec) -> Self {
        Self::new(parameters, Arc::clone(&self.sources))
    }

    /// Compose `groups` in priority order, earliest first.
    pub fn from_groups<I>(parameters: ParameterSpec, groups: I) -> Self
    where
        I: IntoIterator<Item = SourceGroup>,
    {
        Self::new(parameters, ComposedSourceSpec::new(groups))
    }

    pub fn from_groups_with_clock<I>(
        parameters: ParameterSpec,
        groups: I,
        clock: Arc<dyn Clock>,
    ) -> Self
    where
        I: IntoIterator<Item = SourceGroup>,
    {
        Self::new(parameters, ComposedSourceSpec::with_clock(groups, clock))
    }

    /// Load source groups from declaration files, earliest first.
    pub fn from_files<I, P>(
        parameters: ParameterSpec,
        paths: I,
        registry: &SourceRegistry,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<std::path::Path>,
    {
        Ok(Self::from_groups(parameters, load_groups(paths, registry)?))
    }

    /// Load source groups from the comma-separated declaration files named
    /// by environment variable `var`.
    pub fn from_env_var(
        parameters: ParameterSpec,
        var: &str,
        registry: &SourceRegistry,
    ) -> Result<Self> {
        Ok(Self::from_groups(
            parameters,
            load_groups_from_env(var, registry)?,
        ))
    }

    pub fn parameters(&self) -> &ParameterSpec {
        &self.parameters
    }

    pub fn sources(&self) -> &ComposedSourceSpec {
        &self.sources
    }

    fn declared(&self, name: &str) -> Result<&ParameterDef> {
        self.parameters
            .get(name)
            .ok_or_else(|| ComposerError::parameter(name, "not declared"))
    }

    /// Resolve the raw text of a declared parameter.
    pub fn raw(&self, name: &str) -> Result<String> {
        self.declared(name)?;
        match self.sources.resolve(name) {
            None => Err(ComposerError::parameter(name, "no source defined")),
            Some(SourceValue::Nothing) => {
                Err(ComposerError::parameter(name, "no source produced a value"))
            }
            Some(SourceValue::Value(raw)) => Ok(raw),
        }
    }

    /// Resolve a parameter and convert it to its declared type.
    pub fn get(&self, name: &str) -> Result<ParameterValue> {
        let def = self.declared(name)?;
        let raw = self.raw(name)?;
        debug!("Resolved parameter {} as {}", name, def.parameter_type.name());
        def.parameter_type
            .convert(&raw)
            .map_err(|details| {
                ComposerError::conversion(name, def.parameter_type.name(), details.as_str())
            })
    }

    /// Like [`Config::get`], with undeclared or unresolvable parameters
    /// reported as `None`. Conversion failures are still errors.
    pub fn get_optional(&self, name: &str) -> Result<Option<ParameterValue>> {
        match self.get(name) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_parameter_error() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Resolve a parameter straight into a Rust type.
    pub fn get_as<T>(&self, name: &str) -> Result<T>
    where
        T: TryFrom<ParameterValue, Error = ComposerError>,
    {
        let value = self.get(name)?;
        let type_name = value.type_name();
        T::try_from(value).map_err(|e| {
            ComposerError::conversion(name.to_string(), type_name.to_string(), e.to_string())
        })
    }

    /// Resolve every declared parameter up front.
    ///
    /// Fails with one error naming every parameter that is undefined or
    /// resolved to nothing. Conversion failures abort immediately.
    pub fn preload(&self) -> Result<()> {
        let mut unresolved = Vec::new();
        for name in self.parameters.names() {
            match self.get(name) {
                Ok(_) => {}
                Err(e) if e.is_parameter_error() => unresolved.push(name.to_string()),
                Err(e) => return Err(e),
            }
        }

        if unresolved.is_empty() {
            debug!("Preloaded {} parameters", self.parameters.len());
            Ok(())
        } else {
            Err(ComposerError::PreloadError { names: unresolved })
        }
    }

    pub fn parameter_info(&self, name: &str) -> Result<ParameterInfo> {
        let def = self.declared(name)?;
        let sources = self
            .sources
            .lookup(name)
            .map(|(sources, _)| sources.describe())
            .unwrap_or_default();

        Ok(ParameterInfo {
            name: def.name.clone(),
            type_name: def.parameter_type.name().to_string(),
            group: self.sources.group_of(name).map(str::to_string),
            sources,
        })
    }

    /// Info for every declared parameter, in declaration order.
    pub fn all_parameter_info(&self) -> Vec<ParameterInfo> {
        self.parameters
            .names()
            .filter_map(|name| self.parameter_info(name).ok())
            .collect()
    }

    /// Cache state of each source backing a parameter. Does not fetch.
    pub fn source_status(&self, name: &str) -> Result<Vec<SourceStatus>> {
        self.declared(name)?;
        let results = self
            .sources
            .results(name)
            .ok_or_else(|| ComposerError::parameter(name, "no source defined"))?;

        Ok(results
            .into_iter()
            .map(|(source, result)| SourceStatus::new(name, source, &result))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{DefaultValue, Env, Sources};
    use crate::spec::ParameterType;

    fn spec() -> ParameterSpec {
        ParameterSpec::builder()
            .declare("foo", ParameterType::string())
            .declare("bar", ParameterType::integer())
            .build()
            .unwrap()
    }

    #[test]
    fn test_undeclared_name_is_parameter_error() {
        let group = SourceGroup::new("g")
            .with("foo", DefaultValue::new("x"))
            .with("baz", DefaultValue::new("present in sources"));
        let config = Config::from_groups(spec(), [group]);

        let err = config.get("baz").unwrap_err();
        assert!(err.is_parameter_error());
        assert!(config.get_optional("baz").unwrap().is_none());
    }

    #[test]
    fn test_declared_but_undefined_is_parameter_error() {
        let config = Config::from_groups(spec(), [SourceGroup::new("g")]);

        assert!(config.get("foo").unwrap_err().is_parameter_error());
        assert!(config.get_optional("foo").unwrap().is_none());
    }

    #[test]
    fn test_nothing_is_never_returned() {
        let group = SourceGroup::new("g").with("foo", Env::new("CC_RESOLVER_TEST_UNSET"));
        let config = Config::from_groups(spec(), [group]);

        assert!(config.get("foo").unwrap_err().is_parameter_error());
    }

    #[test]
    fn test_casts_to_declared_type() {
        let group = SourceGroup::new("g")
            .with("foo", DefaultValue::new("42"))
            .with("bar", DefaultValue::new("42"));
        let config = Config::from_groups(spec(), [group]);

        assert_eq!(config.get("foo").unwrap(), ParameterValue::String("42".to_string()));
        assert_eq!(config.get("bar").unwrap(), ParameterValue::Integer(42));
        assert_eq!(config.get_as::<i64>("bar").unwrap(), 42);
        assert!(config.get_as::<i64>("foo").is_err());
    }

    #[test]
    fn test_conversion_failure_is_not_swallowed() {
        let group = SourceGroup::new("g").with("bar", DefaultValue::new("not a number"));
        let config = Config::from_groups(spec(), [group]);

        assert!(matches!(
            config.get_optional("bar"),
            Err(ComposerError::ConversionError { .. })
        ));
    }

    #[test]
    fn test_preload_lists_every_unresolved_name() {
        let group = SourceGroup::new("g").with("foo", Env::new("CC_RESOLVER_TEST_ALSO_UNSET"));
        let config = Config::from_groups(spec(), [group]);

        match config.preload() {
            Err(ComposerError::PreloadError { names }) => {
                assert_eq!(names, vec!["foo".to_string(), "bar".to_string()]);
            }
            other => panic!("expected preload error, got {other:?}"),
        }
    }

    #[test]
    fn test_resolvers_share_group_caches() {
        std::env::set_var("CC_RESOLVER_SHARED", "first");
        let group = SourceGroup::new("g").with("foo", Env::new("CC_RESOLVER_SHARED"));
        let config = Config::from_groups(spec(), [group.clone()]);
        assert_eq!(config.get_as::<String>("foo").unwrap(), "first");

        std::env::set_var("CC_RESOLVER_SHARED", "second");
        let narrowed = ParameterSpec::builder()
            .declare("foo", ParameterType::string())
            .build()
            .unwrap();
        let shared = config.with_parameters(narrowed);
        assert_eq!(shared.get_as::<String>("foo").unwrap(), "first");
        assert!(shared.get("bar").unwrap_err().is_parameter_error());

        let fresh = Config::from_groups(spec(), [group]);
        assert_eq!(fresh.get_as::<String>("foo").unwrap(), "second");
        std::env::remove_var("CC_RESOLVER_SHARED");
    }

    #[test]
    fn test_parameter_info() {
        let group = SourceGroup::new("defaults").with(
            "foo",
            Sources::new().or(Env::new("VALUE")).or(DefaultValue::new("x")),
        );
        let config = Config::from_groups(spec(), [group]);

        let info = config.parameter_info("foo").unwrap();
        assert_eq!(info.name, "foo");
        assert_eq!(info.type_name, "string");
        assert_eq!(info.group.as_deref(), Some("defaults"));
        assert_eq!(
            info.sources,
            vec!["Env(path=\"VALUE\")".to_string(), "Default(value=\"x\")".to_string()]
        );

        let all = config.all_parameter_info();
        assert_eq!(all.len(), 2);
        assert!(all[1].sources.is_empty());
        assert!(config.parameter_info("nope").is_err());
    }
}
