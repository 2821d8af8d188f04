//! Source declaration files
//!
//! A declaration file names, for each parameter, the source kind backing it
//! and that kind's constructor arguments:
//!
//! ```yaml
//! parameters:
//!   foo:
//!     source: Env
//!     path: VALUE
//!   bar:                       # a list declares a fallback chain
//!     - source: Env
//!       path: BAR
//!     - source: Default
//!       value: "8080"
//! ```
//!
//! `.ini` files use one `[parameter_<name>]` section per parameter and
//! `.toml` files a `[parameters.<name>]` table (or array of tables for a
//! chain). Each kind declares the argument names its constructor accepts;
//! any other keys in a declaration are ignored.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::group::SourceGroup;
use super::parameter::extension;
use crate::error::{ComposerError, Result};
use crate::source::{DefaultSecret, DefaultValue, DotEnvFile, Env, Source, Sources};

pub type SourceArgs = HashMap<String, String>;

/// One source as written in a declaration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDefinition {
    pub kind: String,
    pub args: SourceArgs,
}

/// A parameter and the chain of sources declared for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterDeclaration {
    pub parameter: String,
    pub sources: Vec<SourceDefinition>,
}

type Constructor = dyn Fn(&SourceArgs) -> Result<Arc<dyn Source>> + Send + Sync;

#[derive(Clone)]
struct SourceFactory {
    arguments: Vec<String>,
    construct: Arc<Constructor>,
}

/// Source kinds that declaration files may name.
#[derive(Clone)]
pub struct SourceRegistry {
    factories: HashMap<String, SourceFactory>,
}

fn required<'a>(kind: &str, args: &'a SourceArgs, argument: &str) -> Result<&'a str> {
    args.get(argument)
        .map(String::as_str)
        .ok_or_else(|| ComposerError::missing_argument(kind, argument))
}

impl SourceRegistry {
    /// A registry with no kinds at all.
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// The built-in kinds: `Env`, `Default`, `DefaultSecret`, `DotEnvFile`.
    pub fn new() -> Self {
        let mut registry = Self::empty();

        registry.register("Env", &["path", "prefix"], |args| {
            let mut source = Env::new(required("Env", args, "path")?);
            if let Some(prefix) = args.get("prefix") {
                source = source.with_prefix(prefix.as_str());
            }
            Ok(Arc::new(source) as Arc<dyn Source>)
        });

        registry.register("Default", &["value"], |args| {
            let value = required("Default", args, "value")?;
            Ok(Arc::new(DefaultValue::new(value)) as Arc<dyn Source>)
        });

        registry.register("DefaultSecret", &["value"], |args| {
            let value = required("DefaultSecret", args, "value")?;
            Ok(Arc::new(DefaultSecret::new(value)) as Arc<dyn Source>)
        });

        registry.register("DotEnvFile", &["path", "dotenv_path", "ttl"], |args| {
            let mut source = DotEnvFile::new(required("DotEnvFile", args, "path")?);
            if let Some(dotenv_path) = args.get("dotenv_path") {
                source = source.with_dotenv_path(dotenv_path);
            }
            if let Some(ttl) = args.get("ttl") {
                let seconds: u64 = ttl.trim().parse().map_err(|_| {
                    ComposerError::invalid_argument(format!(
                        "DotEnvFile ttl must be a whole number of seconds, got '{ttl}'"
                    ))
                })?;
                source = source.with_ttl(Some(Duration::from_secs(seconds)));
            }
            Ok(Arc::new(source) as Arc<dyn Source>)
        });

        registry
    }

    /// Register a kind. `arguments` lists the constructor's argument names;
    /// the constructor only ever sees those.
    pub fn register<S, F>(&mut self, kind: S, arguments: &[&str], construct: F)
    where
        S: Into<String>,
        F: Fn(&SourceArgs) -> Result<Arc<dyn Source>> + Send + Sync + 'static,
    {
        self.factories.insert(
            kind.into(),
            SourceFactory {
                arguments: arguments.iter().map(|argument| argument.to_string()).collect(),
                construct: Arc::new(construct),
            },
        );
    }

    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }

    /// Construct a source, dropping arguments its kind does not declare.
    pub fn build(&self, definition: &SourceDefinition) -> Result<Arc<dyn Source>> {
        let factory = self
            .factories
            .get(&definition.kind)
            .ok_or_else(|| ComposerError::unknown_source_kind(definition.kind.as_str()))?;

        let args: SourceArgs = definition
            .args
            .iter()
            .filter(|(name, _)| factory.arguments.contains(*name))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();

        (factory.construct)(&args)
    }

    pub fn build_group<S: Into<String>>(
        &self,
        name: S,
        declarations: &[ParameterDeclaration],
    ) -> Result<SourceGroup> {
        let mut group = SourceGroup::new(name);
        for declaration in declarations {
            let sources = declaration
                .sources
                .iter()
                .map(|definition| self.build(definition))
                .collect::<Result<Sources>>()?;
            group.insert(declaration.parameter.as_str(), sources);
        }
        Ok(group)
    }
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}

fn definition_from_pairs<I>(parameter: &str, pairs: I) -> Result<SourceDefinition>
where
    I: IntoIterator<Item = (String, Option<String>)>,
{
    let mut kind = None;
    let mut args = SourceArgs::new();
    for (key, value) in pairs {
        // absent values are treated as not given
        let Some(value) = value else { continue };
        if key == "source" {
            kind = Some(value);
        } else {
            args.insert(key, value);
        }
    }
    let kind = kind.ok_or_else(|| {
        ComposerError::declaration(format!("parameter '{parameter}' does not name a source"))
    })?;
    Ok(SourceDefinition { kind, args })
}

fn yaml_scalar(parameter: &str, value: serde_yaml::Value) -> Result<Option<String>> {
    match value {
        serde_yaml::Value::Null => Ok(None),
        serde_yaml::Value::String(value) => Ok(Some(value)),
        serde_yaml::Value::Bool(value) => Ok(Some(value.to_string())),
        serde_yaml::Value::Number(value) => Ok(Some(value.to_string())),
        _ => Err(ComposerError::declaration(format!(
            "arguments of parameter '{parameter}' must be scalars"
        ))),
    }
}

fn yaml_definition(parameter: &str, value: serde_yaml::Value) -> Result<SourceDefinition> {
    let serde_yaml::Value::Mapping(mapping) = value else {
        return Err(ComposerError::declaration(format!(
            "parameter '{parameter}' must be a mapping or a list of mappings"
        )));
    };
    let pairs = mapping
        .into_iter()
        .map(|(key, value)| -> Result<(String, Option<String>)> {
            let key = key.as_str().map(str::to_string).ok_or_else(|| {
                ComposerError::declaration(format!("non-string key in parameter '{parameter}'"))
            })?;
            Ok((key, yaml_scalar(parameter, value)?))
        })
        .collect::<Result<Vec<_>>>()?;
    definition_from_pairs(parameter, pairs)
}

pub fn parse_yaml_declarations(contents: &str) -> Result<Vec<ParameterDeclaration>> {
    let root: serde_yaml::Value = serde_yaml::from_str(contents)?;
    let parameters = match root.get("parameters") {
        Some(serde_yaml::Value::Mapping(parameters)) => parameters.clone(),
        _ => {
            return Err(ComposerError::declaration(
                "YAML declarations need a top-level 'parameters' mapping",
            ))
        }
    };

    parameters
        .into_iter()
        .map(|(name, value)| -> Result<ParameterDeclaration> {
            let parameter = name.as_str().map(str::to_string).ok_or_else(|| {
                ComposerError::declaration("parameter names must be strings")
            })?;
            let sources = match value {
                serde_yaml::Value::Sequence(chain) => chain
                    .into_iter()
                    .map(|value| yaml_definition(&parameter, value))
                    .collect::<Result<Vec<_>>>()?,
                value => vec![yaml_definition(&parameter, value)?],
            };
            Ok(ParameterDeclaration { parameter, sources })
        })
        .collect()
}

fn toml_definition(parameter: &str, value: toml::Value) -> Result<SourceDefinition> {
    let toml::Value::Table(table) = value else {
        return Err(ComposerError::declaration(format!(
            "parameter '{parameter}' must be a table or an array of tables"
        )));
    };
    let pairs = table
        .into_iter()
        .map(|(key, value)| -> Result<(String, Option<String>)> {
            let value = match value {
                toml::Value::String(value) => value,
                toml::Value::Integer(value) => value.to_string(),
                toml::Value::Float(value) => value.to_string(),
                toml::Value::Boolean(value) => value.to_string(),
                toml::Value::Datetime(value) => value.to_string(),
                _ => {
                    return Err(ComposerError::declaration(format!(
                        "arguments of parameter '{parameter}' must be scalars"
                    )))
                }
            };
            Ok((key, Some(value)))
        })
        .collect::<Result<Vec<_>>>()?;
    definition_from_pairs(parameter, pairs)
}

pub fn parse_toml_declarations(contents: &str) -> Result<Vec<ParameterDeclaration>> {
    let mut root: toml::Table = contents.parse()?;
    let parameters = match root.remove("parameters") {
        Some(toml::Value::Table(parameters)) => parameters,
        _ => {
            return Err(ComposerError::declaration(
                "TOML declarations need a [parameters] table",
            ))
        }
    };

    parameters
        .into_iter()
        .map(|(parameter, value)| -> Result<ParameterDeclaration> {
            let sources = match value {
                toml::Value::Array(chain) => chain
                    .into_iter()
                    .map(|value| toml_definition(&parameter, value))
                    .collect::<Result<Vec<_>>>()?,
                value => vec![toml_definition(&parameter, value)?],
            };
            Ok(ParameterDeclaration { parameter, sources })
        })
        .collect()
}

const INI_SECTION_PREFIX: &str = "parameter_";

pub fn parse_ini_declarations(contents: &str) -> Result<Vec<ParameterDeclaration>> {
    let ini = ini::Ini::load_from_str(contents)?;

    let mut declarations = Vec::new();
    for (section, properties) in ini.iter() {
        let Some(parameter) = section.and_then(|name| name.strip_prefix(INI_SECTION_PREFIX)) else {
            if let Some(section) = section {
                debug!("Ignoring INI section '{}'", section);
            }
            continue;
        };
        let pairs = properties
            .iter()
            .map(|(key, value)| (key.to_string(), Some(value.to_string())));
        declarations.push(ParameterDeclaration {
            parameter: parameter.to_string(),
            sources: vec![definition_from_pairs(parameter, pairs)?],
        });
    }
    Ok(declarations)
}

/// Parse a declaration file, picking the format from its extension.
pub fn parse_declaration_file<P: AsRef<Path>>(path: P) -> Result<Vec<ParameterDeclaration>> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)?;
    match extension(path).as_str() {
        "yaml" | "yml" => parse_yaml_declarations(&contents),
        "toml" => parse_toml_declarations(&contents),
        "ini" => parse_ini_declarations(&contents),
        other => Err(ComposerError::declaration(format!(
            "unsupported declaration file type '{other}': {}",
            path.display()
        ))),
    }
}

/// Build one source group from a declaration file. The group is named
/// after the file.
pub fn load_group<P: AsRef<Path>>(path: P, registry: &SourceRegistry) -> Result<SourceGroup> {
    let path = path.as_ref();
    let declarations = parse_declaration_file(path)?;
    let group = registry.build_group(path.display().to_string(), &declarations)?;
    info!(
        "Loaded {} source declarations from {}",
        group.len(),
        path.display()
    );
    Ok(group)
}

/// Build groups from several files; earlier files take precedence.
pub fn load_groups<I, P>(paths: I, registry: &SourceRegistry) -> Result<Vec<SourceGroup>>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    paths
        .into_iter()
        .map(|path| load_group(path, registry))
        .collect()
}

/// Build groups from the comma-separated file list held in `var`.
pub fn load_groups_from_env(var: &str, registry: &SourceRegistry) -> Result<Vec<SourceGroup>> {
    let paths = std::env::var(var).map_err(|_| {
        ComposerError::declaration(format!("environment variable {var} is not set"))
    })?;
    let paths: Vec<&str> = paths
        .split(',')
        .map(str::trim)
        .filter(|path| !path.is_empty())
        .collect();
    if paths.is_empty() {
        return Err(ComposerError::declaration(format!(
            "environment variable {var} names no declaration files"
        )));
    }
    load_groups(paths, registry)
}
