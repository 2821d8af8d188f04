//! Parameter declarations
//!
//! A [`ParameterSpec`] is the immutable schema a config resolves against:
//! every name a caller may ask for, with the type its raw value converts to.
//! It is built once with [`ParameterSpec::builder`] or read from a
//! declaration file.

use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use super::types::ParameterType;
use crate::error::{ComposerError, Result};

const NAME_PATTERN: &str = r"^[A-Za-z_][A-Za-z0-9_]*$";

#[derive(Debug, Clone)]
pub struct ParameterDef {
    pub name: String,
    pub parameter_type: ParameterType,
}

#[derive(Debug, Clone)]
pub struct ParameterSpec {
    parameters: Arc<Vec<ParameterDef>>,
    index: Arc<HashMap<String, usize>>,
}

impl ParameterSpec {
    pub fn builder() -> ParameterSpecBuilder {
        ParameterSpecBuilder::default()
    }

    pub fn get(&self, name: &str) -> Option<&ParameterDef> {
        self.index.get(name).map(|&position| &self.parameters[position])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Declared names, in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.parameters.iter().map(|def| def.name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParameterDef> {
        self.parameters.iter()
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// Read a `parameters` table of name to type name from a `.toml`,
    /// `.yaml` or `.yml` file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let not_a_type_map = || {
            ComposerError::schema(format!(
                "parameter declarations in {} must map names to type names",
                path.display()
            ))
        };
        let declared: Vec<(String, String)> = match extension(path).as_str() {
            "toml" => {
                let file: TypeDeclarations<toml::Table> = toml::from_str(&contents)?;
                file.parameters
                    .into_iter()
                    .map(|(name, type_name)| match type_name {
                        toml::Value::String(type_name) => Ok((name, type_name)),
                        _ => Err(not_a_type_map()),
                    })
                    .collect::<Result<_>>()?
            }
            "yaml" | "yml" => {
                let file: TypeDeclarations<serde_yaml::Mapping> = serde_yaml::from_str(&contents)?;
                file.parameters
                    .into_iter()
                    .map(|(name, type_name)| {
                        match (name.as_str(), type_name.as_str()) {
                            (Some(name), Some(type_name)) => {
                                Ok((name.to_string(), type_name.to_string()))
                            }
                            _ => Err(not_a_type_map()),
                        }
                    })
                    .collect::<Result<_>>()?
            }
            other => {
                return Err(ComposerError::schema(format!(
                    "unsupported parameter file type '{other}': {}",
                    path.display()
                )))
            }
        };

        let mut builder = Self::builder();
        for (name, type_name) in declared {
            let parameter_type = ParameterType::from_name(&type_name).ok_or_else(|| {
                ComposerError::schema(format!("unknown type '{type_name}' for parameter '{name}'"))
            })?;
            builder = builder.declare(name, parameter_type);
        }
        let spec = builder.build()?;
        info!("Loaded {} parameter declarations from {}", spec.len(), path.display());
        Ok(spec)
    }
}

#[derive(Deserialize)]
struct TypeDeclarations<T> {
    parameters: T,
}

pub(crate) fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|extension| extension.to_str())
        .unwrap_or_default()
        .to_lowercase()
}

#[derive(Debug, Default)]
pub struct ParameterSpecBuilder {
    parameters: Vec<ParameterDef>,
}

impl ParameterSpecBuilder {
    pub fn declare<S: Into<String>>(mut self, name: S, parameter_type: ParameterType) -> Self {
        self.parameters.push(ParameterDef {
            name: name.into(),
            parameter_type,
        });
        self
    }

    /// Validate names and freeze the declarations.
    pub fn build(self) -> Result<ParameterSpec> {
        let pattern = Regex::new(NAME_PATTERN)?;
        let mut index = HashMap::with_capacity(self.parameters.len());

        for (position, def) in self.parameters.iter().enumerate() {
            if !pattern.is_match(&def.name) {
                return Err(ComposerError::schema(format!(
                    "invalid parameter name '{}'",
                    def.name
                )));
            }
            if index.insert(def.name.clone(), position).is_some() {
                return Err(ComposerError::schema(format!(
                    "parameter '{}' declared more than once",
                    def.name
                )));
            }
        }

        Ok(ParameterSpec {
            parameters: Arc::new(self.parameters),
            index: Arc::new(index),
        })
    }
}
