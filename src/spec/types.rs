//! Parameter types
//!
//! A [`ParameterType`] is a named conversion from the raw text a source
//! produced into a typed [`ParameterValue`]. The built-in types cover the
//! common scalars; [`ParameterType::new`] injects any other conversion.

use serde::{Serialize, Serializer};
use std::fmt;
use std::sync::Arc;
use zeroize::Zeroizing;

use crate::error::{ComposerError, Result};

/// Secret text. Zeroized on drop and never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretValue(Zeroizing<String>);

impl SecretValue {
    pub fn new<S: Into<String>>(value: S) -> Self {
        Self(Zeroizing::new(value.into()))
    }

    pub fn expose(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretValue(***)")
    }
}

impl fmt::Display for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParameterValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Secret(SecretValue),
}

impl ParameterValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::Boolean(_) => "boolean",
            Self::Secret(_) => "secret",
        }
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(value) => f.write_str(value),
            Self::Integer(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Boolean(value) => write!(f, "{value}"),
            Self::Secret(value) => write!(f, "{value}"),
        }
    }
}

impl Serialize for ParameterValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::String(value) => serializer.serialize_str(value),
            Self::Integer(value) => serializer.serialize_i64(*value),
            Self::Float(value) => serializer.serialize_f64(*value),
            Self::Boolean(value) => serializer.serialize_bool(*value),
            Self::Secret(_) => serializer.serialize_str("***"),
        }
    }
}

fn mismatch(expected: &str, found: &ParameterValue) -> ComposerError {
    ComposerError::invalid_argument(format!(
        "expected {expected}, found {}",
        found.type_name()
    ))
}

impl TryFrom<ParameterValue> for String {
    type Error = ComposerError;

    fn try_from(value: ParameterValue) -> Result<Self> {
        match value {
            ParameterValue::String(value) => Ok(value),
            other => Err(mismatch("string", &other)),
        }
    }
}

impl TryFrom<ParameterValue> for i64 {
    type Error = ComposerError;

    fn try_from(value: ParameterValue) -> Result<Self> {
        match value {
            ParameterValue::Integer(value) => Ok(value),
            other => Err(mismatch("integer", &other)),
        }
    }
}

impl TryFrom<ParameterValue> for f64 {
    type Error = ComposerError;

    fn try_from(value: ParameterValue) -> Result<Self> {
        match value {
            ParameterValue::Float(value) => Ok(value),
            ParameterValue::Integer(value) => Ok(value as f64),
            other => Err(mismatch("float", &other)),
        }
    }
}

impl TryFrom<ParameterValue> for bool {
    type Error = ComposerError;

    fn try_from(value: ParameterValue) -> Result<Self> {
        match value {
            ParameterValue::Boolean(value) => Ok(value),
            other => Err(mismatch("boolean", &other)),
        }
    }
}

impl TryFrom<ParameterValue> for SecretValue {
    type Error = ComposerError;

    fn try_from(value: ParameterValue) -> Result<Self> {
        match value {
            ParameterValue::Secret(value) => Ok(value),
            other => Err(mismatch("secret", &other)),
        }
    }
}

type Converter = dyn Fn(&str) -> std::result::Result<ParameterValue, String> + Send + Sync;

/// Named conversion factory applied at the resolver boundary.
#[derive(Clone)]
pub struct ParameterType {
    name: String,
    convert: Arc<Converter>,
}

impl ParameterType {
    pub fn new<S, F>(name: S, convert: F) -> Self
    where
        S: Into<String>,
        F: Fn(&str) -> std::result::Result<ParameterValue, String> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            convert: Arc::new(convert),
        }
    }

    pub fn string() -> Self {
        Self::new("string", |raw| Ok(ParameterValue::String(raw.to_string())))
    }

    pub fn integer() -> Self {
        Self::new("integer", |raw| {
            raw.trim()
                .parse::<i64>()
                .map(ParameterValue::Integer)
                .map_err(|e| format!("'{raw}' is not an integer ({e})"))
        })
    }

    pub fn float() -> Self {
        Self::new("float", |raw| {
            raw.trim()
                .parse::<f64>()
                .map(ParameterValue::Float)
                .map_err(|e| format!("'{raw}' is not a number ({e})"))
        })
    }

    pub fn boolean() -> Self {
        Self::new("boolean", |raw| {
            match raw.trim().to_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Ok(ParameterValue::Boolean(true)),
                "false" | "0" | "no" | "off" => Ok(ParameterValue::Boolean(false)),
                _ => Err(format!("'{raw}' is not a boolean")),
            }
        })
    }

    pub fn secret() -> Self {
        Self::new("secret", |raw| Ok(ParameterValue::Secret(SecretValue::new(raw))))
    }

    /// Built-in type by name, as written in declaration files.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "string" | "str" => Some(Self::string()),
            "integer" | "int" => Some(Self::integer()),
            "float" => Some(Self::float()),
            "boolean" | "bool" => Some(Self::boolean()),
            "secret" => Some(Self::secret()),
            _ => None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn convert(&self, raw: &str) -> std::result::Result<ParameterValue, String> {
        (self.convert)(raw)
    }
}

impl fmt::Debug for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ParameterType").field(&self.name).finish()
    }
}
