use thiserror::Error;

/// Main error type for config-composer operations
#[derive(Debug, Error)]
pub enum ComposerError {
    #[error("Parameter error: {name}: {details}")]
    ParameterError { name: String, details: String },

    #[error("Cannot convert value of parameter '{name}' to {type_name}: {details}")]
    ConversionError {
        name: String,
        type_name: String,
        details: String,
    },

    #[error("Parameters resolved to nothing: {}", names.join(", "))]
    PreloadError { names: Vec<String> },

    #[error("Schema error: {0}")]
    SchemaError(String),

    #[error("Declaration error: {0}")]
    DeclarationError(String),

    #[error("Unknown source kind: {kind}")]
    UnknownSourceKind { kind: String },

    #[error("Missing argument '{argument}' for source {kind}")]
    MissingArgument { kind: String, argument: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Regex error: {0}")]
    RegexError(#[from] regex::Error),

    #[error("INI error: {0}")]
    IniError(#[from] ini::ParseError),
}

impl ComposerError {
    pub fn parameter<S: Into<String>, D: Into<String>>(name: S, details: D) -> Self {
        Self::ParameterError {
            name: name.into(),
            details: details.into(),
        }
    }

    pub fn conversion<S: Into<String>>(name: S, type_name: S, details: S) -> Self {
        Self::ConversionError {
            name: name.into(),
            type_name: type_name.into(),
            details: details.into(),
        }
    }

    pub fn schema<S: Into<String>>(msg: S) -> Self {
        Self::SchemaError(msg.into())
    }

    pub fn declaration<S: Into<String>>(msg: S) -> Self {
        Self::DeclarationError(msg.into())
    }

    pub fn unknown_source_kind<S: Into<String>>(kind: S) -> Self {
        Self::UnknownSourceKind { kind: kind.into() }
    }

    pub fn missing_argument<S: Into<String>>(kind: S, argument: S) -> Self {
        Self::MissingArgument {
            kind: kind.into(),
            argument: argument.into(),
        }
    }

    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// True for the undeclared/unresolvable parameter condition.
    pub fn is_parameter_error(&self) -> bool {
        matches!(self, Self::ParameterError { .. })
    }
}

/// Result type alias for config-composer operations
pub type Result<T> = std::result::Result<T, ComposerError>;

/// Failure inside a single fetch operation.
///
/// These never cross the descriptor boundary as a raised error. They are
/// recorded in [`SourceResult::errors`](crate::source::SourceResult) and the
/// fetch state machine decides what to serve.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceFetchError {
    #[error("Failed to read '{path}': {details}")]
    Read { path: String, details: String },

    #[error("Malformed document '{path}': {details}")]
    Malformed { path: String, details: String },

    #[error("Source unavailable: {0}")]
    Unavailable(String),
}

impl SourceFetchError {
    pub fn read<S: Into<String>>(path: S, details: S) -> Self {
        Self::Read {
            path: path.into(),
            details: details.into(),
        }
    }

    pub fn malformed<S: Into<String>>(path: S, details: S) -> Self {
        Self::Malformed {
            path: path.into(),
            details: details.into(),
        }
    }

    pub fn unavailable<S: Into<String>>(msg: S) -> Self {
        Self::Unavailable(msg.into())
    }
}
