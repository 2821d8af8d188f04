//! Introspection rows for declared parameters and their sources

use serde::Serialize;
use tabled::Tabled;

use crate::source::SourceResult;

fn display_optional(option: &Option<String>) -> String {
    option.as_deref().unwrap_or("").to_string()
}

fn display_chain(sources: &[String]) -> String {
    sources.join(" | ")
}

fn display_errors(errors: &[String]) -> String {
    errors.join("; ")
}

/// Declared type and backing chain of one parameter
#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct ParameterInfo {
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Type")]
    #[serde(rename = "type")]
    pub type_name: String,
    #[tabled(rename = "Group", display_with = "display_optional")]
    pub group: Option<String>,
    #[tabled(rename = "Sources", display_with = "display_chain")]
    pub sources: Vec<String>,
}

/// Cache state of one source in a parameter's chain
#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct SourceStatus {
    #[tabled(rename = "Parameter")]
    pub parameter: String,
    #[tabled(rename = "Source")]
    pub source: String,
    #[tabled(rename = "State")]
    pub state: String,
    #[tabled(rename = "Cached")]
    pub cached: bool,
    #[tabled(rename = "Errors", display_with = "display_errors")]
    pub errors: Vec<String>,
}

impl SourceStatus {
    pub fn new(parameter: &str, source: String, result: &SourceResult) -> Self {
        Self {
            parameter: parameter.to_string(),
            source,
            state: result.state.to_string(),
            cached: result.data.is_some(),
            errors: result.errors.iter().map(ToString::to_string).collect(),
        }
    }
}
