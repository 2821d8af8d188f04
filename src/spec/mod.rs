//! Parameter schema and source definitions
//!
//! This module holds the declared parameter schema, the type factories
//! applied to raw values, source groups with their precedence composition,
//! and the loader for external declaration files.

pub mod group;
pub mod loader;
pub mod parameter;
pub mod types;

pub use group::{ComposedSourceSpec, SourceGroup};
pub use loader::{
    load_group, load_groups, load_groups_from_env, parse_declaration_file, ParameterDeclaration,
    SourceArgs, SourceDefinition, SourceRegistry,
};
pub use parameter::{ParameterDef, ParameterSpec, ParameterSpecBuilder};
pub use types::{ParameterType, ParameterValue, SecretValue};
