//! Configuration resolution module
//!
//! Binds a parameter schema to composed source groups and resolves typed
//! values on demand.

pub mod info;
pub mod resolver;

pub use info::*;
pub use resolver::*;
