//! CLI module for ccx
//!
//! Command definitions, argument parsing and command execution.

pub mod commands;

pub use commands::*;
