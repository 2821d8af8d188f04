//! Utility functions module
//!
//! Output formatting shared by the command-line interface.

pub mod format;

pub use format::*;
