//! Command implementations for the MyST CLI
//!
//! Each command module handles the CLI interface and delegates to
//! myst-core and myst-writers for the actual work.

pub mod build;
pub mod migrate;
