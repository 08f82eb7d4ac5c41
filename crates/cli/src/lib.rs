//! symvault command-line interface
//!
//! Reads secrets from HashiCorp Vault (or a JSON fixtures file) and resolves
//! the `vault://` symlinks they contain, printing the result as JSON.

pub mod cli;
pub mod commands;
pub mod config;
pub mod errors;
pub mod tracing;

pub use errors::CliError;
