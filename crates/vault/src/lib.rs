//! `HashiCorp` Vault integration for symvault
//!
//! This crate provides a [`SecretReader`](symvault_secrets::SecretReader)
//! backed by `HashiCorp` Vault. Currently supports:
//! - KV v2 secrets, including reads of a specific version
//! - KV v1 secrets (unversioned)
//!
//! Configuration lives in the [`config`] module, the reader in [`secrets`].

pub mod config;
pub mod secrets;

// Re-export main types for convenience
pub use config::{KvVersion, VaultConfig};
pub use secrets::VaultReader;
