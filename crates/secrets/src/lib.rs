//! Secret payloads and `vault://` symlink resolution for symvault
//!
//! A field of a secret can point at a field of another secret using a
//! `vault://<path>#<secret>[@<version>]` reference. This crate provides the
//! value model for secret payloads, the reference parser, and the
//! [`SymlinkResolver`] which follows references through a [`SecretReader`]
//! until every field holds a concrete value.
//!
//! ```ignore
//! use symvault_secrets::{MemoryReader, SymlinkResolver, ResolverConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! let resolver = SymlinkResolver::new(&reader, ResolverConfig::default());
//! let resolved = resolver.resolve_all(&CancellationToken::new(), data).await?;
//! ```
//!
//! Backend implementations live in separate crates:
//! - symvault-vault: `VaultReader`, `VaultConfig`

mod reference;
pub mod readers;
mod resolver;
mod value;

pub use reference::{REFERENCE_PREFIX, Reference, is_reference};
pub use readers::MemoryReader;
pub use resolver::{ResolverConfig, SymlinkResolver};
pub use value::{SecretMap, SecretValue, secret_map_from_json};

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Error types for secret reads and symlink resolution
#[derive(Debug, Error)]
pub enum SecretError {
    /// Secret (or the requested version of it) does not exist
    #[error("Secret '{path}' not found{}", version_suffix(.version.as_deref()))]
    NotFound {
        /// Path that was read
        path: String,
        /// Requested version, if any
        version: Option<String>,
    },

    /// Backend rejected or failed the read
    #[error("Failed to read secret '{path}': {message}")]
    Backend {
        /// Path that was read
        path: String,
        /// Error message from the backend
        message: String,
    },

    /// Backend returned something that is not a flat secret payload
    #[error("Secret '{path}' has an invalid payload: {message}")]
    InvalidPayload {
        /// Path that was read
        path: String,
        /// What was wrong with the payload
        message: String,
    },

    /// Version is not a non-negative integer
    #[error("Invalid version '{version}' for secret '{path}'")]
    InvalidVersion {
        /// Path that was read
        path: String,
        /// The version as written
        version: String,
    },

    /// Backend has no notion of versions (e.g. Vault KV v1)
    #[error("Secret '{path}' cannot be read at version '{version}': {backend} is not versioned")]
    VersionUnsupported {
        /// Path that was read
        path: String,
        /// The requested version
        version: String,
        /// Backend description
        backend: String,
    },

    /// Reference chain exceeded the configured maximum depth
    #[error("Reference chain for field '{key}' is too deep (more than {depth} hops)")]
    ChainTooDeep {
        /// Field being resolved
        key: String,
        /// Configured maximum depth
        depth: usize,
    },

    /// Resolution was cancelled by the caller
    #[error("Secret resolution was cancelled")]
    Cancelled,

    /// Reader could not be set up
    #[error("Configuration error: {message}")]
    Configuration {
        /// Error message describing the configuration problem
        message: String,
    },
}

fn version_suffix(version: Option<&str>) -> String {
    version.map(|v| format!(" at version {v}")).unwrap_or_default()
}

impl SecretError {
    /// Create a backend error
    #[must_use]
    pub fn backend(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Backend {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a not-found error
    #[must_use]
    pub fn not_found(path: impl Into<String>, version: Option<&str>) -> Self {
        Self::NotFound {
            path: path.into(),
            version: version.map(str::to_string),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

/// Reads whole secrets from a storage backend.
///
/// This is the only operation symlink resolution needs from a backend.
/// Implementors decide how authentication, transport and retries work.
#[async_trait]
pub trait SecretReader: Send + Sync {
    /// Read the secret at `path`.
    ///
    /// `version` is `None` for the latest version. The cancellation token is
    /// shared by every read of one resolution; implementations with
    /// long-running I/O should stop when it fires.
    async fn read_secret(
        &self,
        ctx: &CancellationToken,
        path: &str,
        version: Option<&str>,
    ) -> Result<SecretMap, SecretError>;

    /// Get the provider name for this reader.
    ///
    /// Examples: `"memory"`, `"vault"`
    fn provider_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_error_not_found() {
        let err = SecretError::not_found("app/db", None);
        assert_eq!(err.to_string(), "Secret 'app/db' not found");

        let err = SecretError::not_found("app/db", Some("3"));
        assert_eq!(err.to_string(), "Secret 'app/db' not found at version 3");
    }

    #[test]
    fn test_secret_error_backend() {
        let err = SecretError::backend("app/db", "permission denied");
        let msg = err.to_string();
        assert!(msg.contains("app/db"));
        assert!(msg.contains("permission denied"));
    }

    #[test]
    fn test_secret_error_chain_too_deep() {
        let err = SecretError::ChainTooDeep {
            key: "token".to_string(),
            depth: 8,
        };
        let msg = err.to_string();
        assert!(msg.contains("token"));
        assert!(msg.contains("8 hops"));
    }

    #[test]
    fn test_secret_error_version_unsupported() {
        let err = SecretError::VersionUnsupported {
            path: "legacy".to_string(),
            version: "2".to_string(),
            backend: "KV v1".to_string(),
        };
        assert!(err.to_string().contains("KV v1 is not versioned"));
    }

    #[test]
    fn test_secret_error_debug() {
        let debug = format!("{:?}", SecretError::Cancelled);
        assert!(debug.contains("Cancelled"));
    }
}
