//! Vault connection settings

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use symvault_secrets::SecretError;

/// Default Vault address used when `VAULT_ADDR` is not set
pub const DEFAULT_ADDRESS: &str = "http://127.0.0.1:8200";

/// KV secrets engine version
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KvVersion {
    /// Unversioned key/value store
    V1,
    /// Versioned key/value store
    #[default]
    V2,
}

impl std::str::FromStr for KvVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "1" | "v1" => Ok(Self::V1),
            "2" | "v2" => Ok(Self::V2),
            _ => Err(format!("Unknown KV version: {s} (expected v1 or v2)")),
        }
    }
}

impl std::fmt::Display for KvVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::V1 => f.write_str("KV v1"),
            Self::V2 => f.write_str("KV v2"),
        }
    }
}

/// Configuration for reading secrets from `HashiCorp` Vault
///
/// The token is never read from or written to configuration files; it comes
/// from `VAULT_TOKEN` or is set explicitly with [`with_token`](Self::with_token).
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultConfig {
    /// Vault server address
    #[serde(default = "default_address")]
    pub address: String,

    /// Authentication token
    #[serde(skip)]
    pub token: Option<SecretString>,

    /// Secret engine mount point (defaults to "secret")
    #[serde(default = "default_mount")]
    pub mount: String,

    /// KV engine version (defaults to v2)
    #[serde(default)]
    pub kv_version: KvVersion,
}

fn default_address() -> String {
    DEFAULT_ADDRESS.to_string()
}

fn default_mount() -> String {
    "secret".to_string()
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            token: None,
            mount: default_mount(),
            kv_version: KvVersion::default(),
        }
    }
}

impl std::fmt::Debug for VaultConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultConfig")
            .field("address", &self.address)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("mount", &self.mount)
            .field("kv_version", &self.kv_version)
            .finish()
    }
}

impl VaultConfig {
    /// Create a config for the given address with default mount and KV v2
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Self::default()
        }
    }

    /// Build a config from `VAULT_ADDR` and `VAULT_TOKEN`
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Override address and token with `VAULT_ADDR` / `VAULT_TOKEN` when set
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(address) = std::env::var("VAULT_ADDR") {
            self.address = address;
        }
        if let Ok(token) = std::env::var("VAULT_TOKEN") {
            self.token = Some(SecretString::from(token));
        }
        self
    }

    /// Set the authentication token
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(SecretString::from(token.into()));
        self
    }

    /// Set the mount point
    #[must_use]
    pub fn with_mount(mut self, mount: impl Into<String>) -> Self {
        self.mount = mount.into();
        self
    }

    /// Set the KV engine version
    #[must_use]
    pub const fn with_kv_version(mut self, kv_version: KvVersion) -> Self {
        self.kv_version = kv_version;
        self
    }

    /// Exposed token, if one is configured and non-empty
    pub(crate) fn token(&self) -> Option<&str> {
        self.token
            .as_ref()
            .map(|t| t.expose_secret())
            .filter(|t| !t.is_empty())
    }

    /// Check the config is usable.
    ///
    /// # Errors
    ///
    /// Returns `SecretError::Configuration` for an empty address or mount.
    pub fn validate(&self) -> Result<(), SecretError> {
        if self.address.trim().is_empty() {
            return Err(SecretError::configuration("Vault address must not be empty"));
        }
        if self.mount.trim_matches('/').is_empty() {
            return Err(SecretError::configuration("Vault mount must not be empty"));
        }
        Ok(())
    }

    /// Mount point without surrounding slashes
    #[must_use]
    pub fn mount(&self) -> &str {
        self.mount.trim_matches('/')
    }

    /// Path of a secret relative to the mount.
    ///
    /// Accepts paths with a leading `/`, with the mount prefix, and for KV v2
    /// with the `<mount>/data/` API prefix.
    #[must_use]
    pub fn relative_path<'a>(&self, path: &'a str) -> &'a str {
        let path = path.trim_start_matches('/');
        let Some(rest) = path
            .strip_prefix(self.mount())
            .and_then(|rest| rest.strip_prefix('/'))
        else {
            return path;
        };
        match self.kv_version {
            KvVersion::V2 => rest.strip_prefix("data/").unwrap_or(rest),
            KvVersion::V1 => rest,
        }
    }

    /// Full API path of a secret, for display
    #[must_use]
    pub fn full_path(&self, path: &str) -> String {
        let relative = self.relative_path(path);
        match self.kv_version {
            // KV v2 uses /data/ in the path
            KvVersion::V2 => format!("{}/data/{relative}", self.mount()),
            KvVersion::V1 => format!("{}/{relative}", self.mount()),
        }
    }
}
