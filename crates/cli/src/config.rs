//! Layered settings: config file, then environment, then command-line flags

use crate::cli::GlobalArgs;
use crate::errors::CliError;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use symvault_secrets::ResolverConfig;
use symvault_vault::VaultConfig;

/// Settings for one CLI invocation
///
/// Config files are TOML:
///
/// ```toml
/// timeoutSecs = 30
///
/// [vault]
/// address = "https://vault.example.com:8200"
/// mount = "secret"
/// kvVersion = "v2"
///
/// [resolver]
/// maxDepth = 32
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Settings {
    /// Vault connection
    #[serde(default)]
    pub vault: VaultConfig,

    /// Symlink resolution
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// Cancel resolution after this many seconds
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Settings {
    /// Parse settings from TOML text
    ///
    /// # Errors
    ///
    /// Returns `CliError::Config` if the TOML is invalid.
    pub fn from_toml(content: &str) -> Result<Self, CliError> {
        toml::from_str(content).map_err(|e| CliError::config(format!("Invalid config: {e}")))
    }

    /// Load settings from a TOML file
    ///
    /// # Errors
    ///
    /// Returns `CliError::Config` if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, CliError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CliError::config(format!("Failed to read {}: {e}", path.display()))
        })?;
        toml::from_str(&content).map_err(|e| {
            CliError::config(format!("Invalid config in {}: {e}", path.display()))
        })
    }

    /// Build the effective settings for this invocation.
    ///
    /// Command-line flags win over environment variables (clap reads
    /// `VAULT_ADDR` / `VAULT_TOKEN` into the flags), which win over the
    /// config file, which wins over built-in defaults.
    ///
    /// # Errors
    ///
    /// Returns `CliError::Config` if the config file cannot be loaded.
    pub fn resolve(args: &GlobalArgs) -> Result<Self, CliError> {
        let mut settings = match &args.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        settings.apply_args(args);
        Ok(settings)
    }

    fn apply_args(&mut self, args: &GlobalArgs) {
        if let Some(address) = &args.vault_addr {
            self.vault.address.clone_from(address);
        }
        if let Some(token) = &args.vault_token {
            self.vault = std::mem::take(&mut self.vault).with_token(token.clone());
        }
        if let Some(mount) = &args.mount {
            self.vault.mount.clone_from(mount);
        }
        if let Some(kv_version) = args.kv_version {
            self.vault.kv_version = kv_version;
        }
        if args.max_depth.is_some() {
            self.resolver.max_depth = args.max_depth;
        }
        if args.timeout.is_some() {
            self.timeout_secs = args.timeout;
        }
    }

    /// Timeout as a duration, if configured
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}
