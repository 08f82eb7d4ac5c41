//! `HashiCorp` Vault secret reader with auto-negotiating dual-mode (HTTP + CLI)

use crate::config::{KvVersion, VaultConfig};
use async_trait::async_trait;
use symvault_secrets::{SecretError, SecretMap, SecretReader, secret_map_from_json};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use vaultrs::client::{VaultClient, VaultClientSettingsBuilder};
use vaultrs::error::ClientError;

/// Reads whole secrets from `HashiCorp` Vault
///
/// Mode is auto-negotiated based on configuration:
/// - If a token is configured (usually via `VAULT_TOKEN`) → HTTP mode
/// - Otherwise → CLI mode (uses the `vault` CLI and its own login state)
pub struct VaultReader {
    config: VaultConfig,
    client: Option<VaultClient>,
}

impl std::fmt::Debug for VaultReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultReader")
            .field("mode", &if self.can_use_http() { "http" } else { "cli" })
            .field("config", &self.config)
            .finish()
    }
}

impl VaultReader {
    /// Create a new Vault reader with auto-detected mode
    ///
    /// # Errors
    ///
    /// Returns an error if the config is invalid or the Vault HTTP client
    /// cannot be initialized.
    pub fn new(config: VaultConfig) -> Result<Self, SecretError> {
        config.validate()?;

        let client = match config.token() {
            Some(token) => Some(
                VaultClient::new(
                    VaultClientSettingsBuilder::default()
                        .address(config.address.clone())
                        .token(token.to_string())
                        .build()
                        .map_err(|e| {
                            SecretError::configuration(format!(
                                "Failed to build Vault client: {e}"
                            ))
                        })?,
                )
                .map_err(|e| {
                    SecretError::configuration(format!("Failed to create Vault client: {e}"))
                })?,
            ),
            None => None,
        };

        tracing::debug!(
            address = %config.address,
            mount = config.mount(),
            kv_version = %config.kv_version,
            mode = if client.is_some() { "http" } else { "cli" },
            "Vault reader initialized"
        );

        Ok(Self { config, client })
    }

    /// Create a reader configured from `VAULT_ADDR` and `VAULT_TOKEN`
    ///
    /// # Errors
    ///
    /// Returns an error if the Vault HTTP client cannot be initialized.
    pub fn from_env() -> Result<Self, SecretError> {
        Self::new(VaultConfig::from_env())
    }

    /// Get the reader configuration
    #[must_use]
    pub const fn config(&self) -> &VaultConfig {
        &self.config
    }

    /// Check if this reader uses HTTP mode
    #[must_use]
    pub const fn can_use_http(&self) -> bool {
        self.client.is_some()
    }

    /// Parse a requested version for this engine
    fn parse_version(&self, path: &str, version: Option<&str>) -> Result<Option<u64>, SecretError> {
        let Some(raw) = version else {
            return Ok(None);
        };
        if self.config.kv_version == KvVersion::V1 {
            return Err(SecretError::VersionUnsupported {
                path: path.to_string(),
                version: raw.to_string(),
                backend: self.config.kv_version.to_string(),
            });
        }
        raw.parse::<u64>()
            .map(Some)
            .map_err(|_| SecretError::InvalidVersion {
                path: path.to_string(),
                version: raw.to_string(),
            })
    }

    /// Read using the Vault HTTP API
    async fn read_http(
        &self,
        client: &VaultClient,
        path: &str,
        version: Option<u64>,
    ) -> Result<SecretMap, SecretError> {
        let mount = self.config.mount();
        let relative = self.config.relative_path(path);

        let result = match (self.config.kv_version, version) {
            (KvVersion::V2, Some(version)) => {
                vaultrs::kv2::read_version::<SecretMap>(client, mount, relative, version).await
            }
            (KvVersion::V2, None) => vaultrs::kv2::read::<SecretMap>(client, mount, relative).await,
            (KvVersion::V1, _) => vaultrs::kv1::get::<SecretMap>(client, mount, relative).await,
        };

        result.map_err(|e| map_client_error(path, version, e))
    }

    /// Read using the vault CLI
    async fn read_cli(
        &self,
        ctx: &CancellationToken,
        path: &str,
        version: Option<u64>,
    ) -> Result<SecretMap, SecretError> {
        let mut args = vec![
            "kv".to_string(),
            "get".to_string(),
            "-format=json".to_string(),
            format!("-mount={}", self.config.mount()),
        ];
        if let Some(version) = version {
            args.push(format!("-version={version}"));
        }
        args.push(self.config.relative_path(path).to_string());

        let mut command = Command::new("vault");
        command
            .args(&args)
            .env("VAULT_ADDR", &self.config.address)
            .kill_on_drop(true);

        let output = tokio::select! {
            () = ctx.cancelled() => return Err(SecretError::Cancelled),
            output = command.output() => output.map_err(|e| {
                SecretError::backend(path, format!("Failed to execute vault CLI: {e}"))
            })?,
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.contains("No value found") {
                return Err(SecretError::not_found(
                    path,
                    version.map(|v| v.to_string()).as_deref(),
                ));
            }
            return Err(SecretError::backend(
                path,
                format!("vault CLI failed: {}", stderr.trim()),
            ));
        }

        extract_cli_payload(path, self.config.kv_version, &output.stdout)
    }
}

/// Map a `vaultrs` error onto the secret error taxonomy
fn map_client_error(path: &str, version: Option<u64>, error: ClientError) -> SecretError {
    match error {
        ClientError::APIError { code: 404, .. } => {
            SecretError::not_found(path, version.map(|v| v.to_string()).as_deref())
        }
        other => SecretError::backend(path, format!("Vault read error: {other}")),
    }
}

/// Pull the secret fields out of `vault kv get -format=json` output.
///
/// KV v2 nests the fields under `data.data`, KV v1 directly under `data`.
fn extract_cli_payload(
    path: &str,
    kv_version: KvVersion,
    stdout: &[u8],
) -> Result<SecretMap, SecretError> {
    let document: serde_json::Value =
        serde_json::from_slice(stdout).map_err(|e| SecretError::InvalidPayload {
            path: path.to_string(),
            message: format!("vault CLI returned invalid JSON: {e}"),
        })?;

    let data = match kv_version {
        KvVersion::V2 => document.get("data").and_then(|d| d.get("data")),
        KvVersion::V1 => document.get("data"),
    };

    match data {
        // A deleted or destroyed KV v2 version reports null data
        Some(serde_json::Value::Null) | None => Err(SecretError::not_found(path, None)),
        Some(data) => secret_map_from_json(data.clone()).ok_or_else(|| {
            SecretError::InvalidPayload {
                path: path.to_string(),
                message: "secret data is not an object".to_string(),
            }
        }),
    }
}

#[async_trait]
impl SecretReader for VaultReader {
    fn provider_name(&self) -> &'static str {
        "vault"
    }

    async fn read_secret(
        &self,
        ctx: &CancellationToken,
        path: &str,
        version: Option<&str>,
    ) -> Result<SecretMap, SecretError> {
        let version = self.parse_version(path, version)?;

        tracing::debug!(
            path = %self.config.full_path(path),
            version = ?version,
            mode = if self.can_use_http() { "http" } else { "cli" },
            "Reading secret from Vault"
        );

        // Try HTTP mode if available
        if let Some(client) = &self.client {
            return self.read_http(client, path, version).await;
        }

        // Fallback to CLI
        self.read_cli(ctx, path, version).await
    }
}
