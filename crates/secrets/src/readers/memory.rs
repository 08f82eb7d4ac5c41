//! In-memory secret reader

use crate::{SecretError, SecretMap, SecretReader, secret_map_from_json};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use tokio_util::sync::CancellationToken;

/// A recorded call to [`MemoryReader::read_secret`](SecretReader::read_secret)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadCall {
    /// Path that was read
    pub path: String,
    /// Version that was requested (`None` for latest)
    pub version: Option<String>,
}

/// Serves versioned secrets from memory.
///
/// Every secret path holds one or more numbered versions; reading without a
/// version returns the highest one. A reader built with
/// [`recording`](Self::recording) keeps every read for inspection with
/// [`calls`](Self::calls).
///
/// Secrets can be loaded from JSON. A path maps either directly to its
/// fields (stored as version 1) or to an object whose only key is
/// `versions`:
///
/// ```json
/// {
///   "app/db": { "user": "admin", "password": "vault://shared/db#password" },
///   "shared/db": { "versions": { "1": { "password": "old" }, "2": { "password": "new" } } }
/// }
/// ```
#[derive(Debug, Default)]
pub struct MemoryReader {
    secrets: HashMap<String, BTreeMap<u64, SecretMap>>,
    failures: HashMap<String, String>,
    record_calls: bool,
    calls: Mutex<Vec<ReadCall>>,
}

impl MemoryReader {
    /// Create an empty reader
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record every read from now on, see [`calls`](Self::calls).
    ///
    /// Off by default: a reference cycle followed until cancellation would
    /// otherwise grow the log without bound.
    #[must_use]
    pub fn recording(mut self) -> Self {
        self.record_calls = true;
        self
    }

    /// Store `data` as the next version of `path`, returning that version.
    pub fn insert(&mut self, path: impl Into<String>, data: SecretMap) -> u64 {
        let versions = self.secrets.entry(path.into()).or_default();
        let version = versions.keys().next_back().map_or(1, |last| last + 1);
        versions.insert(version, data);
        version
    }

    /// Store `data` as a specific version of `path`, replacing any existing one.
    pub fn insert_version(&mut self, path: impl Into<String>, version: u64, data: SecretMap) {
        self.secrets
            .entry(path.into())
            .or_default()
            .insert(version, data);
    }

    /// Make every read of `path` fail with a backend error.
    pub fn fail_on(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.failures.insert(path.into(), message.into());
    }

    /// Build a reader from a JSON document.
    ///
    /// # Errors
    ///
    /// Returns `SecretError::Configuration` if the document does not follow
    /// the layout described on [`MemoryReader`].
    pub fn from_json(document: &serde_json::Value) -> Result<Self, SecretError> {
        let entries = document
            .as_object()
            .ok_or_else(|| SecretError::configuration("secret fixtures must be a JSON object"))?;

        let mut reader = Self::new();
        for (path, entry) in entries {
            match entry.as_object() {
                Some(fields) if fields.len() == 1 && fields.contains_key("versions") => {
                    let versions = fields
                        .get("versions")
                        .and_then(serde_json::Value::as_object)
                        .ok_or_else(|| {
                            SecretError::configuration(format!(
                                "'versions' of secret '{path}' must be an object"
                            ))
                        })?;
                    for (version, data) in versions {
                        let number = version.parse::<u64>().map_err(|_| {
                            SecretError::configuration(format!(
                                "secret '{path}' has non-numeric version '{version}'"
                            ))
                        })?;
                        reader.insert_version(path.clone(), number, Self::payload(path, data)?);
                    }
                }
                Some(_) => {
                    reader.insert_version(path.clone(), 1, Self::payload(path, entry)?);
                }
                None => {
                    return Err(SecretError::configuration(format!(
                        "secret '{path}' must be a JSON object"
                    )));
                }
            }
        }
        Ok(reader)
    }

    /// Build a reader from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns `SecretError::Configuration` if the file cannot be read or
    /// parsed.
    pub fn from_file(path: &Path) -> Result<Self, SecretError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SecretError::configuration(format!("Failed to read {}: {e}", path.display()))
        })?;
        let document: serde_json::Value = serde_json::from_str(&content).map_err(|e| {
            SecretError::configuration(format!("Invalid JSON in {}: {e}", path.display()))
        })?;
        Self::from_json(&document)
    }

    fn payload(path: &str, data: &serde_json::Value) -> Result<SecretMap, SecretError> {
        secret_map_from_json(data.clone()).ok_or_else(|| {
            SecretError::configuration(format!("secret '{path}' must be a JSON object"))
        })
    }

    /// All reads recorded so far, in order.
    ///
    /// Always empty unless the reader was built with
    /// [`recording`](Self::recording).
    #[must_use]
    pub fn calls(&self) -> Vec<ReadCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of stored secret paths
    #[must_use]
    pub fn len(&self) -> usize {
        self.secrets.len()
    }

    /// Check if no secrets are stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.secrets.is_empty()
    }
}

#[async_trait]
impl SecretReader for MemoryReader {
    fn provider_name(&self) -> &'static str {
        "memory"
    }

    async fn read_secret(
        &self,
        _ctx: &CancellationToken,
        path: &str,
        version: Option<&str>,
    ) -> Result<SecretMap, SecretError> {
        if self.record_calls {
            self.calls
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(ReadCall {
                    path: path.to_string(),
                    version: version.map(str::to_string),
                });
        }

        if let Some(message) = self.failures.get(path) {
            return Err(SecretError::backend(path, message.clone()));
        }

        let versions = self
            .secrets
            .get(path)
            .ok_or_else(|| SecretError::not_found(path, version))?;

        let data = match version {
            None => versions.values().next_back(),
            Some(raw) => {
                let number = raw.parse::<u64>().map_err(|_| SecretError::InvalidVersion {
                    path: path.to_string(),
                    version: raw.to_string(),
                })?;
                versions.get(&number)
            }
        };

        data.cloned()
            .ok_or_else(|| SecretError::not_found(path, version))
    }
}
