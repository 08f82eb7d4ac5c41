//! Transitive resolution of `vault://` references
//!
//! Each field is followed hop by hop: decode the reference, read the target
//! secret, take the named field, repeat until the value is no longer a
//! reference. The first failing read aborts the whole resolution.
//!
//! There is no cycle detection. A chain that loops back on itself is
//! followed until the caller cancels the token or, when configured,
//! [`ResolverConfig::max_depth`] is reached.

use crate::{Reference, SecretError, SecretMap, SecretReader, SecretValue};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// Configuration for symlink resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolverConfig {
    /// Maximum number of reads performed for a single field.
    ///
    /// `None` follows chains without limit.
    #[serde(default)]
    pub max_depth: Option<usize>,
}

impl ResolverConfig {
    /// Create a config that fails chains longer than `max_depth` hops
    #[must_use]
    pub const fn with_max_depth(max_depth: usize) -> Self {
        Self {
            max_depth: Some(max_depth),
        }
    }
}

/// Resolves references in secret payloads through a [`SecretReader`].
///
/// # Example
///
/// ```ignore
/// use symvault_secrets::{ResolverConfig, SymlinkResolver};
///
/// let resolver = SymlinkResolver::new(&reader, ResolverConfig::default());
/// let data = resolver.resolve_all(&ctx, data).await?;
/// assert!(data.values().all(|v| !v.is_reference()));
/// ```
pub struct SymlinkResolver<'a> {
    reader: &'a dyn SecretReader,
    config: ResolverConfig,
}

impl std::fmt::Debug for SymlinkResolver<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymlinkResolver")
            .field("provider", &self.reader.provider_name())
            .field("config", &self.config)
            .finish()
    }
}

impl<'a> SymlinkResolver<'a> {
    /// Create a resolver reading referenced secrets from `reader`.
    #[must_use]
    pub fn new(reader: &'a dyn SecretReader, config: ResolverConfig) -> Self {
        Self { reader, config }
    }

    /// Get the resolver configuration
    #[must_use]
    pub const fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolve every reference in `data`.
    ///
    /// Fields are resolved one at a time. Fields that are not references are
    /// returned untouched without any read. A referenced field missing from
    /// the target secret resolves to [`SecretValue::Null`].
    ///
    /// # Errors
    ///
    /// Returns the first error from the reader unchanged, and `data` is
    /// dropped. Also fails on cancellation and when a chain exceeds
    /// [`ResolverConfig::max_depth`].
    ///
    /// A prefixed value that does not decode is read as path `""`, field
    /// `""`, latest version, like any other reference.
    pub async fn resolve_all(
        &self,
        ctx: &CancellationToken,
        mut data: SecretMap,
    ) -> Result<SecretMap, SecretError> {
        // Only values are replaced; the key set is fixed for the whole pass
        for (key, value) in &mut data {
            if !value.is_reference() {
                continue;
            }
            let current = std::mem::take(value);
            *value = self.resolve_value(ctx, key, current).await?;
        }

        tracing::debug!(
            provider = self.reader.provider_name(),
            fields = data.len(),
            "Resolved secret references"
        );
        Ok(data)
    }

    /// Resolve a single value, following references until a concrete value
    /// is reached. `key` only labels log lines and errors.
    ///
    /// # Errors
    ///
    /// Same conditions as [`resolve_all`](Self::resolve_all).
    pub async fn resolve_value(
        &self,
        ctx: &CancellationToken,
        key: &str,
        mut value: SecretValue,
    ) -> Result<SecretValue, SecretError> {
        let mut hops = 0usize;

        while value.is_reference() {
            let raw = value.as_str().unwrap_or_default();
            let reference = Reference::decode(raw).unwrap_or_else(|| {
                tracing::debug!(
                    field = key,
                    "Reference does not match the grammar, reading the empty path"
                );
                Reference::default()
            });

            if let Some(max_depth) = self.config.max_depth.filter(|max| hops >= *max) {
                tracing::warn!(
                    field = key,
                    max_depth,
                    reference = %reference,
                    "Giving up on reference chain"
                );
                return Err(SecretError::ChainTooDeep {
                    key: key.to_string(),
                    depth: max_depth,
                });
            }

            value = self.follow(ctx, key, &reference).await?;
            hops += 1;
        }

        if hops > 0 {
            tracing::debug!(field = key, hops, kind = value.kind(), "Resolved field");
        }
        Ok(value)
    }

    /// Perform one hop: read the referenced secret and take the named field.
    async fn follow(
        &self,
        ctx: &CancellationToken,
        key: &str,
        reference: &Reference,
    ) -> Result<SecretValue, SecretError> {
        if ctx.is_cancelled() {
            return Err(SecretError::Cancelled);
        }

        tracing::debug!(
            field = key,
            path = reference.path(),
            secret = reference.secret(),
            version = ?reference.requested_version(),
            "Following secret reference"
        );

        let read = self
            .reader
            .read_secret(ctx, reference.path(), reference.requested_version());
        let mut payload = tokio::select! {
            biased;
            () = ctx.cancelled() => {
                tracing::warn!(field = key, "Secret resolution cancelled");
                return Err(SecretError::Cancelled);
            }
            result = read => result?,
        };

        Ok(payload.remove(reference.secret()).unwrap_or_else(|| {
            tracing::debug!(
                field = key,
                path = reference.path(),
                secret = reference.secret(),
                "Referenced field is absent"
            );
            SecretValue::Null
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryReader;
    use crate::readers::ReadCall;
    use serde_json::json;

    fn reader() -> MemoryReader {
        MemoryReader::from_json(&json!({
            "p1": {"f1": "vault://p2#f2"},
            "p2": {"f2": "done"},
            "loop": {"next": "vault://loop#next"},
        }))
        .unwrap()
        .recording()
    }

    fn data(entries: &[(&str, SecretValue)]) -> SecretMap {
        entries
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[tokio::test]
    async fn test_resolve_value_passthrough() {
        let reader = reader();
        let resolver = SymlinkResolver::new(&reader, ResolverConfig::default());
        let ctx = CancellationToken::new();

        let value = resolver
            .resolve_value(&ctx, "k", SecretValue::from("plain"))
            .await
            .unwrap();
        assert_eq!(value, SecretValue::from("plain"));
        assert!(reader.calls().is_empty());
    }

    #[tokio::test]
    async fn test_resolve_value_follows_chain() {
        let reader = reader();
        let resolver = SymlinkResolver::new(&reader, ResolverConfig::default());
        let ctx = CancellationToken::new();

        let value = resolver
            .resolve_value(&ctx, "k", SecretValue::from("vault://p1#f1"))
            .await
            .unwrap();
        assert_eq!(value, SecretValue::from("done"));
        assert_eq!(reader.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_max_depth_stops_cycles() {
        let reader = reader();
        let resolver = SymlinkResolver::new(&reader, ResolverConfig::with_max_depth(5));
        let ctx = CancellationToken::new();

        let result = resolver
            .resolve_all(&ctx, data(&[("k", SecretValue::from("vault://loop#next"))]))
            .await;
        assert!(matches!(
            result,
            Err(SecretError::ChainTooDeep { ref key, depth: 5 }) if key == "k"
        ));
        assert_eq!(reader.calls().len(), 5);
    }

    #[tokio::test]
    async fn test_max_depth_allows_chain_at_limit() {
        let reader = reader();
        let resolver = SymlinkResolver::new(&reader, ResolverConfig::with_max_depth(2));
        let ctx = CancellationToken::new();

        let resolved = resolver
            .resolve_all(&ctx, data(&[("k", SecretValue::from("vault://p1#f1"))]))
            .await
            .unwrap();
        assert_eq!(resolved["k"], SecretValue::from("done"));
    }

    #[tokio::test]
    async fn test_zero_depth_rejects_any_reference() {
        let reader = reader();
        let resolver = SymlinkResolver::new(&reader, ResolverConfig::with_max_depth(0));
        let ctx = CancellationToken::new();

        let result = resolver
            .resolve_value(&ctx, "k", SecretValue::from("vault://p2#f2"))
            .await;
        assert!(matches!(result, Err(SecretError::ChainTooDeep { .. })));
        assert!(reader.calls().is_empty());
    }

    #[tokio::test]
    async fn test_undecodable_reference_reads_empty_path() {
        let reader = MemoryReader::from_json(&json!({"": {"": "resolved"}}))
            .unwrap()
            .recording();
        let resolver = SymlinkResolver::new(&reader, ResolverConfig::default());
        let ctx = CancellationToken::new();

        let resolved = resolver
            .resolve_all(&ctx, data(&[("k", SecretValue::from("vault://test"))]))
            .await
            .unwrap();
        assert_eq!(resolved["k"], SecretValue::from("resolved"));
        assert_eq!(
            reader.calls(),
            vec![ReadCall {
                path: String::new(),
                version: None,
            }]
        );
    }

    #[tokio::test]
    async fn test_undecodable_reference_propagates_read_error() {
        let reader = reader();
        let resolver = SymlinkResolver::new(&reader, ResolverConfig::default());
        let ctx = CancellationToken::new();

        let result = resolver
            .resolve_value(&ctx, "k", SecretValue::from("vault://p2"))
            .await;
        assert!(matches!(
            result,
            Err(SecretError::NotFound { ref path, version: None }) if path.is_empty()
        ));
        assert_eq!(reader.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_before_first_read() {
        let reader = reader();
        let resolver = SymlinkResolver::new(&reader, ResolverConfig::default());
        let ctx = CancellationToken::new();
        ctx.cancel();

        let result = resolver
            .resolve_all(&ctx, data(&[("k", SecretValue::from("vault://p1#f1"))]))
            .await;
        assert!(matches!(result, Err(SecretError::Cancelled)));
        assert!(reader.calls().is_empty());
    }

    #[test]
    fn test_config_deserialization() {
        let config: ResolverConfig = serde_json::from_str(r#"{"maxDepth": 16}"#).unwrap();
        assert_eq!(config, ResolverConfig::with_max_depth(16));

        let config: ResolverConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.max_depth, None);
    }

    #[test]
    fn test_resolver_debug() {
        let reader = reader();
        let resolver = SymlinkResolver::new(&reader, ResolverConfig::default());
        let debug = format!("{resolver:?}");
        assert!(debug.contains("SymlinkResolver"));
        assert!(debug.contains("memory"));
    }
}
