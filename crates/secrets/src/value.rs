//! Field values carried by secret payloads
//!
//! Backends hand back loosely-typed JSON documents. [`SecretValue`] narrows
//! that down to the scalar kinds a secret field can hold, with a
//! `Structured` escape hatch for nested data that is passed through as-is.

use crate::reference::REFERENCE_PREFIX;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Flat mapping of field names to values, as stored in a single secret.
pub type SecretMap = BTreeMap<String, SecretValue>;

/// A single field value inside a secret payload.
#[derive(Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum SecretValue {
    /// No value. Also used when a referenced field does not exist.
    #[default]
    Null,
    /// Boolean field
    Bool(bool),
    /// Numeric field
    Number(serde_json::Number),
    /// String field, possibly a `vault://` reference
    String(String),
    /// Arrays and objects. Never scanned for references.
    Structured(serde_json::Value),
}

impl SecretValue {
    /// Returns `true` if this is a string starting with `vault://`.
    ///
    /// Only the prefix is checked; whether the rest of the string decodes
    /// is decided by [`Reference::decode`](crate::Reference::decode).
    #[must_use]
    pub fn is_reference(&self) -> bool {
        matches!(self, Self::String(s) if s.starts_with(REFERENCE_PREFIX))
    }

    /// Borrow the string content, if this is a string value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns `true` for [`SecretValue::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Short name of the variant, for log fields.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Structured(_) => "structured",
        }
    }
}

impl std::fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => f.write_str("Null"),
            Self::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Self::Number(n) => f.debug_tuple("Number").field(n).finish(),
            // References are pointers, not secret material
            Self::String(s) if s.starts_with(REFERENCE_PREFIX) => {
                f.debug_tuple("String").field(s).finish()
            }
            Self::String(s) => write!(f, "String(<redacted {} bytes>)", s.len()),
            Self::Structured(_) => f.write_str("Structured(<redacted>)"),
        }
    }
}

impl From<serde_json::Value> for SecretValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => Self::Number(n),
            serde_json::Value::String(s) => Self::String(s),
            other => Self::Structured(other),
        }
    }
}

impl From<SecretValue> for serde_json::Value {
    fn from(value: SecretValue) -> Self {
        match value {
            SecretValue::Null => Self::Null,
            SecretValue::Bool(b) => Self::Bool(b),
            SecretValue::Number(n) => Self::Number(n),
            SecretValue::String(s) => Self::String(s),
            SecretValue::Structured(v) => v,
        }
    }
}

impl From<&str> for SecretValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for SecretValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for SecretValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for SecretValue {
    fn from(value: i64) -> Self {
        Self::Number(value.into())
    }
}

/// Convert a JSON object into a [`SecretMap`].
///
/// Returns `None` when `value` is not an object.
#[must_use]
pub fn secret_map_from_json(value: serde_json::Value) -> Option<SecretMap> {
    match value {
        serde_json::Value::Object(fields) => Some(
            fields
                .into_iter()
                .map(|(k, v)| (k, SecretValue::from(v)))
                .collect(),
        ),
        _ => None,
    }
}
