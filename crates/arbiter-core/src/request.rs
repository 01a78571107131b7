//! Request data model and structural validation.
//!
//! A [`Request`] is assembled by the caller immediately before submission
//! and is immutable thereafter. Data fields are an open mapping from field
//! name to a [`FieldValue`], interpreted per [`RequestKind`]. The data map
//! is a `BTreeMap`, so field iteration order is lexicographic by name —
//! this is what makes derived pattern keys deterministic regardless of the
//! order fields were added in.
//!
//! [`Request::validate`] is pure: it looks only at the request's own fields
//! (no I/O, no history), and it is re-checked on every authorization
//! attempt rather than cached.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::types::Timestamp;

/// The closed set of request kinds the engine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    /// Read or write access to a file.
    FileAccess,
    /// Modification of a system component (restart, reconfigure, ...).
    SystemModification,
    /// Change to a configuration setting.
    ConfigurationChange,
    /// Allocation of a bounded resource (memory, bandwidth, quota).
    ResourceAllocation,
    /// Override of a security control.
    SecurityOverride,
}

impl RequestKind {
    /// Get a short, stable label for this kind.
    ///
    /// Labels are used as the leading component of history pattern keys,
    /// so they must never change for an existing kind.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::FileAccess => "file_access",
            Self::SystemModification => "system_modification",
            Self::ConfigurationChange => "configuration_change",
            Self::ResourceAllocation => "resource_allocation",
            Self::SecurityOverride => "security_override",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A dynamically-typed data field value.
///
/// Untagged on the wire, so `{"path": "/tmp/x", "retries": 3}` deserializes
/// naturally into string and integer fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// A string value.
    Str(String),
    /// A signed integer value.
    Int(i64),
    /// A floating-point value.
    Float(f64),
    /// A boolean value.
    Bool(bool),
}

impl FieldValue {
    /// Get the value as a string slice, if it is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Render the value for inclusion in a history pattern key.
    ///
    /// Returns `None` for floats: they have no stable text form, so two
    /// requests that are semantically identical could otherwise derive
    /// different patterns.
    #[must_use]
    pub fn as_pattern_component(&self) -> Option<String> {
        match self {
            Self::Str(s) => Some(s.clone()),
            Self::Int(n) => Some(n.to_string()),
            Self::Bool(b) => Some(b.to_string()),
            Self::Float(_) => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<f64> for FieldValue {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => write!(f, "{s}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// Metadata attached to a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestMetadata {
    /// Identity of the requester. Must be non-empty for a valid request.
    pub requester: String,
    /// Identifier of the resource being acted on, if any.
    pub resource: String,
    /// When the request was constructed.
    pub created_at: Timestamp,
    /// Free-text tags (unordered, deduplicated).
    pub tags: BTreeSet<String>,
}

/// An action awaiting an approve/deny decision.
///
/// Constructed builder-style and treated as immutable once submitted:
///
/// ```
/// use arbiter_core::{Request, RequestKind};
///
/// let request = Request::new("req-42", RequestKind::SystemModification, "ops-bot")
///     .with_field("component", "network")
///     .with_field("action", "restart")
///     .with_tag("maintenance");
/// assert!(request.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Opaque unique identifier, assigned by the caller.
    pub id: String,
    /// What kind of action this request describes.
    pub kind: RequestKind,
    /// Typed data fields, interpreted per `kind`. Lexicographic iteration
    /// order (`BTreeMap`) keeps derived pattern keys deterministic.
    pub data: BTreeMap<String, FieldValue>,
    /// Requester, resource, timestamp, and tags.
    pub metadata: RequestMetadata,
}

impl Request {
    /// Create a new request with the given id, kind, and requester.
    #[must_use]
    pub fn new(id: impl Into<String>, kind: RequestKind, requester: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            data: BTreeMap::new(),
            metadata: RequestMetadata {
                requester: requester.into(),
                resource: String::new(),
                created_at: Timestamp::now(),
                tags: BTreeSet::new(),
            },
        }
    }

    /// Add a data field.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.data.insert(name.into(), value.into());
        self
    }

    /// Set the resource identifier.
    #[must_use]
    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.metadata.resource = resource.into();
        self
    }

    /// Add a tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.metadata.tags.insert(tag.into());
        self
    }

    /// Get a string data field, if present and string-typed.
    #[must_use]
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.data.get(name).and_then(FieldValue::as_str)
    }

    /// Structurally validate the request.
    ///
    /// Checks that `id` and `metadata.requester` are non-empty, plus
    /// kind-specific completeness: file access requires a non-empty `path`;
    /// system modification requires non-empty `component` and `action`.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] encountered. A request that
    /// fails validation must be rejected outright — not recorded, not
    /// evaluated against any rule.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.is_empty() {
            return Err(ValidationError::MissingId);
        }
        if self.metadata.requester.is_empty() {
            return Err(ValidationError::MissingRequester);
        }
        match self.kind {
            RequestKind::FileAccess => self.require_str_field("path"),
            RequestKind::SystemModification => {
                self.require_str_field("component")?;
                self.require_str_field("action")
            },
            _ => Ok(()),
        }
    }

    /// Require a non-empty string field for kind-specific validation.
    fn require_str_field(&self, field: &'static str) -> Result<(), ValidationError> {
        match self.data.get(field).and_then(FieldValue::as_str) {
            None => Err(ValidationError::MissingField {
                kind: self.kind,
                field,
            }),
            Some("") => Err(ValidationError::EmptyField {
                kind: self.kind,
                field,
            }),
            Some(_) => Ok(()),
        }
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] from {}",
            self.id, self.kind, self.metadata.requester
        )
    }
}

/// Why a request failed structural validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// The request id is empty.
    #[error("request id is empty")]
    MissingId,

    /// The request metadata names no requester.
    #[error("request has no requester")]
    MissingRequester,

    /// A kind-specific required field is absent or not a string.
    #[error("{kind} request is missing required field '{field}'")]
    MissingField {
        /// The kind whose completeness rule failed.
        kind: RequestKind,
        /// The missing field name.
        field: &'static str,
    },

    /// A kind-specific required field is present but empty.
    #[error("{kind} request field '{field}' is empty")]
    EmptyField {
        /// The kind whose completeness rule failed.
        kind: RequestKind,
        /// The empty field name.
        field: &'static str,
    },
}
