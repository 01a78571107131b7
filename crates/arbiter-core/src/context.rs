//! Per-call user context.
//!
//! A [`UserContext`] carries the requester's security level and granted
//! permission set for the duration of a single authorization call. It is
//! constructed by the caller, passed by reference, and never stored by the
//! engine — two concurrent calls can therefore never observe each other's
//! context.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// The requester's identity, privilege tier, and permission set.
///
/// Security levels are ordered integers; higher means more privileged.
///
/// # Example
///
/// ```
/// use arbiter_core::UserContext;
///
/// let context = UserContext::new("alice", 3)
///     .with_permission("file_access")
///     .with_permission("system_mod");
/// assert!(context.has_permission("system_mod"));
/// assert!(!context.has_permission("security_override"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserContext {
    /// String identity of the requester.
    pub user_id: String,
    /// Ordered privilege tier; higher is more privileged.
    pub security_level: u8,
    /// Granted permission names.
    pub permissions: HashSet<String>,
}

impl UserContext {
    /// Create a context with no permissions.
    #[must_use]
    pub fn new(user_id: impl Into<String>, security_level: u8) -> Self {
        Self {
            user_id: user_id.into(),
            security_level,
            permissions: HashSet::new(),
        }
    }

    /// Grant a permission.
    #[must_use]
    pub fn with_permission(mut self, permission: impl Into<String>) -> Self {
        self.permissions.insert(permission.into());
        self
    }

    /// Check whether a permission has been granted.
    #[must_use]
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }
}

impl fmt::Display for UserContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (level {})", self.user_id, self.security_level)
    }
}
