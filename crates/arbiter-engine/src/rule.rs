//! Authorization rules.
//!
//! A rule is a named, prioritized predicate over a request and the caller's
//! [`UserContext`]. The bot consults rules in descending priority order and
//! the first rule that both handles the request kind and evaluates true wins.
//!
//! Built-in rules:
//! - [`FileAccessRule`] (priority 100) — permission plus tiered glob path checks
//! - [`SystemModRule`] (priority 200) — permission plus a security-level floor
//! - [`CustomRule`] — caller-supplied closures for everything else

use globset::Glob;
use std::fmt;
use std::path::{Component, Path};

use arbiter_core::{Request, RequestKind, UserContext};

/// A prioritized authorization predicate.
///
/// Rules must be `Send + Sync`: the bot shares them across threads and
/// evaluates them concurrently. `evaluate` must be a pure function of its
/// arguments plus the rule's own (immutable or internally synchronized)
/// state.
pub trait AuthorizationRule: Send + Sync {
    /// Stable, human-readable rule name. Used in decision reasons and logs.
    fn name(&self) -> &str;

    /// Ranking among rules; higher runs first. Ties keep registration order.
    fn priority(&self) -> i32;

    /// Check whether this rule applies to the given request kind at all.
    fn can_handle(&self, kind: RequestKind) -> bool;

    /// Decide whether the request should be approved under this rule.
    fn evaluate(&self, request: &Request, context: &UserContext) -> bool;

    /// Post-approval side effect hook. Runs after this rule approves a
    /// request, before the decision is recorded. The default does nothing.
    fn execute(&self, _request: &Request) {}
}

impl fmt::Debug for dyn AuthorizationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizationRule")
            .field("name", &self.name())
            .field("priority", &self.priority())
            .finish()
    }
}

/// One security tier of a [`FileAccessRule`]: users at or above `min_level`
/// may access paths matching any of the glob `patterns`.
#[derive(Debug, Clone)]
pub struct PathTier {
    /// Minimum security level required for this tier's paths.
    pub min_level: u8,
    /// Glob patterns for the paths the tier covers.
    pub patterns: Vec<String>,
}

impl PathTier {
    /// Create a tier from a level and glob patterns.
    #[must_use]
    pub fn new(min_level: u8, patterns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            min_level,
            patterns: patterns.into_iter().map(Into::into).collect(),
        }
    }
}

/// Grants file-access requests to holders of the `file_access` permission,
/// gated by per-path security tiers.
///
/// A request passes when the caller holds [`FileAccessRule::PERMISSION`],
/// the request carries a `path` field free of parent-directory components,
/// and some tier at or below the caller's security level matches the path.
/// A rule with no tiers (see [`FileAccessRule::permissive`]) accepts any
/// traversal-free path.
#[derive(Debug, Clone)]
pub struct FileAccessRule {
    tiers: Vec<PathTier>,
}

impl FileAccessRule {
    /// Permission required to pass this rule.
    pub const PERMISSION: &'static str = "file_access";

    /// Priority of this rule in the bot's ordering.
    pub const PRIORITY: i32 = 100;

    /// Create a rule with explicit path tiers.
    #[must_use]
    pub fn new(tiers: Vec<PathTier>) -> Self {
        Self { tiers }
    }

    /// Create a rule with no path restrictions beyond traversal rejection.
    #[must_use]
    pub fn permissive() -> Self {
        Self { tiers: Vec::new() }
    }

    /// Check whether `path` is allowed at the given security level.
    ///
    /// Paths containing `..` components are rejected unconditionally.
    #[must_use]
    pub fn path_allowed(&self, path: &str, security_level: u8) -> bool {
        if path.is_empty() || has_parent_component(path) {
            return false;
        }
        if self.tiers.is_empty() {
            return true;
        }
        self.tiers
            .iter()
            .filter(|tier| security_level >= tier.min_level)
            .any(|tier| matches_any_glob(&tier.patterns, path))
    }
}

impl Default for FileAccessRule {
    /// Tiers mirroring common deployment practice: shared scratch space for
    /// everyone, home directories at level 1, system paths at level 3.
    fn default() -> Self {
        Self::new(vec![
            PathTier::new(0, ["/tmp/**", "/var/tmp/**"]),
            PathTier::new(1, ["/home/**", "/srv/shared/**"]),
            PathTier::new(3, ["/etc/**", "/usr/**", "/opt/**"]),
        ])
    }
}

impl AuthorizationRule for FileAccessRule {
    fn name(&self) -> &str {
        "file-access"
    }

    fn priority(&self) -> i32 {
        Self::PRIORITY
    }

    fn can_handle(&self, kind: RequestKind) -> bool {
        kind == RequestKind::FileAccess
    }

    fn evaluate(&self, request: &Request, context: &UserContext) -> bool {
        if !context.has_permission(Self::PERMISSION) {
            return false;
        }
        request
            .str_field("path")
            .is_some_and(|path| self.path_allowed(path, context.security_level))
    }
}

/// Grants system-modification requests to holders of the `system_mod`
/// permission at security level [`SystemModRule::MIN_SECURITY_LEVEL`] or
/// above.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemModRule;

impl SystemModRule {
    /// Permission required to pass this rule.
    pub const PERMISSION: &'static str = "system_mod";

    /// Minimum security level required to pass this rule.
    pub const MIN_SECURITY_LEVEL: u8 = 3;

    /// Priority of this rule in the bot's ordering.
    pub const PRIORITY: i32 = 200;

    /// Create the rule.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl AuthorizationRule for SystemModRule {
    fn name(&self) -> &str {
        "system-mod"
    }

    fn priority(&self) -> i32 {
        Self::PRIORITY
    }

    fn can_handle(&self, kind: RequestKind) -> bool {
        kind == RequestKind::SystemModification
    }

    fn evaluate(&self, _request: &Request, context: &UserContext) -> bool {
        context.has_permission(Self::PERMISSION)
            && context.security_level >= Self::MIN_SECURITY_LEVEL
    }
}

type EvaluateFn = dyn Fn(&Request, &UserContext) -> bool + Send + Sync;
type ExecuteFn = dyn Fn(&Request) + Send + Sync;

/// A rule defined by caller-supplied closures.
///
/// # Example
///
/// ```
/// use arbiter_core::{Request, RequestKind, UserContext};
/// use arbiter_engine::rule::{AuthorizationRule, CustomRule};
///
/// let rule = CustomRule::for_kinds(
///     "low-risk-config",
///     150,
///     [RequestKind::ConfigurationChange],
///     |_request, context| context.security_level >= 2,
/// );
/// let request = Request::new("r1", RequestKind::ConfigurationChange, "alice");
/// assert!(rule.evaluate(&request, &UserContext::new("alice", 2)));
/// assert!(!rule.can_handle(RequestKind::FileAccess));
/// ```
pub struct CustomRule {
    name: String,
    priority: i32,
    /// Empty means the rule handles every request kind.
    kinds: Vec<RequestKind>,
    evaluate: Box<EvaluateFn>,
    execute: Option<Box<ExecuteFn>>,
}

impl CustomRule {
    /// Create a rule that handles every request kind.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        priority: i32,
        evaluate: impl Fn(&Request, &UserContext) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            priority,
            kinds: Vec::new(),
            evaluate: Box::new(evaluate),
            execute: None,
        }
    }

    /// Create a rule restricted to the given request kinds.
    #[must_use]
    pub fn for_kinds(
        name: impl Into<String>,
        priority: i32,
        kinds: impl IntoIterator<Item = RequestKind>,
        evaluate: impl Fn(&Request, &UserContext) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            priority,
            kinds: kinds.into_iter().collect(),
            evaluate: Box::new(evaluate),
            execute: None,
        }
    }

    /// Attach a post-approval side effect.
    #[must_use]
    pub fn with_execute(mut self, execute: impl Fn(&Request) + Send + Sync + 'static) -> Self {
        self.execute = Some(Box::new(execute));
        self
    }
}

impl AuthorizationRule for CustomRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn can_handle(&self, kind: RequestKind) -> bool {
        self.kinds.is_empty() || self.kinds.contains(&kind)
    }

    fn evaluate(&self, request: &Request, context: &UserContext) -> bool {
        (self.evaluate)(request, context)
    }

    fn execute(&self, request: &Request) {
        if let Some(execute) = &self.execute {
            execute(request);
        }
    }
}

impl fmt::Debug for CustomRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomRule")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("kinds", &self.kinds)
            .finish_non_exhaustive()
    }
}

/// Check whether a path contains a parent-directory (`..`) component.
fn has_parent_component(path: &str) -> bool {
    Path::new(path)
        .components()
        .any(|component| component == Component::ParentDir)
}

/// Check whether any pattern in the list matches the path. Invalid glob
/// patterns never match.
fn matches_any_glob(patterns: &[String], path: &str) -> bool {
    patterns.iter().any(|pattern| {
        Glob::new(pattern)
            .ok()
            .is_some_and(|glob| glob.compile_matcher().is_match(path))
    })
}
