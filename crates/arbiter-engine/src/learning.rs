//! Precedent-driven approval rule.
//!
//! [`LearningRule`] is the highest-priority built-in rule. It approves
//! requests based on the shared [`DecisionHistory`] rather than static
//! policy: an exact unanimous precedent approves outright, while the
//! weaker similar-patterns tier additionally requires the caller to clear
//! a per-kind security floor.

use std::sync::Arc;

use arbiter_core::{Request, RequestKind, UserContext};

use crate::history::DecisionHistory;
use crate::rule::AuthorizationRule;

/// Minimum security level at which the similar-patterns tier may approve a
/// request of the given kind. Exact precedent is not floor-gated: it encodes
/// repeated explicit approvals of this very request shape.
#[must_use]
pub fn security_floor(kind: RequestKind) -> u8 {
    match kind {
        RequestKind::FileAccess | RequestKind::ResourceAllocation => 1,
        RequestKind::ConfigurationChange => 2,
        RequestKind::SystemModification => 3,
        RequestKind::SecurityOverride => 4,
    }
}

/// Approves requests whose pattern has sufficient precedent in the shared
/// decision history.
///
/// Handles every request kind and outranks the static rules, so a learned
/// approval short-circuits permission checks the request once needed.
#[derive(Debug, Clone)]
pub struct LearningRule {
    history: Arc<DecisionHistory>,
}

impl LearningRule {
    /// Priority of this rule in the bot's ordering.
    pub const PRIORITY: i32 = 300;

    /// Create a rule backed by the given history.
    #[must_use]
    pub fn new(history: Arc<DecisionHistory>) -> Self {
        Self { history }
    }
}

impl AuthorizationRule for LearningRule {
    fn name(&self) -> &str {
        "learning"
    }

    fn priority(&self) -> i32 {
        Self::PRIORITY
    }

    fn can_handle(&self, _kind: RequestKind) -> bool {
        true
    }

    fn evaluate(&self, request: &Request, context: &UserContext) -> bool {
        if self.history.has_exact_precedent(request) {
            return true;
        }
        context.security_level >= security_floor(request.kind)
            && self.history.has_similar_precedent(request)
    }

    fn execute(&self, request: &Request) {
        tracing::debug!(request_id = %request.id, "approved from precedent");
    }
}
