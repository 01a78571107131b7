//! The automated decision bot.
//!
//! [`AutomatedBot`] owns the ordered rule set and the decision recording
//! discipline: exact unanimous precedent is consulted first, then rules in
//! descending priority, and *every* outcome the bot produces — approval or
//! denial, from history or from a rule — is recorded back into the shared
//! [`DecisionHistory`]. Recording is the bot's job alone; rules only
//! evaluate and (on approval) run their side-effect hook.
//!
//! The bot's pre-rule check is deliberately the exact tier only. The weaker
//! similar-pattern tier reaches approval exclusively through
//! [`LearningRule`](crate::learning::LearningRule), which gates it on a
//! per-kind security floor.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use arbiter_core::{Request, Timestamp, UserContext};

use crate::history::DecisionHistory;
use crate::rule::AuthorizationRule;

/// The three terminal outcomes of an authorization call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// The request may proceed.
    Approved,
    /// The request must not proceed.
    Denied,
    /// No automated path applies; the request awaits manual review.
    Deferred,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Approved => write!(f, "approved"),
            Self::Denied => write!(f, "denied"),
            Self::Deferred => write!(f, "deferred"),
        }
    }
}

/// An authorization outcome with its reason and timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    /// The outcome.
    pub verdict: Verdict,
    /// Human-readable explanation of how the verdict was reached.
    pub reason: String,
    /// When the decision was made.
    pub timestamp: Timestamp,
}

impl Decision {
    /// Create an approval.
    #[must_use]
    pub fn approved(reason: impl Into<String>) -> Self {
        Self::with_verdict(Verdict::Approved, reason)
    }

    /// Create a denial.
    #[must_use]
    pub fn denied(reason: impl Into<String>) -> Self {
        Self::with_verdict(Verdict::Denied, reason)
    }

    /// Create a deferral.
    #[must_use]
    pub fn deferred(reason: impl Into<String>) -> Self {
        Self::with_verdict(Verdict::Deferred, reason)
    }

    fn with_verdict(verdict: Verdict, reason: impl Into<String>) -> Self {
        Self {
            verdict,
            reason: reason.into(),
            timestamp: Timestamp::now(),
        }
    }

    /// Check whether the verdict is [`Verdict::Approved`].
    #[must_use]
    pub fn is_approved(&self) -> bool {
        self.verdict == Verdict::Approved
    }

    /// Check whether the verdict is [`Verdict::Denied`].
    #[must_use]
    pub fn is_denied(&self) -> bool {
        self.verdict == Verdict::Denied
    }

    /// Check whether the verdict is [`Verdict::Deferred`].
    #[must_use]
    pub fn is_deferred(&self) -> bool {
        self.verdict == Verdict::Deferred
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.verdict, self.reason)
    }
}

/// Priority-ordered rule engine with history-first auto-approval.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use arbiter_core::{Request, RequestKind, UserContext};
/// use arbiter_engine::{AutomatedBot, DecisionHistory};
/// use arbiter_engine::rule::FileAccessRule;
///
/// let mut bot = AutomatedBot::new(Arc::new(DecisionHistory::new()));
/// bot.add_rule(FileAccessRule::default());
///
/// let request = Request::new("r1", RequestKind::FileAccess, "alice")
///     .with_field("path", "/tmp/report.csv");
/// let context = UserContext::new("alice", 1).with_permission("file_access");
/// assert!(bot.process_request(&request, &context).is_approved());
/// ```
pub struct AutomatedBot {
    history: Arc<DecisionHistory>,
    /// Sorted by descending priority; ties keep registration order.
    rules: Vec<Arc<dyn AuthorizationRule>>,
}

impl AutomatedBot {
    /// Create a bot with no rules, backed by the given history.
    #[must_use]
    pub fn new(history: Arc<DecisionHistory>) -> Self {
        Self {
            history,
            rules: Vec::new(),
        }
    }

    /// Register a rule. Rules are kept in descending priority order; among
    /// equal priorities, earlier registration wins.
    pub fn add_rule(&mut self, rule: impl AuthorizationRule + 'static) {
        self.add_shared_rule(Arc::new(rule));
    }

    /// Register an already-shared rule.
    pub fn add_shared_rule(&mut self, rule: Arc<dyn AuthorizationRule>) {
        self.rules.push(rule);
        self.rules.sort_by_key(|rule| std::cmp::Reverse(rule.priority()));
    }

    /// The registered rules in evaluation order.
    #[must_use]
    pub fn rules(&self) -> &[Arc<dyn AuthorizationRule>] {
        &self.rules
    }

    /// The shared decision history.
    #[must_use]
    pub fn history(&self) -> &Arc<DecisionHistory> {
        &self.history
    }

    /// Check whether the bot can decide this request without manual review:
    /// either exact precedent applies or some registered rule handles the
    /// request kind.
    #[must_use]
    pub fn can_handle(&self, request: &Request) -> bool {
        self.history.has_exact_precedent(request)
            || self.rules.iter().any(|rule| rule.can_handle(request.kind))
    }

    /// Decide a request. Never defers: callers must gate on
    /// [`Self::can_handle`] first.
    ///
    /// The outcome, whatever its source, is recorded into the history.
    pub fn process_request(&self, request: &Request, context: &UserContext) -> Decision {
        if self.history.has_exact_precedent(request) {
            return self.conclude(
                request,
                Decision::approved("auto-approved by decision history"),
            );
        }

        for rule in &self.rules {
            if rule.can_handle(request.kind) && rule.evaluate(request, context) {
                rule.execute(request);
                return self.conclude(
                    request,
                    Decision::approved(format!("approved by rule: {}", rule.name())),
                );
            }
        }

        self.conclude(request, Decision::denied("no automated rule matched"))
    }

    fn conclude(&self, request: &Request, decision: Decision) -> Decision {
        self.history
            .record_decision(request, decision.is_approved());
        tracing::info!(
            request_id = %request.id,
            verdict = %decision.verdict,
            reason = %decision.reason,
            "request decided"
        );
        decision
    }
}

impl fmt::Debug for AutomatedBot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AutomatedBot")
            .field("rules", &self.rules.len())
            .field("history", &self.history)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::learning::LearningRule;
    use crate::rule::{CustomRule, FileAccessRule, SystemModRule};
    use arbiter_core::RequestKind;

    fn file_request(id: &str, path: &str) -> Request {
        Request::new(id, RequestKind::FileAccess, "alice").with_field("path", path)
    }

    fn standard_bot() -> AutomatedBot {
        let history = Arc::new(DecisionHistory::new());
        let mut bot = AutomatedBot::new(Arc::clone(&history));
        bot.add_rule(LearningRule::new(history));
        bot.add_rule(SystemModRule::new());
        bot.add_rule(FileAccessRule::default());
        bot
    }

    // -----------------------------------------------------------------------
    // Decision tests
    // -----------------------------------------------------------------------

    #[test]
    fn test_decision_constructors() {
        assert!(Decision::approved("ok").is_approved());
        assert!(Decision::denied("no").is_denied());
        assert!(Decision::deferred("later").is_deferred());
    }

    #[test]
    fn test_decision_display_and_serialization() {
        let decision = Decision::denied("no automated rule matched");
        assert_eq!(decision.to_string(), "denied: no automated rule matched");
        let json = serde_json::to_string(&decision).unwrap();
        assert!(json.contains("\"verdict\":\"denied\""));
        let deserialized: Decision = serde_json::from_str(&json).unwrap();
        assert_eq!(decision, deserialized);
    }

    // -----------------------------------------------------------------------
    // Rule ordering tests
    // -----------------------------------------------------------------------

    #[test]
    fn test_rules_evaluated_in_descending_priority() {
        let history = Arc::new(DecisionHistory::new());
        let mut bot = AutomatedBot::new(history);
        bot.add_rule(CustomRule::new("low", 100, |_, _| true));
        bot.add_rule(CustomRule::new("high", 200, |_, _| true));

        let decision = bot.process_request(
            &file_request("r1", "/tmp/x"),
            &UserContext::new("alice", 0),
        );
        assert_eq!(decision.reason, "approved by rule: high");
    }

    #[test]
    fn test_equal_priority_keeps_registration_order() {
        let history = Arc::new(DecisionHistory::new());
        let mut bot = AutomatedBot::new(history);
        bot.add_rule(CustomRule::new("first", 100, |_, _| true));
        bot.add_rule(CustomRule::new("second", 100, |_, _| true));

        let decision = bot.process_request(
            &file_request("r1", "/tmp/x"),
            &UserContext::new("alice", 0),
        );
        assert_eq!(decision.reason, "approved by rule: first");
    }

    #[test]
    fn test_losing_rule_skipped_when_cannot_handle() {
        let history = Arc::new(DecisionHistory::new());
        let mut bot = AutomatedBot::new(history);
        bot.add_rule(CustomRule::for_kinds(
            "config-only",
            500,
            [RequestKind::ConfigurationChange],
            |_, _| true,
        ));
        bot.add_rule(CustomRule::new("fallback", 10, |_, _| true));

        let decision = bot.process_request(
            &file_request("r1", "/tmp/x"),
            &UserContext::new("alice", 0),
        );
        assert_eq!(decision.reason, "approved by rule: fallback");
    }

    // -----------------------------------------------------------------------
    // Recording tests
    // -----------------------------------------------------------------------

    #[test]
    fn test_every_outcome_is_recorded() {
        let bot = standard_bot();
        let context = UserContext::new("alice", 1).with_permission("file_access");

        // Approval.
        let approved = bot.process_request(&file_request("r1", "/tmp/a"), &context);
        assert!(approved.is_approved());
        // Denial (no permission).
        let denied =
            bot.process_request(&file_request("r2", "/tmp/b"), &UserContext::new("bob", 0));
        assert!(denied.is_denied());

        assert_eq!(bot.history().len(), 2);
    }

    #[test]
    fn test_history_precedent_short_circuits_rules() {
        let bot = standard_bot();
        let context = UserContext::new("alice", 1).with_permission("file_access");
        let request = file_request("r1", "/tmp/report.csv");

        for _ in 0..3 {
            let decision = bot.process_request(&request, &context);
            assert_eq!(decision.reason, "approved by rule: file-access");
        }

        // Fourth call: exact precedent, even after the permission is revoked.
        let revoked = UserContext::new("alice", 1);
        let decision = bot.process_request(&request, &revoked);
        assert!(decision.is_approved());
        assert_eq!(decision.reason, "auto-approved by decision history");
    }

    #[test]
    fn test_denied_pattern_never_converges_to_auto_approval() {
        let bot = standard_bot();
        let request = file_request("r1", "/proc/self/mem");
        let context = UserContext::new("alice", 1).with_permission("file_access");

        for _ in 0..5 {
            let decision = bot.process_request(&request, &context);
            assert!(decision.is_denied());
        }
    }

    // -----------------------------------------------------------------------
    // can_handle tests
    // -----------------------------------------------------------------------

    #[test]
    fn test_can_handle_by_rule_kind() {
        let history = Arc::new(DecisionHistory::new());
        let mut bot = AutomatedBot::new(Arc::clone(&history));
        bot.add_rule(SystemModRule::new());

        let system = Request::new("r1", RequestKind::SystemModification, "alice")
            .with_field("component", "scheduler")
            .with_field("action", "restart");
        assert!(bot.can_handle(&system));
        assert!(!bot.can_handle(&file_request("r2", "/tmp/x")));
    }

    #[test]
    fn test_can_handle_by_history_precedent() {
        let history = Arc::new(DecisionHistory::new());
        let request = file_request("r1", "/tmp/x");
        for _ in 0..3 {
            history.record_decision(&request, true);
        }
        // A bot with zero rules still handles a request with exact precedent.
        let bot = AutomatedBot::new(history);
        assert!(bot.can_handle(&request));

        let decision = bot.process_request(&request, &UserContext::new("alice", 0));
        assert!(decision.is_approved());
        assert_eq!(decision.reason, "auto-approved by decision history");
    }
}
