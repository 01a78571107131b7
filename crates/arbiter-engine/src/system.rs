//! The authorization entry point and the manual review queue.
//!
//! [`AuthorizationSystem`] is the single front door: it validates the
//! request, routes it to the [`AutomatedBot`] when the bot can decide it,
//! and otherwise defers it onto the FIFO [`ReviewQueue`] for a human.
//! Deferred requests are never recorded in the decision history — only the
//! eventual manual verdict would be, and resolving tickets is outside the
//! engine.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use arbiter_core::{Request, Timestamp, UserContext};

use crate::bot::{AutomatedBot, Decision};
use crate::error::AuthzResult;
use crate::history::DecisionHistory;
use crate::rule::AuthorizationRule;

/// Identifier for a queued manual review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TicketId(pub Uuid);

impl TicketId {
    /// Generate a fresh random ticket ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TicketId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ticket:{}", self.0)
    }
}

/// A request awaiting a human decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingReview {
    /// The ticket under which the request was queued.
    pub ticket: TicketId,
    /// The deferred request.
    pub request: Request,
    /// When the request was queued.
    pub queued_at: Timestamp,
}

/// FIFO queue of requests deferred to manual review.
#[derive(Debug, Default)]
pub struct ReviewQueue {
    queue: Mutex<VecDeque<PendingReview>>,
}

impl ReviewQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a request for review, returning its ticket.
    pub fn enqueue(&self, request: Request) -> TicketId {
        let ticket = TicketId::new();
        self.lock().push_back(PendingReview {
            ticket,
            request,
            queued_at: Timestamp::now(),
        });
        ticket
    }

    /// Take the oldest pending review, if any.
    #[must_use]
    pub fn pop_next(&self) -> Option<PendingReview> {
        self.lock().pop_front()
    }

    /// Take every pending review, oldest first, leaving the queue empty.
    #[must_use]
    pub fn drain_pending(&self) -> Vec<PendingReview> {
        self.lock().drain(..).collect()
    }

    /// Number of pending reviews.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Check whether no reviews are pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<PendingReview>> {
        self.queue.lock().unwrap_or_else(|e| {
            tracing::warn!("ReviewQueue mutex poisoned, recovering");
            e.into_inner()
        })
    }
}

/// The top-level authorization service.
///
/// # Example
///
/// ```
/// use arbiter_core::{Request, RequestKind, UserContext};
/// use arbiter_engine::AuthorizationSystem;
///
/// let system = AuthorizationSystem::new();
/// let request = Request::new("r1", RequestKind::FileAccess, "alice")
///     .with_field("path", "/tmp/report.csv");
/// let context = UserContext::new("alice", 1).with_permission("file_access");
///
/// let decision = system.authorize(&request, &context)?;
/// assert!(decision.is_approved());
/// # Ok::<(), arbiter_engine::AuthzError>(())
/// ```
#[derive(Debug)]
pub struct AuthorizationSystem {
    bot: AutomatedBot,
    history: Arc<DecisionHistory>,
    review_queue: ReviewQueue,
}

impl AuthorizationSystem {
    /// Create a system with a fresh history and the standard rule set:
    /// learning (300), system-mod (200), file-access (100, default tiers).
    #[must_use]
    pub fn new() -> Self {
        Self::with_history(Arc::new(DecisionHistory::new()))
    }

    /// Create a system over an existing history, with the standard rule set.
    #[must_use]
    pub fn with_history(history: Arc<DecisionHistory>) -> Self {
        let mut bot = AutomatedBot::new(Arc::clone(&history));
        bot.add_rule(crate::learning::LearningRule::new(Arc::clone(&history)));
        bot.add_rule(crate::rule::SystemModRule::new());
        bot.add_rule(crate::rule::FileAccessRule::default());
        Self {
            bot,
            history,
            review_queue: ReviewQueue::new(),
        }
    }

    /// Create a system over an existing history with no rules registered.
    #[must_use]
    pub fn bare(history: Arc<DecisionHistory>) -> Self {
        Self {
            bot: AutomatedBot::new(Arc::clone(&history)),
            history,
            review_queue: ReviewQueue::new(),
        }
    }

    /// Register an additional rule.
    pub fn add_rule(&mut self, rule: impl AuthorizationRule + 'static) {
        self.bot.add_rule(rule);
    }

    /// Authorize a request.
    ///
    /// The bot decides when it can; anything it cannot handle is queued for
    /// manual review and comes back deferred.
    ///
    /// # Errors
    ///
    /// Returns [`AuthzError::InvalidRequest`](crate::error::AuthzError::InvalidRequest)
    /// when the request fails structural validation. Nothing is recorded and
    /// nothing is queued in that case.
    pub fn authorize(&self, request: &Request, context: &UserContext) -> AuthzResult<Decision> {
        request.validate()?;

        if self.bot.can_handle(request) {
            return Ok(self.bot.process_request(request, context));
        }

        let ticket = self.review_queue.enqueue(request.clone());
        tracing::info!(
            request_id = %request.id,
            %ticket,
            "deferred to manual review"
        );
        Ok(Decision::deferred(format!(
            "queued for manual review ({ticket})"
        )))
    }

    /// The shared decision history.
    #[must_use]
    pub fn history(&self) -> &Arc<DecisionHistory> {
        &self.history
    }

    /// The manual review queue.
    #[must_use]
    pub fn review_queue(&self) -> &ReviewQueue {
        &self.review_queue
    }
}

impl Default for AuthorizationSystem {
    fn default() -> Self {
        Self::new()
    }
}
