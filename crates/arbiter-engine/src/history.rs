//! Decision history — the engine's memory.
//!
//! Every decision the bot makes (approval or denial) is appended to the
//! [`DecisionHistory`] log together with per-pattern statistics. The history
//! answers one question for the rest of the engine: *should this request be
//! auto-approved based on precedent?* Two tiers apply:
//!
//! 1. **Exact pattern**: the request's exact [`Pattern`] has been decided at
//!    least [`DecisionHistory::EXACT_PRECEDENT_MIN`] times and was approved
//!    every time. Consistency is the bar, not frequency — a single denial
//!    resets nothing but blocks this tier until the pattern becomes
//!    unanimous again (which, being append-only, it cannot).
//! 2. **Similar patterns**: at least
//!    [`DecisionHistory::SIMILAR_PATTERNS_MIN`] *distinct other* patterns of
//!    the same request kind have an approved decision on record.
//!
//! The log is append-only: decisions are never mutated or deleted.
//! Retention and eviction are a deployment concern, outside this crate.
//!
//! Concurrency: many readers may query concurrently; writers are exclusive
//! against both readers and other writers (`RwLock`). A poisoned lock is
//! recovered rather than propagated — the inner data is append-only counters
//! and log entries, which cannot be left half-updated in a torn state.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::RwLock;

use arbiter_core::{Request, Timestamp};

/// A deterministic string key summarizing a request's shape.
///
/// Built from the request kind's label followed by `|field:value` for every
/// data field with a scalar text form, in lexicographic field order (the
/// request's data map is a `BTreeMap`). Two structurally identical requests
/// always derive byte-identical patterns.
///
/// ```
/// use arbiter_core::{Request, RequestKind};
/// use arbiter_engine::history::Pattern;
///
/// let a = Request::new("r1", RequestKind::FileAccess, "alice")
///     .with_field("path", "/tmp/x")
///     .with_field("mode", "read");
/// let b = Request::new("r2", RequestKind::FileAccess, "bob")
///     .with_field("mode", "read")
///     .with_field("path", "/tmp/x");
/// assert_eq!(Pattern::derive(&a), Pattern::derive(&b));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Pattern(String);

impl Pattern {
    /// Derive the pattern key for a request.
    #[must_use]
    pub fn derive(request: &Request) -> Self {
        let mut key = request.kind.label().to_string();
        for (name, value) in &request.data {
            if let Some(component) = value.as_pattern_component() {
                key.push('|');
                key.push_str(name);
                key.push(':');
                key.push_str(&component);
            }
        }
        Self(key)
    }

    /// The request-kind prefix (text before the first `|`).
    #[must_use]
    pub fn kind_prefix(&self) -> &str {
        self.0.split('|').next().unwrap_or("")
    }

    /// Check whether two patterns describe the same request kind.
    #[must_use]
    pub fn is_similar_to(&self, other: &Pattern) -> bool {
        self.kind_prefix() == other.kind_prefix()
    }

    /// The pattern key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One recorded decision.
///
/// Only the derived pattern and a context snapshot are persisted — never the
/// request itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoricalDecision {
    /// Pattern key derived from the request.
    pub pattern: Pattern,
    /// The outcome.
    pub approved: bool,
    /// When the decision was recorded.
    pub timestamp: Timestamp,
    /// Snapshot of requester, resource, and tags at decision time.
    pub context: BTreeMap<String, String>,
}

/// Aggregate counters for one pattern.
///
/// Invariant: `approvals <= total_decisions`, both monotonically
/// non-decreasing, updated under the same write lock as the log append.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternStats {
    /// Total decisions recorded for the pattern.
    pub total_decisions: u64,
    /// How many of those were approvals.
    pub approvals: u64,
}

impl PatternStats {
    /// Check whether every recorded decision was an approval.
    #[must_use]
    pub fn is_unanimous(&self) -> bool {
        self.total_decisions > 0 && self.approvals == self.total_decisions
    }
}

/// Log and statistics behind one lock so they can never disagree.
#[derive(Debug, Default)]
struct HistoryInner {
    log: Vec<HistoricalDecision>,
    stats: HashMap<Pattern, PatternStats>,
}

/// Append-only log of past decisions plus derived per-pattern statistics.
///
/// # Example
///
/// ```
/// use arbiter_core::{Request, RequestKind};
/// use arbiter_engine::DecisionHistory;
///
/// let history = DecisionHistory::new();
/// let request = Request::new("r1", RequestKind::FileAccess, "alice")
///     .with_field("path", "/tmp/x");
///
/// for _ in 0..3 {
///     history.record_decision(&request, true);
/// }
/// assert!(history.should_auto_approve(&request));
/// ```
pub struct DecisionHistory {
    inner: RwLock<HistoryInner>,
}

impl DecisionHistory {
    /// Minimum decisions before an exact unanimous pattern auto-approves.
    pub const EXACT_PRECEDENT_MIN: u64 = 3;

    /// Minimum distinct other approved same-kind patterns for the similar tier.
    pub const SIMILAR_PATTERNS_MIN: usize = 3;

    /// Create an empty history.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HistoryInner::default()),
        }
    }

    /// Record a decision for a request.
    ///
    /// Derives the request's pattern, appends to the log, and updates the
    /// pattern's counters — all under one write lock.
    pub fn record_decision(&self, request: &Request, approved: bool) {
        let pattern = Pattern::derive(request);
        let decision = HistoricalDecision {
            pattern: pattern.clone(),
            approved,
            timestamp: Timestamp::now(),
            context: snapshot_context(request),
        };

        let mut inner = self.inner.write().unwrap_or_else(|e| {
            tracing::warn!("DecisionHistory write lock poisoned, recovering");
            e.into_inner()
        });
        inner.log.push(decision);
        let stats = inner.stats.entry(pattern.clone()).or_default();
        stats.total_decisions = stats.total_decisions.saturating_add(1);
        if approved {
            stats.approvals = stats.approvals.saturating_add(1);
        }
        tracing::debug!(
            pattern = %pattern,
            approved,
            total = stats.total_decisions,
            "decision recorded"
        );
    }

    /// Check whether precedent alone justifies approving this request.
    ///
    /// Read-only; tries the exact tier first, then the similar tier.
    #[must_use]
    pub fn should_auto_approve(&self, request: &Request) -> bool {
        let pattern = Pattern::derive(request);
        let inner = self.read_inner();
        exact_precedent(&inner, &pattern) || similar_precedent(&inner, &pattern)
    }

    /// Check the exact tier only: the request's pattern has been decided at
    /// least [`Self::EXACT_PRECEDENT_MIN`] times, all approvals.
    #[must_use]
    pub fn has_exact_precedent(&self, request: &Request) -> bool {
        let pattern = Pattern::derive(request);
        exact_precedent(&self.read_inner(), &pattern)
    }

    /// Check the similar tier only: at least [`Self::SIMILAR_PATTERNS_MIN`]
    /// distinct *other* same-kind patterns have an approved decision.
    #[must_use]
    pub fn has_similar_precedent(&self, request: &Request) -> bool {
        let pattern = Pattern::derive(request);
        similar_precedent(&self.read_inner(), &pattern)
    }

    /// Get the counters for one pattern, if any decisions were recorded.
    #[must_use]
    pub fn stats_for(&self, pattern: &Pattern) -> Option<PatternStats> {
        self.read_inner().stats.get(pattern).copied()
    }

    /// Snapshot of all per-pattern counters, for dashboards and logs.
    #[must_use]
    pub fn stats_snapshot(&self) -> BTreeMap<Pattern, PatternStats> {
        self.read_inner()
            .stats
            .iter()
            .map(|(pattern, stats)| (pattern.clone(), *stats))
            .collect()
    }

    /// Number of recorded decisions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read_inner().log.len()
    }

    /// Check whether no decisions have been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read_inner(&self) -> std::sync::RwLockReadGuard<'_, HistoryInner> {
        self.inner.read().unwrap_or_else(|e| {
            tracing::warn!("DecisionHistory read lock poisoned, recovering");
            e.into_inner()
        })
    }
}

impl Default for DecisionHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DecisionHistory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.read_inner();
        f.debug_struct("DecisionHistory")
            .field("decisions", &inner.log.len())
            .field("patterns", &inner.stats.len())
            .finish()
    }
}

/// Exact-tier check against the locked inner state.
fn exact_precedent(inner: &HistoryInner, pattern: &Pattern) -> bool {
    inner.stats.get(pattern).is_some_and(|stats| {
        stats.total_decisions >= DecisionHistory::EXACT_PRECEDENT_MIN && stats.is_unanimous()
    })
}

/// Similar-tier check against the locked inner state.
///
/// Scans the log for approved decisions whose pattern shares the request
/// kind but differs from the current pattern, counting distinct patterns.
fn similar_precedent(inner: &HistoryInner, pattern: &Pattern) -> bool {
    let mut approved_similar: HashSet<&str> = HashSet::new();
    for decision in &inner.log {
        if decision.approved
            && decision.pattern != *pattern
            && decision.pattern.is_similar_to(pattern)
        {
            approved_similar.insert(decision.pattern.as_str());
            if approved_similar.len() >= DecisionHistory::SIMILAR_PATTERNS_MIN {
                return true;
            }
        }
    }
    false
}

/// Build the persisted context snapshot for a request.
fn snapshot_context(request: &Request) -> BTreeMap<String, String> {
    let mut context = BTreeMap::new();
    context.insert("requester".to_string(), request.metadata.requester.clone());
    context.insert("resource".to_string(), request.metadata.resource.clone());
    for tag in &request.metadata.tags {
        context.insert(format!("tag:{tag}"), "true".to_string());
    }
    context
}
