//! Prelude module - commonly used types for convenient import.
//!
//! Use `use arbiter_engine::prelude::*;` to import the engine surface.

// Core data model
pub use arbiter_core::prelude::*;

// Engine
pub use crate::bot::{AutomatedBot, Decision, Verdict};
pub use crate::error::{AuthzError, AuthzResult};
pub use crate::history::{DecisionHistory, Pattern, PatternStats};
pub use crate::learning::LearningRule;
pub use crate::rule::{AuthorizationRule, CustomRule, FileAccessRule, PathTier, SystemModRule};
pub use crate::system::{AuthorizationSystem, PendingReview, ReviewQueue, TicketId};
