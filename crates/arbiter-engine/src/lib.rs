//! Arbiter authorization decision engine.
//!
//! Decides whether requests may proceed by combining three mechanisms, in
//! order:
//!
//! 1. **Decision history** ([`DecisionHistory`]) — an append-only log of past
//!    outcomes; consistent precedent auto-approves without touching rules.
//! 2. **Rules** ([`rule::AuthorizationRule`]) — prioritized predicates over
//!    the request and the caller's [`UserContext`], including the
//!    precedent-driven [`learning::LearningRule`].
//! 3. **Manual review** ([`system::ReviewQueue`]) — requests nothing
//!    automated can handle are deferred to a FIFO queue for a human.
//!
//! [`AuthorizationSystem`] ties the three together behind a single
//! [`authorize`](AuthorizationSystem::authorize) call returning a tri-state
//! [`Decision`]: approved, denied, or deferred.
//!
//! # Example
//!
//! ```
//! use arbiter_core::{Request, RequestKind, UserContext};
//! use arbiter_engine::AuthorizationSystem;
//!
//! let system = AuthorizationSystem::new();
//! let request = Request::new("req-1", RequestKind::FileAccess, "alice")
//!     .with_field("path", "/tmp/export.csv")
//!     .with_field("mode", "read");
//! let context = UserContext::new("alice", 1).with_permission("file_access");
//!
//! let decision = system.authorize(&request, &context)?;
//! assert!(decision.is_approved());
//! # Ok::<(), arbiter_engine::AuthzError>(())
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod bot;
pub mod error;
pub mod history;
pub mod learning;
pub mod prelude;
pub mod rule;
pub mod system;

pub use arbiter_core::UserContext;
pub use bot::{AutomatedBot, Decision, Verdict};
pub use error::{AuthzError, AuthzResult};
pub use history::{DecisionHistory, Pattern, PatternStats};
pub use system::{AuthorizationSystem, ReviewQueue, TicketId};
