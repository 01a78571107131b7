//! Arbiter Core - data model for the authorization decision engine.
//!
//! This crate defines the types a caller assembles before asking the engine
//! for a decision:
//!
//! - [`Request`] — an immutable description of an action awaiting an
//!   approve/deny decision: a [`RequestKind`], typed data fields, and
//!   [`RequestMetadata`] (requester, resource, timestamp, tags).
//! - [`UserContext`] — the requester's security level and granted
//!   permissions, supplied fresh for each authorization call.
//! - [`Timestamp`] — a thin wrapper over `chrono` for consistent time
//!   handling.
//!
//! Structural validation lives here too: [`Request::validate`] is a pure
//! function of the request's own fields and is the only hard failure path
//! that bypasses the decision pipeline entirely.
//!
//! # Example
//!
//! ```
//! use arbiter_core::{Request, RequestKind, UserContext};
//!
//! let request = Request::new("req-001", RequestKind::FileAccess, "alice")
//!     .with_field("path", "/home/alice/report.txt");
//! assert!(request.validate().is_ok());
//!
//! let context = UserContext::new("alice", 2).with_permission("file_access");
//! assert!(context.has_permission("file_access"));
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod context;
pub mod prelude;
pub mod request;
pub mod types;

pub use context::UserContext;
pub use request::{FieldValue, Request, RequestKind, RequestMetadata, ValidationError};
pub use types::Timestamp;
