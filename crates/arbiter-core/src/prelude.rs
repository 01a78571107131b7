//! Prelude module - commonly used types for convenient import.
//!
//! Use `use arbiter_core::prelude::*;` to import the data model.

// Request types
pub use crate::{FieldValue, Request, RequestKind, RequestMetadata, ValidationError};

// Context
pub use crate::UserContext;

// Time
pub use crate::Timestamp;
