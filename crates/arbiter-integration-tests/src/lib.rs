//! Cross-crate integration tests for the Arbiter engine.
//!
//! The tests live in `tests/`; this crate exports nothing.

#![deny(unsafe_code)]
#![deny(clippy::all)]
