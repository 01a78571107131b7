//! Engine error types.

use arbiter_core::ValidationError;

/// Errors surfaced by the authorization engine.
#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    /// The request failed structural validation.
    ///
    /// Fails closed: nothing is recorded and no rule is evaluated.
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] ValidationError),
}

/// Result type for authorization operations.
pub type AuthzResult<T> = Result<T, AuthzError>;
