//! Cross-cutting error types for examflow.
//!
//! Domain-specific errors (`DatabaseError`, `MoodleError`, `ResolveError`,
//! `WorkflowError`) are defined in their respective crates; the errors here
//! can originate from any of them.

use thiserror::Error;

/// Errors that can be raised by any examflow crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Entity lookup returned no result.
    #[error("Entity not found: {entity_type} {id}")]
    NotFound { entity_type: String, id: String },

    /// A state machine transition was attempted that is not allowed.
    #[error("Invalid state transition: {entity_type} {id} from {from} to {to}")]
    InvalidTransition {
        entity_type: String,
        id: String,
        from: String,
        to: String,
    },

    /// Data failed validation (format, constraints).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Catch-all for unexpected errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
