//! Registry-level error types.
//!
//! Callers must be able to tell "unknown session" apart from "wrong state
//! for this operation"; the variants keep them distinct.

use thiserror::Error;

/// Errors surfaced by the render registry.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Request shape is invalid; no session was created.
    #[error("invalid request: {0}")]
    Validation(String),

    /// No session (or artifact) with the given id.
    #[error("session not found: {0}")]
    NotFound(String),

    /// The session exists but is in the wrong state for this operation.
    #[error("session {id} is {status}, expected {expected}")]
    StateConflict {
        id: String,
        status: &'static str,
        expected: &'static str,
    },

    /// The artifact is not ready for download yet.
    #[error("session {id} output not ready (status: {status})")]
    NotReady { id: String, status: &'static str },

    /// Reading or writing session files failed.
    #[error("I/O error for session {id}: {source}")]
    Io {
        id: String,
        #[source]
        source: std::io::Error,
    },
}

impl RegistryError {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a not-found error.
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound(id.into())
    }

    /// Create a state-conflict error.
    pub fn state_conflict(
        id: impl Into<String>,
        status: &'static str,
        expected: &'static str,
    ) -> Self {
        Self::StateConflict {
            id: id.into(),
            status,
            expected,
        }
    }

    /// Create an I/O error with session context.
    pub fn io(id: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            id: id.into(),
            source,
        }
    }
}

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;
