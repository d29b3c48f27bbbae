//! Error types for rubric loading and session transitions.
//!
//! Both enums describe conditions the caller recovers from locally; none of
//! them aborts an attempt. Malformed submissions are deliberately absent:
//! they degrade to failed rules rather than errors.

use thiserror::Error;

use crate::session::Phase;

/// Errors raised by the session controller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The operation is not allowed in the current phase. State is unchanged.
    #[error("cannot {operation} while {phase}")]
    InvalidTransition {
        operation: &'static str,
        phase: Phase,
    },

    /// The requested time budget is zero or too large to represent.
    #[error("invalid time budget: {0} minutes")]
    InvalidBudget(u64),
}

impl SessionError {
    /// Returns `true` for misuse of the state machine (as opposed to bad input).
    pub fn is_invalid_transition(&self) -> bool {
        matches!(self, SessionError::InvalidTransition { .. })
    }
}

/// Errors raised while building or looking up rubrics.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RubricError {
    /// No rubric table is registered for the category.
    #[error("no rubric available for category '{category}'")]
    Unavailable { category: String },

    /// Two rules share the same key.
    #[error("duplicate rule key '{key}' in rubric '{category}'")]
    DuplicateKey { category: String, key: String },

    /// A rule key is empty or whitespace.
    #[error("empty rule key in rubric '{category}'")]
    EmptyKey { category: String },

    /// Rule weights must be positive.
    #[error("rule '{key}' has zero points")]
    ZeroPoints { key: String },

    /// The sum of rule weights does not fit in a `u32`.
    #[error("total points overflow in rubric '{category}'")]
    PointsOverflow { category: String },
}
