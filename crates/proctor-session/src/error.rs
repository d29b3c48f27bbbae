//! Driver error types.

use thiserror::Error;

use proctor_core::error::SessionError;

/// Errors returned through a [`crate::SessionHandle`].
#[derive(Debug, Error)]
pub enum DriverError {
    /// The controller rejected the operation.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The driver task has stopped; the attempt is over or was shut down.
    #[error("session is no longer running")]
    Closed,

    /// The driver task panicked or was aborted.
    #[error("session task failed: {0}")]
    Task(String),
}
