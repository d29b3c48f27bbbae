//! Store error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur when reading or writing an autosave store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store file exists but is not a valid slot map.
    #[error("corrupt store file {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A thread panicked while holding the store lock.
    #[error("store lock poisoned")]
    Poisoned,
}
