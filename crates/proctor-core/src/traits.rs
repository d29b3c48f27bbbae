//! Core trait definitions: rule predicates, autosave stores and session
//! observers.
//!
//! Stores are implemented by the `proctor-store` crate; observers by whatever
//! presentation layer drives a session.

use crate::markup::Document;
use crate::model::SavedAttempt;
use crate::report::AttemptRecord;

// ---------------------------------------------------------------------------
// Rule predicates
// ---------------------------------------------------------------------------

/// A gradable structural requirement.
///
/// Implementations must be pure: the same document always yields the same
/// answer, and nothing is retained between calls.
pub trait RulePredicate: Send + Sync {
    /// Whether the document satisfies the requirement.
    fn matches(&self, document: &Document<'_>) -> bool;

    /// Short human-readable description of what is checked.
    fn describe(&self) -> String {
        "custom predicate".to_string()
    }

    /// Problems with the predicate definition itself (e.g. a threshold that
    /// can never be met). Reported by rubric validation, never fatal.
    fn lint(&self) -> Vec<String> {
        Vec::new()
    }
}

impl<F> RulePredicate for F
where
    F: Fn(&Document<'_>) -> bool + Send + Sync,
{
    fn matches(&self, document: &Document<'_>) -> bool {
        self(document)
    }
}

// ---------------------------------------------------------------------------
// Autosave store
// ---------------------------------------------------------------------------

/// Key-value persistence for the autosave slot.
///
/// Exactly one session writes a given key at a time, so implementations need
/// no cross-writer coordination: last write wins.
pub trait AttemptStore: Send + Sync {
    /// Read the entry under `key`, if any.
    fn load(&self, key: &str) -> anyhow::Result<Option<SavedAttempt>>;

    /// Overwrite the entry under `key`.
    fn save(&self, key: &str, attempt: &SavedAttempt) -> anyhow::Result<()>;

    /// Remove the entry under `key`. Clearing a missing key is not an error.
    fn clear(&self, key: &str) -> anyhow::Result<()>;
}

// ---------------------------------------------------------------------------
// Session observer
// ---------------------------------------------------------------------------

/// Receives lifecycle events from a session controller.
///
/// Observers render what the controller reports; they never compute state.
pub trait SessionObserver: Send + Sync {
    fn on_started(&self, budget_seconds: u64);
    fn on_tick(&self, remaining_seconds: u64);
    fn on_violation_warning(&self, count: u32);
    fn on_terminated(&self, record: &AttemptRecord);
}

/// No-op session observer.
pub struct NoopObserver;

impl SessionObserver for NoopObserver {
    fn on_started(&self, _: u64) {}
    fn on_tick(&self, _: u64) {}
    fn on_violation_warning(&self, _: u32) {}
    fn on_terminated(&self, _: &AttemptRecord) {}
}
