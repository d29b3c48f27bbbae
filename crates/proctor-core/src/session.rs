//! The proctored session state machine.
//!
//! [`SessionController`] owns one attempt's [`SessionState`] and is the only
//! thing that mutates it. Every operation returns the resulting
//! [`Transition`] or a [`SessionError`]; a rejected call leaves the state
//! exactly as it was.
//!
//! The controller has no clock of its own. Whoever drives it calls
//! [`SessionController::tick`] once per [`TICK_INTERVAL`].

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::SessionError;
use crate::evaluator::evaluate;
use crate::model::{SavedAttempt, TerminationReason};
use crate::report::{AttemptRecord, Grade};
use crate::rubric::RubricRegistry;
use crate::traits::{AttemptStore, NoopObserver, SessionObserver};

/// The violation that ends an attempt. Earlier ones are advisory.
pub const VIOLATION_LIMIT: u32 = 3;

/// Store key of the autosave slot.
pub const SESSION_KEY: &str = "proctor.attempt";

/// Period between two [`SessionController::tick`] calls.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Lifecycle phase of an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Running,
    Terminated(TerminationReason),
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Idle => write!(f, "idle"),
            Phase::Running => write!(f, "running"),
            Phase::Terminated(reason) => write!(f, "terminated ({reason})"),
        }
    }
}

/// Format seconds as a `MM:SS` countdown. Minutes are not capped.
pub fn format_clock(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// One attempt's lifecycle record.
#[derive(Debug, Clone)]
pub struct SessionState {
    phase: Phase,
    category: String,
    budget_seconds: u64,
    remaining_seconds: u64,
    violation_count: u32,
    saved: Option<SavedAttempt>,
}

impl SessionState {
    fn new(category: String) -> Self {
        Self {
            phase: Phase::Idle,
            category,
            budget_seconds: 0,
            remaining_seconds: 0,
            violation_count: 0,
            saved: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The active category, which is also the autosave tag.
    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn budget_seconds(&self) -> u64 {
        self.budget_seconds
    }

    pub fn remaining_seconds(&self) -> u64 {
        self.remaining_seconds
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.budget_seconds - self.remaining_seconds
    }

    pub fn violation_count(&self) -> u32 {
        self.violation_count
    }

    /// The most recent autosave, whatever its tag.
    pub fn saved(&self) -> Option<&SavedAttempt> {
        self.saved.as_ref()
    }

    /// The document that would be graded if the attempt ended now: the
    /// latest autosave for the active category, or empty.
    pub fn held_document(&self) -> &str {
        self.saved
            .as_ref()
            .filter(|s| s.matches(&self.category))
            .map_or("", |s| s.document_text.as_str())
    }

    pub fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }

    pub fn termination_reason(&self) -> Option<TerminationReason> {
        match self.phase {
            Phase::Terminated(reason) => Some(reason),
            _ => None,
        }
    }

    /// Remaining time as `MM:SS`.
    pub fn remaining_display(&self) -> String {
        format_clock(self.remaining_seconds)
    }

    /// Share of the budget still remaining, 0–100.
    pub fn progress_percent(&self) -> f64 {
        if self.budget_seconds == 0 {
            0.0
        } else {
            self.remaining_seconds as f64 / self.budget_seconds as f64 * 100.0
        }
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            phase: self.phase,
            category: self.category.clone(),
            remaining_seconds: self.remaining_seconds,
            remaining_display: self.remaining_display(),
            progress_percent: self.progress_percent(),
            violation_count: self.violation_count,
        }
    }
}

/// Point-in-time view of a session for presentation layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStatus {
    pub phase: Phase,
    pub category: String,
    pub remaining_seconds: u64,
    pub remaining_display: String,
    pub progress_percent: f64,
    pub violation_count: u32,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} remaining ({:.0}%), {} violation(s), {}",
            self.category,
            self.remaining_display,
            self.progress_percent,
            self.violation_count,
            self.phase
        )
    }
}

/// What a successful operation did.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Idle → Running. Carries a restored document, if one matched.
    Started {
        budget_seconds: u64,
        restored: Option<String>,
    },
    Ticked { remaining_seconds: u64 },
    /// An advisory violation; the attempt keeps running.
    ViolationWarning { count: u32 },
    Autosaved,
    /// Running → Terminated. The attempt has been graded.
    Terminated(Box<AttemptRecord>),
}

impl Transition {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Transition::Terminated(_))
    }
}

/// Drives one attempt from `Idle` to `Terminated`.
pub struct SessionController {
    state: SessionState,
    registry: Arc<RubricRegistry>,
    store: Arc<dyn AttemptStore>,
    store_key: String,
    observer: Arc<dyn SessionObserver>,
    record: Option<AttemptRecord>,
}

impl SessionController {
    pub fn new(
        category: impl Into<String>,
        registry: Arc<RubricRegistry>,
        store: Arc<dyn AttemptStore>,
    ) -> Self {
        Self {
            state: SessionState::new(category.into()),
            registry,
            store,
            store_key: SESSION_KEY.to_string(),
            observer: Arc::new(NoopObserver),
            record: None,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn SessionObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Use a different autosave slot than [`SESSION_KEY`].
    pub fn with_store_key(mut self, key: impl Into<String>) -> Self {
        self.store_key = key.into();
        self
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// The terminal record, once the attempt has ended.
    pub fn record(&self) -> Option<&AttemptRecord> {
        self.record.as_ref()
    }

    /// Switch to another category before the attempt starts.
    pub fn select_category(&mut self, category: impl Into<String>) -> Result<(), SessionError> {
        self.require(Phase::Idle, "select a category")?;
        self.state.category = category.into();
        tracing::debug!(category = %self.state.category, "category selected");
        Ok(())
    }

    /// The stored autosave, if its tag matches the active category.
    ///
    /// A store failure or a mismatched tag both read as "nothing saved".
    pub fn restore(&self) -> Option<SavedAttempt> {
        match self.store.load(&self.store_key) {
            Ok(Some(saved)) if saved.matches(&self.state.category) => Some(saved),
            Ok(Some(saved)) => {
                tracing::debug!(
                    tag = %saved.category_tag,
                    category = %self.state.category,
                    "ignoring autosave for another category"
                );
                None
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("failed to load autosave: {e:#}");
                None
            }
        }
    }

    /// Idle → Running with a budget of `budget_minutes`.
    pub fn start(&mut self, budget_minutes: u64) -> Result<Transition, SessionError> {
        self.require(Phase::Idle, "start")?;
        let budget_seconds = match budget_minutes.checked_mul(60) {
            Some(s) if s > 0 => s,
            _ => return Err(SessionError::InvalidBudget(budget_minutes)),
        };

        let restored = self.restore();
        let restored_text = restored.as_ref().map(|s| s.document_text.clone());

        self.state.budget_seconds = budget_seconds;
        self.state.remaining_seconds = budget_seconds;
        self.state.saved = restored;
        self.state.phase = Phase::Running;

        tracing::info!(
            category = %self.state.category,
            budget = %format_clock(budget_seconds),
            restored = restored_text.is_some(),
            "session started"
        );
        self.observer.on_started(budget_seconds);

        Ok(Transition::Started {
            budget_seconds,
            restored: restored_text,
        })
    }

    /// One second elapsed.
    pub fn tick(&mut self) -> Result<Transition, SessionError> {
        self.require(Phase::Running, "tick")?;
        self.state.remaining_seconds = self.state.remaining_seconds.saturating_sub(1);
        let remaining = self.state.remaining_seconds;
        tracing::debug!(remaining = %format_clock(remaining), "tick");
        self.observer.on_tick(remaining);

        if remaining == 0 {
            let document = self.state.held_document().to_string();
            return Ok(self.terminate(TerminationReason::TimeExpired, document));
        }
        Ok(Transition::Ticked {
            remaining_seconds: remaining,
        })
    }

    /// Record an integrity violation (e.g. the learner left the page).
    pub fn record_violation(&mut self) -> Result<Transition, SessionError> {
        self.require(Phase::Running, "record a violation")?;
        self.state.violation_count += 1;
        let count = self.state.violation_count;

        if count >= VIOLATION_LIMIT {
            let document = self.state.held_document().to_string();
            return Ok(self.terminate(TerminationReason::IntegrityViolation, document));
        }

        tracing::warn!(
            count,
            limit = VIOLATION_LIMIT,
            "integrity violation; the attempt ends at the limit"
        );
        self.observer.on_violation_warning(count);
        Ok(Transition::ViolationWarning { count })
    }

    /// Overwrite the autosave slot. Last write wins.
    pub fn autosave(
        &mut self,
        document_text: impl Into<String>,
        category_tag: impl Into<String>,
    ) -> Result<Transition, SessionError> {
        self.require(Phase::Running, "autosave")?;
        let saved = SavedAttempt::new(document_text, category_tag);

        if let Err(e) = self.store.save(&self.store_key, &saved) {
            tracing::warn!("failed to persist autosave: {e:#}");
        }
        tracing::debug!(bytes = saved.document_text.len(), tag = %saved.category_tag, "autosaved");
        self.state.saved = Some(saved);
        Ok(Transition::Autosaved)
    }

    /// Hand in `document_text` and end the attempt.
    pub fn submit(&mut self, document_text: impl Into<String>) -> Result<Transition, SessionError> {
        self.require(Phase::Running, "submit")?;

        self.state.saved = None;
        if let Err(e) = self.store.clear(&self.store_key) {
            tracing::warn!("failed to clear autosave: {e:#}");
        }
        Ok(self.terminate(TerminationReason::UserSubmitted, document_text.into()))
    }

    fn require(&self, phase: Phase, operation: &'static str) -> Result<(), SessionError> {
        if self.state.phase == phase {
            Ok(())
        } else {
            Err(SessionError::InvalidTransition {
                operation,
                phase: self.state.phase,
            })
        }
    }

    /// Grade `document`, then settle the terminal phase.
    fn terminate(&mut self, reason: TerminationReason, document: String) -> Transition {
        let grade = match self.registry.lookup(&self.state.category) {
            Ok(rubric) => Grade::Graded(evaluate(&document, &rubric)),
            Err(e) => {
                tracing::warn!("attempt left ungraded: {e}");
                Grade::Ungraded {
                    reason: e.to_string(),
                }
            }
        };

        self.state.phase = Phase::Terminated(reason);

        let mut record = AttemptRecord::new(self.state.category.clone(), reason, document, grade);
        record.budget_seconds = self.state.budget_seconds;
        record.elapsed_seconds = self.state.elapsed_seconds();
        record.violation_count = self.state.violation_count;

        tracing::info!(
            reason = %reason,
            elapsed = %format_clock(record.elapsed_seconds),
            "{}",
            record.summary_line()
        );
        self.observer.on_terminated(&record);
        self.record = Some(record.clone());
        Transition::Terminated(Box::new(record))
    }
}

impl fmt::Debug for SessionController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionController")
            .field("state", &self.state)
            .field("store_key", &self.store_key)
            .finish()
    }
}
