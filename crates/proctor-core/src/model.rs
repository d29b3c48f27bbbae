//! Core data model types for proctor.
//!
//! These are the types shared by the evaluator, the session controller and
//! the persisted attempt records.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Presentational grouping of rubric rules.
///
/// Tiers never gate each other; every rule is scored independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Basic,
    Intermediate,
    Advanced,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Basic, Tier::Intermediate, Tier::Advanced];
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Basic => write!(f, "basic"),
            Tier::Intermediate => write!(f, "intermediate"),
            Tier::Advanced => write!(f, "advanced"),
        }
    }
}

impl FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "basic" | "beginner" => Ok(Tier::Basic),
            "intermediate" => Ok(Tier::Intermediate),
            "advanced" => Ok(Tier::Advanced),
            other => Err(format!("unknown tier: {other}")),
        }
    }
}

/// Descriptive header of a grading category (one rubric table).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryInfo {
    /// Category identifier, also used as the autosave tag (e.g. "html").
    pub id: String,
    /// Human-readable title.
    pub title: String,
    /// One-paragraph overview shown before the attempt starts.
    #[serde(default)]
    pub overview: String,
    /// Suggested time budget for an attempt.
    #[serde(default = "default_duration")]
    pub duration_minutes: u64,
    /// Instruction bullet points, rendered by the presentation layer.
    #[serde(default)]
    pub instructions: Vec<String>,
}

impl CategoryInfo {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            title: id.clone(),
            id,
            overview: String::new(),
            duration_minutes: default_duration(),
            instructions: Vec::new(),
        }
    }
}

fn default_duration() -> u64 {
    60
}

/// Why an attempt ended. Recorded exactly once per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    UserSubmitted,
    TimeExpired,
    IntegrityViolation,
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationReason::UserSubmitted => write!(f, "submitted"),
            TerminationReason::TimeExpired => write!(f, "time expired"),
            TerminationReason::IntegrityViolation => write!(f, "integrity violation"),
        }
    }
}

/// The autosave slot contents: a document and the category it was written for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedAttempt {
    pub document_text: String,
    pub category_tag: String,
}

impl SavedAttempt {
    pub fn new(document_text: impl Into<String>, category_tag: impl Into<String>) -> Self {
        Self {
            document_text: document_text.into(),
            category_tag: category_tag.into(),
        }
    }

    /// Whether this save may be restored into a session for `category`.
    pub fn matches(&self, category: &str) -> bool {
        self.category_tag == category
    }
}
