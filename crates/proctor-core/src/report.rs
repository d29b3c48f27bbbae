//! Attempt records with JSON persistence and attempt comparison.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::evaluator::EvaluationResult;
use crate::model::TerminationReason;

/// The grade attached to a finished attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Grade {
    Graded(EvaluationResult),
    /// No rubric could grade the attempt. Distinct from a zero score.
    Ungraded { reason: String },
}

impl Grade {
    pub fn result(&self) -> Option<&EvaluationResult> {
        match self {
            Grade::Graded(result) => Some(result),
            Grade::Ungraded { .. } => None,
        }
    }

    pub fn is_graded(&self) -> bool {
        matches!(self, Grade::Graded(_))
    }
}

/// Everything known about one finished attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    /// Unique attempt identifier.
    pub id: Uuid,
    /// When the attempt terminated.
    pub created_at: DateTime<Utc>,
    /// Category the attempt was graded under.
    pub category: String,
    /// Why the attempt ended.
    pub reason: TerminationReason,
    /// Time budget in seconds (0 for one-shot grading).
    pub budget_seconds: u64,
    /// Seconds consumed before termination.
    pub elapsed_seconds: u64,
    /// Integrity violations recorded while running.
    pub violation_count: u32,
    /// The graded document snapshot.
    pub document: String,
    pub grade: Grade,
}

impl AttemptRecord {
    pub fn new(
        category: impl Into<String>,
        reason: TerminationReason,
        document: impl Into<String>,
        grade: Grade,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            category: category.into(),
            reason,
            budget_seconds: 0,
            elapsed_seconds: 0,
            violation_count: 0,
            document: document.into(),
            grade,
        }
    }

    /// Percentage score, if graded.
    pub fn percentage(&self) -> Option<f64> {
        self.grade.result().map(|r| r.percentage)
    }

    pub fn passed(&self) -> bool {
        self.grade.result().is_some_and(|r| r.passed)
    }

    /// One-line human summary, e.g. `html: 75.0% (passed, submitted)`.
    pub fn summary_line(&self) -> String {
        match &self.grade {
            Grade::Graded(result) => format!(
                "{}: {:.1}% ({}/{} points, {}, {})",
                self.category,
                result.percentage,
                result.earned_points,
                result.total_points,
                if result.passed { "passed" } else { "failed" },
                self.reason
            ),
            Grade::Ungraded { reason } => {
                format!("{}: ungraded ({}, {})", self.category, reason, self.reason)
            }
        }
    }

    /// Save the record as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize attempt")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write attempt to {}", path.display()))?;
        Ok(())
    }

    /// Load a record from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read attempt from {}", path.display()))?;
        let record: AttemptRecord =
            serde_json::from_str(&content).context("failed to parse attempt JSON")?;
        Ok(record)
    }

    /// Compare this attempt against a baseline attempt, rule by rule.
    pub fn compare(&self, baseline: &AttemptRecord) -> AttemptComparison {
        let outcomes = |record: &AttemptRecord| -> HashMap<String, bool> {
            record
                .grade
                .result()
                .map(|r| r.per_rule.iter().map(|o| (o.key.clone(), o.passed)).collect())
                .unwrap_or_default()
        };

        let before = outcomes(baseline);
        let after = outcomes(self);

        let mut newly_passed = Vec::new();
        let mut newly_failed = Vec::new();
        let mut unchanged = 0usize;
        let mut added_rules = Vec::new();

        // Walk the current attempt's rules in definition order.
        let current_order: Vec<&str> = self
            .grade
            .result()
            .map(|r| r.per_rule.iter().map(|o| o.key.as_str()).collect())
            .unwrap_or_default();

        for key in current_order {
            let now = after.get(key).copied().unwrap_or(false);
            match before.get(key) {
                Some(&was) if was == now => unchanged += 1,
                Some(_) if now => newly_passed.push(key.to_string()),
                Some(_) => newly_failed.push(key.to_string()),
                None => added_rules.push(key.to_string()),
            }
        }

        let removed_rules: Vec<String> = baseline
            .grade
            .result()
            .map(|r| {
                r.per_rule
                    .iter()
                    .filter(|o| !after.contains_key(&o.key))
                    .map(|o| o.key.clone())
                    .collect()
            })
            .unwrap_or_default();

        let baseline_percentage = baseline.percentage();
        let current_percentage = self.percentage();
        let delta = match (baseline_percentage, current_percentage) {
            (Some(b), Some(c)) => Some(c - b),
            _ => None,
        };

        AttemptComparison {
            category: self.category.clone(),
            baseline_category: baseline.category.clone(),
            baseline_percentage,
            current_percentage,
            delta,
            newly_passed,
            newly_failed,
            unchanged,
            added_rules,
            removed_rules,
        }
    }
}

/// Result of comparing two attempts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptComparison {
    pub category: String,
    pub baseline_category: String,
    /// `None` when the baseline was ungraded.
    pub baseline_percentage: Option<f64>,
    /// `None` when the current attempt was ungraded.
    pub current_percentage: Option<f64>,
    /// Current minus baseline, in percentage points.
    pub delta: Option<f64>,
    /// Rules failing in the baseline and passing now.
    pub newly_passed: Vec<String>,
    /// Rules passing in the baseline and failing now.
    pub newly_failed: Vec<String>,
    /// Rules with the same outcome in both attempts.
    pub unchanged: usize,
    /// Rules only present in the current attempt.
    pub added_rules: Vec<String>,
    /// Rules only present in the baseline.
    pub removed_rules: Vec<String>,
}

impl AttemptComparison {
    /// Returns true if a previously passing rule now fails, or the attempt
    /// lost its grade altogether.
    pub fn has_regressions(&self) -> bool {
        !self.newly_failed.is_empty()
            || (self.baseline_percentage.is_some() && self.current_percentage.is_none())
    }

    /// Format the comparison as markdown.
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();

        let pct = |p: Option<f64>| p.map_or_else(|| "ungraded".to_string(), |v| format!("{v:.1}%"));
        md.push_str(&format!(
            "**{}:** {} → {}",
            self.category,
            pct(self.baseline_percentage),
            pct(self.current_percentage)
        ));
        if let Some(delta) = self.delta {
            md.push_str(&format!(" ({delta:+.1}%)"));
        }
        md.push_str("\n\n");

        md.push_str(&format!(
            "**Summary:** {} newly passed, {} newly failed, {} unchanged\n\n",
            self.newly_passed.len(),
            self.newly_failed.len(),
            self.unchanged
        ));

        if self.category != self.baseline_category {
            md.push_str(&format!(
                "> baseline was graded as '{}'\n\n",
                self.baseline_category
            ));
        }

        let sections = [
            ("Newly failed", &self.newly_failed),
            ("Newly passed", &self.newly_passed),
            ("Added rules", &self.added_rules),
            ("Removed rules", &self.removed_rules),
        ];
        for (title, keys) in sections {
            if keys.is_empty() {
                continue;
            }
            md.push_str(&format!("### {title}\n\n"));
            for key in keys {
                md.push_str(&format!("- `{key}`\n"));
            }
            md.push('\n');
        }

        md
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::RuleOutcome;
    use crate::model::Tier;

    fn graded(outcomes: &[(&str, u32, bool)]) -> AttemptRecord {
        let per_rule = outcomes
            .iter()
            .map(|&(key, points, passed)| RuleOutcome {
                key: key.to_string(),
                tier: Tier::Basic,
                points,
                passed,
            })
            .collect();
        AttemptRecord::new(
            "html",
            TerminationReason::UserSubmitted,
            "<p></p>",
            Grade::Graded(EvaluationResult::from_outcomes(per_rule)),
        )
    }

    fn ungraded() -> AttemptRecord {
        AttemptRecord::new(
            "css",
            TerminationReason::TimeExpired,
            "",
            Grade::Ungraded {
                reason: "no rubric available for category 'css'".into(),
            },
        )
    }

    #[test]
    fn json_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/attempt.json");
        let record = graded(&[("a", 5, true), ("b", 5, false)]);
        record.save_json(&path).unwrap();
        let loaded = AttemptRecord::load_json(&path).unwrap();
        assert_eq!(loaded, record);

        let json = std::fs::read_to_string(&path).unwrap();
        assert!(json.contains("\"status\": \"graded\""));
        assert!(json.contains("\"reason\": \"user_submitted\""));
    }

    #[test]
    fn ungraded_is_distinct_from_zero() {
        let record = ungraded();
        assert!(!record.grade.is_graded());
        assert_eq!(record.percentage(), None);
        assert!(!record.passed());
        assert!(record.summary_line().contains("ungraded"));

        let zero = graded(&[("a", 5, false)]);
        assert_eq!(zero.percentage(), Some(0.0));
    }

    #[test]
    fn load_missing_file_fails() {
        assert!(AttemptRecord::load_json(Path::new("/nonexistent/attempt.json")).is_err());
    }

    #[test]
    fn compare_detects_rule_changes() {
        let baseline = graded(&[("a", 5, true), ("b", 5, false), ("c", 5, true), ("old", 1, true)]);
        let current = graded(&[("a", 5, true), ("b", 5, true), ("c", 5, false), ("new", 1, true)]);
        let cmp = current.compare(&baseline);

        assert_eq!(cmp.newly_passed, vec!["b"]);
        assert_eq!(cmp.newly_failed, vec!["c"]);
        assert_eq!(cmp.unchanged, 1);
        assert_eq!(cmp.added_rules, vec!["new"]);
        assert_eq!(cmp.removed_rules, vec!["old"]);
        assert!(cmp.has_regressions());

        let md = cmp.to_markdown();
        assert!(md.contains("### Newly failed"));
        assert!(md.contains("- `c`"));
    }

    #[test]
    fn compare_without_regressions() {
        let baseline = graded(&[("a", 5, false), ("b", 5, true)]);
        let current = graded(&[("a", 5, true), ("b", 5, true)]);
        let cmp = current.compare(&baseline);
        assert!(!cmp.has_regressions());
        assert_eq!(cmp.delta, Some(50.0));
        assert!(cmp.to_markdown().contains("+50.0%"));
    }

    #[test]
    fn losing_the_grade_is_a_regression() {
        let baseline = graded(&[("a", 5, true)]);
        let cmp = ungraded().compare(&baseline);
        assert!(cmp.has_regressions());
        assert_eq!(cmp.delta, None);
        assert_eq!(cmp.removed_rules, vec!["a"]);
        assert!(cmp.to_markdown().contains("ungraded"));
    }
}
