//! TOML rubric parser.
//!
//! Loads rubric tables from TOML files and directories, and validates them.

use std::collections::{BTreeSet, HashSet};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::checks::Check;
use crate::model::{CategoryInfo, Tier};
use crate::rubric::{Rubric, RubricRule};

/// Intermediate TOML structure for parsing rubric files.
#[derive(Debug, Deserialize)]
struct TomlRubricFile {
    category: CategoryInfo,
    #[serde(default)]
    rules: Vec<TomlRule>,
}

#[derive(Debug, Deserialize)]
struct TomlRule {
    key: String,
    #[serde(default = "default_tier_str")]
    tier: String,
    points: u32,
    #[serde(default)]
    description: String,
    check: Check,
}

fn default_tier_str() -> String {
    "basic".to_string()
}

/// Parse a single TOML file into a `Rubric`.
pub fn parse_rubric(path: &Path) -> Result<Rubric> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read rubric file: {}", path.display()))?;

    parse_rubric_str(&content, path)
}

/// Parse a TOML string into a `Rubric` (useful for testing).
pub fn parse_rubric_str(content: &str, source_path: &Path) -> Result<Rubric> {
    let parsed: TomlRubricFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let rules = parsed
        .rules
        .into_iter()
        .map(|r| {
            let tier: Tier = r
                .tier
                .parse()
                .map_err(|e: String| anyhow::anyhow!("rule '{}': {}", r.key, e))?;
            Ok(RubricRule::from_check(r.key, r.points, r.check)
                .with_tier(tier)
                .with_description(r.description))
        })
        .collect::<Result<Vec<_>>>()?;

    Rubric::new(parsed.category, rules)
        .with_context(|| format!("invalid rubric: {}", source_path.display()))
}

/// Recursively load all `.toml` rubric files from a directory.
pub fn load_rubric_directory(dir: &Path) -> Result<Vec<Rubric>> {
    let mut rubrics = Vec::new();

    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
    {
        let entry = entry?;
        let path = entry.path();

        if path.is_dir() {
            rubrics.extend(load_rubric_directory(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            match parse_rubric(&path) {
                Ok(rubric) => rubrics.push(rubric),
                Err(e) => {
                    tracing::warn!("skipping {}: {:#}", path.display(), e);
                }
            }
        }
    }

    rubrics.sort_by(|a, b| a.id().cmp(b.id()));
    Ok(rubrics)
}

/// A warning from rubric validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The rule key (if applicable).
    pub rule_key: Option<String>,
    /// Warning message.
    pub message: String,
}

impl ValidationWarning {
    fn rubric(message: impl Into<String>) -> Self {
        Self {
            rule_key: None,
            message: message.into(),
        }
    }

    fn rule(key: &str, message: impl Into<String>) -> Self {
        Self {
            rule_key: Some(key.to_string()),
            message: message.into(),
        }
    }
}

/// Validate a rubric for issues that do not prevent grading.
pub fn validate_rubric(rubric: &Rubric) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    if rubric.is_empty() {
        warnings.push(ValidationWarning::rubric(
            "rubric has no rules; every attempt will score 0%",
        ));
        return warnings;
    }

    if rubric.category().duration_minutes == 0 {
        warnings.push(ValidationWarning::rubric(
            "duration_minutes is 0; sessions need an explicit budget",
        ));
    }

    if rubric.category().title.trim().is_empty() {
        warnings.push(ValidationWarning::rubric("category title is empty"));
    }

    for rule in rubric.rules() {
        if !rule.has_description() {
            warnings.push(ValidationWarning::rule(rule.key(), "description is empty"));
        }
        for problem in rule.predicate().lint() {
            warnings.push(ValidationWarning::rule(rule.key(), problem));
        }
    }

    let tiers: BTreeSet<Tier> = rubric.rules().iter().map(|r| r.tier()).collect();
    if rubric.len() > 1 && tiers.len() == 1 {
        if let Some(tier) = tiers.first() {
            warnings.push(ValidationWarning::rubric(format!(
                "all rules are in the {tier} tier"
            )));
        }
    }

    // Rules that read the same description are usually a copy-paste slip.
    let mut seen = HashSet::new();
    for rule in rubric.rules().iter().filter(|r| r.has_description()) {
        let description = rule.description();
        if !seen.insert(description.trim().to_lowercase()) {
            warnings.push(ValidationWarning::rule(
                rule.key(),
                format!("duplicate description: {description}"),
            ));
        }
    }

    warnings
}
