//! Rubric tables and the category registry.
//!
//! A rubric is an ordered, immutable list of weighted rules. Swapping the
//! table swaps the graded category; the evaluator itself never changes.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use crate::checks::Check;
use crate::error::RubricError;
use crate::markup::Document;
use crate::model::{CategoryInfo, Tier};
use crate::parser;
use crate::traits::RulePredicate;

/// The built-in HTML markup-structure rubric.
pub const BUILTIN_HTML_RUBRIC: &str = include_str!("../rubrics/html.toml");

/// One gradable requirement.
#[derive(Clone)]
pub struct RubricRule {
    key: String,
    points: u32,
    tier: Tier,
    description: String,
    predicate: Arc<dyn RulePredicate>,
}

impl RubricRule {
    pub fn new(key: impl Into<String>, points: u32, predicate: impl RulePredicate + 'static) -> Self {
        Self {
            key: key.into(),
            points,
            tier: Tier::Basic,
            description: String::new(),
            predicate: Arc::new(predicate),
        }
    }

    /// Build a rule from a built-in check.
    pub fn from_check(key: impl Into<String>, points: u32, check: Check) -> Self {
        Self::new(key, points, check)
    }

    pub fn with_tier(mut self, tier: Tier) -> Self {
        self.tier = tier;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn points(&self) -> u32 {
        self.points
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    /// The author's description, falling back to the predicate's own.
    pub fn description(&self) -> String {
        if self.description.is_empty() {
            self.predicate.describe()
        } else {
            self.description.clone()
        }
    }

    pub fn has_description(&self) -> bool {
        !self.description.trim().is_empty()
    }

    pub fn predicate(&self) -> &dyn RulePredicate {
        self.predicate.as_ref()
    }

    /// Evaluate this rule against a parsed document.
    pub fn check(&self, document: &Document<'_>) -> bool {
        self.predicate.matches(document)
    }
}

impl fmt::Debug for RubricRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RubricRule")
            .field("key", &self.key)
            .field("points", &self.points)
            .field("tier", &self.tier)
            .field("predicate", &self.predicate.describe())
            .finish()
    }
}

/// A validated, ordered rubric for one category.
#[derive(Debug, Clone)]
pub struct Rubric {
    category: CategoryInfo,
    rules: Vec<RubricRule>,
    total_points: u32,
}

impl Rubric {
    /// Build a rubric, enforcing unique non-empty keys and positive weights.
    pub fn new(category: CategoryInfo, rules: Vec<RubricRule>) -> Result<Self, RubricError> {
        let mut seen = HashSet::new();
        let mut total: u32 = 0;

        for rule in &rules {
            if rule.key.trim().is_empty() {
                return Err(RubricError::EmptyKey {
                    category: category.id.clone(),
                });
            }
            if !seen.insert(rule.key.as_str()) {
                return Err(RubricError::DuplicateKey {
                    category: category.id.clone(),
                    key: rule.key.clone(),
                });
            }
            if rule.points == 0 {
                return Err(RubricError::ZeroPoints {
                    key: rule.key.clone(),
                });
            }
            total = total
                .checked_add(rule.points)
                .ok_or_else(|| RubricError::PointsOverflow {
                    category: category.id.clone(),
                })?;
        }

        Ok(Self {
            category,
            rules,
            total_points: total,
        })
    }

    pub fn category(&self) -> &CategoryInfo {
        &self.category
    }

    pub fn id(&self) -> &str {
        &self.category.id
    }

    /// Rules in definition order.
    pub fn rules(&self) -> &[RubricRule] {
        &self.rules
    }

    pub fn rule(&self, key: &str) -> Option<&RubricRule> {
        self.rules.iter().find(|r| r.key == key)
    }

    /// Sum of all rule weights, fixed at construction.
    pub fn total_points(&self) -> u32 {
        self.total_points
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Total points available in one tier.
    pub fn tier_points(&self, tier: Tier) -> u32 {
        self.rules
            .iter()
            .filter(|r| r.tier == tier)
            .map(|r| r.points)
            .sum()
    }
}

/// Category id → rubric.
#[derive(Debug, Clone, Default)]
pub struct RubricRegistry {
    rubrics: BTreeMap<String, Arc<Rubric>>,
}

impl RubricRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry containing the built-in rubrics.
    pub fn builtin() -> Result<Self> {
        let mut registry = Self::new();
        for rubric in builtin_rubrics()? {
            registry.insert(rubric);
        }
        Ok(registry)
    }

    /// Built-in rubrics overlaid with every rubric file under `dir`.
    /// A file whose category matches a built-in replaces it.
    pub fn with_directory(dir: &Path) -> Result<Self> {
        let mut registry = Self::builtin()?;
        for rubric in parser::load_rubric_directory(dir)? {
            if let Some(previous) = registry.insert(rubric) {
                tracing::debug!("rubric '{}' overridden from {}", previous.id(), dir.display());
            }
        }
        Ok(registry)
    }

    /// Register a rubric, returning the one it replaced.
    pub fn insert(&mut self, rubric: Rubric) -> Option<Arc<Rubric>> {
        self.rubrics
            .insert(rubric.id().to_string(), Arc::new(rubric))
    }

    pub fn lookup(&self, category: &str) -> Result<Arc<Rubric>, RubricError> {
        self.rubrics
            .get(category)
            .cloned()
            .ok_or_else(|| RubricError::Unavailable {
                category: category.to_string(),
            })
    }

    pub fn contains(&self, category: &str) -> bool {
        self.rubrics.contains_key(category)
    }

    /// Registered rubrics ordered by category id.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Rubric>> {
        self.rubrics.values()
    }

    pub fn len(&self) -> usize {
        self.rubrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rubrics.is_empty()
    }
}

/// Parse the rubrics compiled into the binary.
pub fn builtin_rubrics() -> Result<Vec<Rubric>> {
    Ok(vec![parser::parse_rubric_str(
        BUILTIN_HTML_RUBRIC,
        Path::new("<builtin:html>"),
    )?])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn always(result: bool) -> impl Fn(&Document<'_>) -> bool + Send + Sync {
        move |_| result
    }

    #[test]
    fn total_points_is_sum_of_weights() {
        let rubric = Rubric::new(
            CategoryInfo::new("t"),
            vec![
                RubricRule::new("a", 5, always(true)),
                RubricRule::new("b", 7, always(false)).with_tier(Tier::Advanced),
            ],
        )
        .unwrap();
        assert_eq!(rubric.total_points(), 12);
        assert_eq!(rubric.tier_points(Tier::Advanced), 7);
        assert_eq!(rubric.rules()[0].key(), "a");
    }

    #[test]
    fn duplicate_keys_rejected() {
        let err = Rubric::new(
            CategoryInfo::new("t"),
            vec![
                RubricRule::new("a", 1, always(true)),
                RubricRule::new("a", 2, always(true)),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, RubricError::DuplicateKey { ref key, .. } if key == "a"));
    }

    #[test]
    fn zero_points_and_empty_keys_rejected() {
        assert!(matches!(
            Rubric::new(CategoryInfo::new("t"), vec![RubricRule::new("a", 0, always(true))]),
            Err(RubricError::ZeroPoints { .. })
        ));
        assert!(matches!(
            Rubric::new(CategoryInfo::new("t"), vec![RubricRule::new("  ", 1, always(true))]),
            Err(RubricError::EmptyKey { .. })
        ));
    }

    #[test]
    fn overflow_rejected() {
        let err = Rubric::new(
            CategoryInfo::new("t"),
            vec![
                RubricRule::new("a", u32::MAX, always(true)),
                RubricRule::new("b", 1, always(true)),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, RubricError::PointsOverflow { .. }));
    }

    #[test]
    fn empty_rubric_is_allowed() {
        let rubric = Rubric::new(CategoryInfo::new("empty"), vec![]).unwrap();
        assert!(rubric.is_empty());
        assert_eq!(rubric.total_points(), 0);
    }

    #[test]
    fn registry_lookup() {
        let registry = RubricRegistry::builtin().unwrap();
        assert!(registry.contains("html"));
        assert!(registry.lookup("html").unwrap().total_points() > 0);
        assert!(matches!(
            registry.lookup("cobol"),
            Err(RubricError::Unavailable { .. })
        ));
    }

    #[test]
    fn description_falls_back_to_predicate() {
        let rule = RubricRule::from_check("doctype", 5, Check::Doctype);
        assert!(!rule.has_description());
        assert_eq!(rule.description(), "HTML doctype declaration");
        let rule = rule.with_description("Declares HTML5");
        assert_eq!(rule.description(), "Declares HTML5");
    }
}
