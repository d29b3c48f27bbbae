//! Rubric evaluation.
//!
//! [`evaluate`] is a pure function of a document snapshot and a rubric. The
//! document is parsed once and every rule is checked against the same tree,
//! in definition order.

use serde::{Deserialize, Serialize};

use crate::markup::Document;
use crate::model::Tier;
use crate::rubric::Rubric;

/// Minimum percentage for an attempt to pass.
pub const PASS_THRESHOLD: f64 = 60.0;

/// Outcome of one rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleOutcome {
    pub key: String,
    pub tier: Tier,
    pub points: u32,
    pub passed: bool,
}

/// Points earned within one tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierSummary {
    pub tier: Tier,
    pub earned_points: u32,
    pub total_points: u32,
    pub rules_passed: usize,
    pub rules_total: usize,
}

/// Result of grading one document against one rubric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    /// One entry per rule, in rubric-definition order.
    pub per_rule: Vec<RuleOutcome>,
    pub earned_points: u32,
    pub total_points: u32,
    /// `earned / total * 100`, or 0 for an empty rubric.
    pub percentage: f64,
    pub passed: bool,
}

impl EvaluationResult {
    /// Build a result from per-rule outcomes, deriving the totals.
    pub fn from_outcomes(per_rule: Vec<RuleOutcome>) -> Self {
        let total_points: u32 = per_rule.iter().map(|r| r.points).sum();
        let earned_points: u32 = per_rule
            .iter()
            .filter(|r| r.passed)
            .map(|r| r.points)
            .sum();
        let percentage = if total_points == 0 {
            0.0
        } else {
            f64::from(earned_points) / f64::from(total_points) * 100.0
        };

        Self {
            per_rule,
            earned_points,
            total_points,
            percentage,
            passed: total_points > 0 && percentage >= PASS_THRESHOLD,
        }
    }

    pub fn outcome(&self, key: &str) -> Option<&RuleOutcome> {
        self.per_rule.iter().find(|r| r.key == key)
    }

    pub fn failed_rules(&self) -> impl Iterator<Item = &RuleOutcome> {
        self.per_rule.iter().filter(|r| !r.passed)
    }

    pub fn passed_count(&self) -> usize {
        self.per_rule.iter().filter(|r| r.passed).count()
    }

    /// Per-tier breakdown, skipping tiers with no rules.
    pub fn tier_summary(&self) -> Vec<TierSummary> {
        Tier::ALL
            .iter()
            .filter_map(|&tier| {
                let rules: Vec<&RuleOutcome> =
                    self.per_rule.iter().filter(|r| r.tier == tier).collect();
                if rules.is_empty() {
                    return None;
                }
                Some(TierSummary {
                    tier,
                    earned_points: rules.iter().filter(|r| r.passed).map(|r| r.points).sum(),
                    total_points: rules.iter().map(|r| r.points).sum(),
                    rules_passed: rules.iter().filter(|r| r.passed).count(),
                    rules_total: rules.len(),
                })
            })
            .collect()
    }
}

/// Grade `document` against `rubric`.
///
/// Never fails: unparseable markup simply fails the rules it cannot satisfy.
pub fn evaluate(document: &str, rubric: &Rubric) -> EvaluationResult {
    let parsed = Document::parse(document);
    evaluate_parsed(&parsed, rubric)
}

/// Grade an already parsed document. Lets callers reuse one parse across
/// several rubrics.
pub fn evaluate_parsed(document: &Document<'_>, rubric: &Rubric) -> EvaluationResult {
    let per_rule: Vec<RuleOutcome> = rubric
        .rules()
        .iter()
        .map(|rule| RuleOutcome {
            key: rule.key().to_string(),
            tier: rule.tier(),
            points: rule.points(),
            passed: rule.check(document),
        })
        .collect();

    let result = EvaluationResult::from_outcomes(per_rule);
    tracing::debug!(
        rubric = rubric.id(),
        earned = result.earned_points,
        total = result.total_points,
        "evaluated document"
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::{Check, ListKind};
    use crate::model::CategoryInfo;
    use crate::rubric::{RubricRegistry, RubricRule};

    fn rubric(rules: Vec<RubricRule>) -> Rubric {
        Rubric::new(CategoryInfo::new("test"), rules).unwrap()
    }

    fn list_rule() -> RubricRule {
        RubricRule::from_check(
            "list",
            10,
            Check::ListItems {
                list: ListKind::Ul,
                min_items: 3,
            },
        )
    }

    #[test]
    fn always_false_rule_on_empty_document() {
        let r = rubric(vec![RubricRule::new("never", 5, |_: &Document<'_>| false)]);
        let result = evaluate("", &r);
        assert_eq!(result.earned_points, 0);
        assert_eq!(result.total_points, 5);
        assert_eq!(result.percentage, 0.0);
        assert!(!result.passed);
        assert_eq!(result.per_rule.len(), 1);
    }

    #[test]
    fn three_item_list_passes_two_item_list_fails() {
        let r = rubric(vec![list_rule()]);
        let three = evaluate("<ul><li>a</li><li>b</li><li>c</li></ul>", &r);
        assert!(three.per_rule[0].passed);
        assert_eq!(three.earned_points, 10);
        assert!(three.passed);

        let two = evaluate("<ul><li>a</li><li>b</li></ul>", &r);
        assert!(!two.per_rule[0].passed);
        assert_eq!(two.earned_points, 0);
    }

    #[test]
    fn empty_rubric_scores_zero_and_fails() {
        let result = evaluate("<html></html>", &rubric(vec![]));
        assert_eq!(result.total_points, 0);
        assert_eq!(result.percentage, 0.0);
        assert!(!result.passed);
        assert!(result.per_rule.is_empty());
    }

    #[test]
    fn outcomes_keep_definition_order() {
        let r = rubric(vec![
            RubricRule::new("z-fails", 1, |_: &Document<'_>| false),
            RubricRule::new("a-passes", 2, |_: &Document<'_>| true),
            RubricRule::new("m-fails", 3, |_: &Document<'_>| false),
        ]);
        let keys: Vec<String> = evaluate("", &r).per_rule.into_iter().map(|o| o.key).collect();
        assert_eq!(keys, vec!["z-fails", "a-passes", "m-fails"]);
    }

    #[test]
    fn earned_is_sum_of_passing_and_bounded_by_total() {
        let registry = RubricRegistry::builtin().unwrap();
        let html = registry.lookup("html").unwrap();
        for doc in ["", "<p>", "<!doctype html><html lang=en><h1>x</h1>", "<<<>>>"] {
            let result = evaluate(doc, &html);
            let sum: u32 = result
                .per_rule
                .iter()
                .filter(|r| r.passed)
                .map(|r| r.points)
                .sum();
            assert_eq!(result.earned_points, sum);
            assert!(result.earned_points <= result.total_points);
            assert!((0.0..=100.0).contains(&result.percentage));
        }
    }

    #[test]
    fn evaluation_is_idempotent() {
        let registry = RubricRegistry::builtin().unwrap();
        let html = registry.lookup("html").unwrap();
        let doc = "<!DOCTYPE html><html lang=\"en\"><body><ul><li>1<li>2<li>3</ul></body></html>";
        assert_eq!(evaluate(doc, &html), evaluate(doc, &html));
    }

    #[test]
    fn adding_a_satisfying_construct_never_lowers_score() {
        let registry = RubricRegistry::builtin().unwrap();
        let html = registry.lookup("html").unwrap();
        let before = "<!DOCTYPE html><html lang=\"en\"><body><h1>Hi</h1></body></html>";
        let after = "<!DOCTYPE html><html lang=\"en\"><body><h1>Hi</h1>\
                     <ul><li>a</li><li>b</li><li>c</li></ul></body></html>";
        let b = evaluate(before, &html);
        let a = evaluate(after, &html);
        assert!(a.earned_points >= b.earned_points);
        assert!(a.outcome("unordered-list").unwrap().passed);
    }

    #[test]
    fn full_page_passes_builtin_rubric() {
        let registry = RubricRegistry::builtin().unwrap();
        let html = registry.lookup("html").unwrap();
        let page = r#"<!DOCTYPE html>
<html lang="en">
<head><title>Mock</title></head>
<body>
  <!-- header -->
  <header><nav><a href="/">Home</a></nav></header>
  <main>
    <h1>Welcome</h1>
    <ul><li>One</li><li>Two</li><li>Three</li></ul>
    <a href="https://developer.mozilla.org/">MDN Web Docs</a>
    <img src="logo.png" alt="Logo">
    <table>
      <tr><th>Name</th><th>Age</th></tr>
      <tr><td>Ann</td><td>30</td></tr>
      <tr><td>Bob</td><td>41</td></tr>
    </table>
    <form>
      <label>Name <input type="text" required></label>
      <label>Email <input type="email"></label>
      <label>Password <input type="password"></label>
      <button type="submit">Sign up</button>
    </form>
  </main>
  <!-- footer -->
  <footer>Bye</footer>
</body>
</html>"#;
        let result = evaluate(page, &html);
        let failed: Vec<&str> = result.failed_rules().map(|r| r.key.as_str()).collect();
        assert!(failed.is_empty(), "failed rules: {failed:?}");
        assert_eq!(result.percentage, 100.0);
        assert!(result.passed);
    }

    #[test]
    fn tier_summary_groups_points() {
        let r = rubric(vec![
            RubricRule::new("a", 4, |_: &Document<'_>| true),
            RubricRule::new("b", 6, |_: &Document<'_>| false).with_tier(Tier::Advanced),
        ]);
        let summary = evaluate("", &r).tier_summary();
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].tier, Tier::Basic);
        assert_eq!(summary[0].earned_points, 4);
        assert_eq!(summary[1].tier, Tier::Advanced);
        assert_eq!(summary[1].rules_passed, 0);
        assert_eq!(summary[1].total_points, 6);
    }

    #[test]
    fn pass_threshold_boundary() {
        let r = rubric(vec![
            RubricRule::new("a", 3, |_: &Document<'_>| true),
            RubricRule::new("b", 2, |_: &Document<'_>| false),
        ]);
        let result = evaluate("", &r);
        assert_eq!(result.percentage, 60.0);
        assert!(result.passed);
    }
}
