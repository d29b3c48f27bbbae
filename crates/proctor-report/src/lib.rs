//! proctor-report — HTML and SARIF renderings of attempt records.
//!
//! Both renderers take the rubric as an optional extra so rule
//! descriptions can be shown; without it they fall back to rule keys.

pub mod html;
pub mod sarif;

pub use html::{generate_html, write_html_report};
pub use sarif::{generate_sarif, write_sarif_report};

use proctor_core::rubric::Rubric;

/// Human description of a rule, or its key when no rubric is at hand.
pub(crate) fn rule_description(rubric: Option<&Rubric>, key: &str) -> String {
    rubric
        .and_then(|r| r.rule(key))
        .map(|rule| rule.description())
        .unwrap_or_else(|| key.to_string())
}
