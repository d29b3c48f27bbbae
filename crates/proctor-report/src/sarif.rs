//! SARIF (Static Analysis Results Interchange Format) output.
//!
//! Generates SARIF 2.1.0 documents so missing requirements show up in code
//! scanning tools next to the submitted file.

use std::path::Path;

use anyhow::{Context, Result};
use serde_json::json;

use proctor_core::model::Tier;
use proctor_core::report::{AttemptRecord, Grade};
use proctor_core::rubric::Rubric;

use crate::rule_description;

const UNGRADED_RULE: &str = "ungraded";

/// SARIF level for a missing requirement.
fn level(tier: Tier) -> &'static str {
    match tier {
        Tier::Basic => "error",
        Tier::Intermediate => "warning",
        Tier::Advanced => "note",
    }
}

/// Generate a SARIF 2.1.0 JSON document from an attempt record.
///
/// Every failed rule becomes one result located in `document_uri`.
pub fn generate_sarif(
    record: &AttemptRecord,
    rubric: Option<&Rubric>,
    document_uri: &str,
) -> serde_json::Value {
    let mut results = Vec::new();
    let mut rules = Vec::new();

    let location = json!({
        "physicalLocation": {
            "artifactLocation": {
                "uri": document_uri
            }
        }
    });

    match &record.grade {
        Grade::Graded(result) => {
            for r in &result.per_rule {
                let description = rule_description(rubric, &r.key);
                rules.push(json!({
                    "id": r.key,
                    "name": r.key,
                    "shortDescription": { "text": description },
                    "properties": { "tier": r.tier.to_string(), "points": r.points },
                }));

                if !r.passed {
                    results.push(json!({
                        "ruleId": r.key,
                        "level": level(r.tier),
                        "message": { "text": format!("[{}] missing: {} ({} points)", record.category, description, r.points) },
                        "locations": [location.clone()]
                    }));
                }
            }
        }
        Grade::Ungraded { reason } => {
            rules.push(json!({
                "id": UNGRADED_RULE,
                "name": "Ungraded attempt",
                "shortDescription": { "text": "No rubric could grade the attempt" },
            }));
            results.push(json!({
                "ruleId": UNGRADED_RULE,
                "level": "error",
                "message": { "text": format!("[{}] {}", record.category, reason) },
                "locations": [location.clone()]
            }));
        }
    }

    json!({
        "$schema": "https://raw.githubusercontent.com/oasis-tcs/sarif-spec/main/sarif-2.1/schema/sarif-schema-2.1.0.json",
        "version": "2.1.0",
        "runs": [{
            "tool": {
                "driver": {
                    "name": "proctor",
                    "version": env!("CARGO_PKG_VERSION"),
                    "informationUri": "https://github.com/MysterionRise/proctor",
                    "rules": rules
                }
            },
            "results": results,
            "properties": {
                "terminationReason": record.reason,
                "percentage": record.percentage(),
            }
        }]
    })
}

/// Write a SARIF report to a file.
pub fn write_sarif_report(
    record: &AttemptRecord,
    rubric: Option<&Rubric>,
    document_uri: &str,
    path: &Path,
) -> Result<()> {
    let sarif = generate_sarif(record, rubric, document_uri);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(&sarif)?;
    std::fs::write(path, json)
        .with_context(|| format!("failed to write SARIF report to {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proctor_core::evaluator::evaluate;
    use proctor_core::model::TerminationReason;
    use proctor_core::rubric::RubricRegistry;

    #[test]
    fn sarif_structure_valid() {
        let registry = RubricRegistry::builtin().unwrap();
        let rubric = registry.lookup("html").unwrap();
        let doc = "<!DOCTYPE html><html lang=\"en\"></html>";
        let record = AttemptRecord::new(
            "html",
            TerminationReason::UserSubmitted,
            doc,
            Grade::Graded(evaluate(doc, &rubric)),
        );

        let sarif = generate_sarif(&record, Some(&*rubric), "index.html");

        assert_eq!(sarif["version"], "2.1.0");
        assert!(sarif["runs"].is_array());
        assert!(sarif["runs"][0]["tool"]["driver"]["name"] == "proctor");
        assert_eq!(
            sarif["runs"][0]["tool"]["driver"]["rules"]
                .as_array()
                .unwrap()
                .len(),
            rubric.len()
        );

        let results = sarif["runs"][0]["results"].as_array().unwrap();
        let ids: Vec<&str> = results.iter().filter_map(|r| r["ruleId"].as_str()).collect();
        assert!(!ids.contains(&"doctype"));
        assert!(!ids.contains(&"html-lang"));
        assert!(ids.contains(&"unordered-list"));

        let list = results.iter().find(|r| r["ruleId"] == "unordered-list").unwrap();
        assert_eq!(list["level"], "error");
        assert_eq!(
            list["locations"][0]["physicalLocation"]["artifactLocation"]["uri"],
            "index.html"
        );
        assert_eq!(sarif["runs"][0]["properties"]["terminationReason"], "user_submitted");
    }

    #[test]
    fn ungraded_attempt_is_one_error() {
        let record = AttemptRecord::new(
            "css",
            TerminationReason::TimeExpired,
            "",
            Grade::Ungraded {
                reason: "no rubric".into(),
            },
        );
        let sarif = generate_sarif(&record, None, "style.css");
        let results = sarif["runs"][0]["results"].as_array().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["ruleId"], UNGRADED_RULE);
        assert!(sarif["runs"][0]["properties"]["percentage"].is_null());
    }

    #[test]
    fn sarif_write_to_file() {
        let record = AttemptRecord::new(
            "css",
            TerminationReason::TimeExpired,
            "",
            Grade::Ungraded {
                reason: "no rubric".into(),
            },
        );
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("attempt.sarif");
        write_sarif_report(&record, None, "style.css", &path).unwrap();
        let parsed: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed["version"], "2.1.0");
    }
}
