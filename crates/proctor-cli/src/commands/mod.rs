//! Subcommand implementations and the helpers they share.

pub mod categories;
pub mod compare;
pub mod grade;
pub mod init;
pub mod restore;
pub mod session;
pub mod validate;

use std::path::{Path, PathBuf};

use anyhow::Result;
use comfy_table::{Cell, Table};

use proctor_core::report::{AttemptRecord, Grade};
use proctor_core::rubric::{Rubric, RubricRegistry};
use proctor_report::{write_html_report, write_sarif_report};

/// Built-in rubrics, overlaid with `dir` when one is given.
pub(crate) fn load_registry(dir: Option<&Path>) -> Result<RubricRegistry> {
    match dir {
        Some(dir) => RubricRegistry::with_directory(dir),
        None => RubricRegistry::builtin(),
    }
}

/// Expand a `--format` value into individual formats.
pub(crate) fn parse_formats(format: &str) -> Vec<&str> {
    let mut formats: Vec<&str> = Vec::new();
    for fmt in format.split(',').map(str::trim) {
        let expanded: &[&str] = if fmt == "all" {
            &["json", "html", "sarif"]
        } else {
            &[fmt]
        };
        for &f in expanded {
            if !formats.contains(&f) {
                formats.push(f);
            }
        }
    }
    formats
}

/// Write the record in every requested file format under `output`.
///
/// `text` produces no file. Returns the paths written.
pub(crate) fn save_outputs(
    record: &AttemptRecord,
    rubric: Option<&Rubric>,
    document: &Path,
    output: &Path,
    format: &str,
) -> Result<Vec<PathBuf>> {
    let timestamp = record.created_at.format("%Y-%m-%dT%H%M%S");
    let stem = format!("attempt-{}-{timestamp}", record.category);
    let mut written = Vec::new();

    for fmt in parse_formats(format) {
        match fmt {
            "text" => {}
            "json" => {
                let path = output.join(format!("{stem}.json"));
                record.save_json(&path)?;
                eprintln!("Attempt saved to: {}", path.display());
                written.push(path);
            }
            "html" => {
                let path = output.join(format!("{stem}.html"));
                write_html_report(record, rubric, &path)?;
                eprintln!("HTML report: {}", path.display());
                written.push(path);
            }
            "sarif" => {
                let path = output.join(format!("{stem}.sarif"));
                write_sarif_report(record, rubric, &document.to_string_lossy(), &path)?;
                eprintln!("SARIF report: {}", path.display());
                written.push(path);
            }
            _ => {
                eprintln!("Unknown format: {fmt}");
            }
        }
    }

    Ok(written)
}

/// Per-rule table for a finished attempt.
pub(crate) fn outcome_table(record: &AttemptRecord, rubric: Option<&Rubric>) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Rule", "Tier", "Points", "Result", "Description"]);

    match &record.grade {
        Grade::Graded(result) => {
            for outcome in &result.per_rule {
                let description = rubric
                    .and_then(|r| r.rule(&outcome.key))
                    .map(|rule| rule.description())
                    .unwrap_or_default();
                table.add_row(vec![
                    Cell::new(&outcome.key),
                    Cell::new(outcome.tier),
                    Cell::new(if outcome.passed {
                        format!("{}/{}", outcome.points, outcome.points)
                    } else {
                        format!("0/{}", outcome.points)
                    }),
                    Cell::new(if outcome.passed { "PASS" } else { "FAIL" }),
                    Cell::new(description),
                ]);
            }
        }
        Grade::Ungraded { reason } => {
            table.add_row(vec![
                Cell::new("-"),
                Cell::new("-"),
                Cell::new("-"),
                Cell::new("UNGRADED"),
                Cell::new(reason),
            ]);
        }
    }

    table
}
