//! The `proctor grade` command.

use std::path::PathBuf;

use anyhow::{Context, Result};

use proctor_core::evaluator::evaluate;
use proctor_core::model::TerminationReason;
use proctor_core::report::{AttemptRecord, Grade};
use proctor_store::load_config_from;

use super::{load_registry, outcome_table, save_outputs};

pub fn execute(
    document_path: PathBuf,
    category: Option<String>,
    rubrics: Option<PathBuf>,
    format: String,
    output: Option<PathBuf>,
    require_pass: bool,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let registry = load_registry(rubrics.as_deref().or(config.rubric_dir.as_deref()))?;
    let category = category.unwrap_or_else(|| config.default_category.clone());
    let rubric = registry.lookup(&category)?;

    let document = std::fs::read_to_string(&document_path)
        .with_context(|| format!("failed to read document: {}", document_path.display()))?;

    let result = evaluate(&document, &rubric);
    let record = AttemptRecord::new(
        rubric.id(),
        TerminationReason::UserSubmitted,
        document,
        Grade::Graded(result),
    );

    println!("{}", outcome_table(&record, Some(&*rubric)));
    if let Some(result) = record.grade.result() {
        for tier in result.tier_summary() {
            println!(
                "  {:<13} {}/{} points ({}/{} rules)",
                tier.tier.to_string(),
                tier.earned_points,
                tier.total_points,
                tier.rules_passed,
                tier.rules_total
            );
        }
    }
    println!("{}", record.summary_line());

    let output = output.unwrap_or(config.output_dir);
    save_outputs(&record, Some(&*rubric), &document_path, &output, &format)?;

    if require_pass && !record.passed() {
        std::process::exit(1);
    }

    Ok(())
}
