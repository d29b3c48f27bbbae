//! The `proctor compare` command.

use std::path::PathBuf;

use anyhow::Result;

use proctor_core::report::AttemptRecord;

pub fn execute(
    baseline_path: PathBuf,
    current_path: PathBuf,
    fail_on_regression: bool,
    format: String,
) -> Result<()> {
    let baseline = AttemptRecord::load_json(&baseline_path)?;
    let current = AttemptRecord::load_json(&current_path)?;

    let report = current.compare(&baseline);

    match format.as_str() {
        "markdown" | "md" => {
            println!("{}", report.to_markdown());
        }
        "json" => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        _ => {
            let pct =
                |p: Option<f64>| p.map_or_else(|| "ungraded".to_string(), |v| format!("{v:.1}%"));
            print!(
                "Comparison: {} -> {}",
                pct(report.baseline_percentage),
                pct(report.current_percentage)
            );
            match report.delta {
                Some(delta) => println!(" ({delta:+.1}%)"),
                None => println!(),
            }
            println!(
                "{} newly failed, {} newly passed, {} unchanged",
                report.newly_failed.len(),
                report.newly_passed.len(),
                report.unchanged
            );

            if !report.newly_failed.is_empty() {
                println!("\nNewly failed:");
                for key in &report.newly_failed {
                    println!("  {key}");
                }
            }

            if !report.newly_passed.is_empty() {
                println!("\nNewly passed:");
                for key in &report.newly_passed {
                    println!("  {key}");
                }
            }

            if !report.added_rules.is_empty() {
                println!("\n{} added rule(s)", report.added_rules.len());
            }
            if !report.removed_rules.is_empty() {
                println!("{} removed rule(s)", report.removed_rules.len());
            }
        }
    }

    if fail_on_regression && report.has_regressions() {
        std::process::exit(1);
    }

    Ok(())
}
