//! The `proctor validate` command.

use std::path::PathBuf;

use anyhow::Result;

use proctor_core::parser;

pub fn execute(rubric_path: PathBuf) -> Result<()> {
    let rubrics = if rubric_path.is_dir() {
        parser::load_rubric_directory(&rubric_path)?
    } else {
        vec![parser::parse_rubric(&rubric_path)?]
    };

    if rubrics.is_empty() {
        println!("No rubrics found in {}.", rubric_path.display());
        return Ok(());
    }

    let mut total_warnings = 0;

    for rubric in &rubrics {
        println!(
            "Rubric: {} [{}] ({} rules, {} points)",
            rubric.category().title,
            rubric.id(),
            rubric.len(),
            rubric.total_points()
        );

        let warnings = parser::validate_rubric(rubric);
        for w in &warnings {
            let prefix = w
                .rule_key
                .as_ref()
                .map(|key| format!("  [{key}]"))
                .unwrap_or_else(|| "  ".to_string());
            println!("{prefix} WARNING: {}", w.message);
        }
        total_warnings += warnings.len();
    }

    if total_warnings == 0 {
        println!("All rubrics valid.");
    } else {
        println!("\n{total_warnings} warning(s) found.");
    }

    Ok(())
}
