//! The `proctor categories` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use proctor_store::load_config_from;

use super::load_registry;

pub fn execute(rubrics: Option<PathBuf>, config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let registry = load_registry(rubrics.as_deref().or(config.rubric_dir.as_deref()))?;

    if registry.is_empty() {
        println!("No categories available.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Category", "Title", "Rules", "Points", "Duration"]);

    for rubric in registry.iter() {
        let info = rubric.category();
        table.add_row(vec![
            Cell::new(&info.id),
            Cell::new(&info.title),
            Cell::new(rubric.len()),
            Cell::new(rubric.total_points()),
            Cell::new(format!("{} min", info.duration_minutes)),
        ]);
    }

    println!("{table}");
    Ok(())
}
