//! The `proctor init` command.

use std::path::Path;

use anyhow::Result;

use proctor_core::rubric::BUILTIN_HTML_RUBRIC;

pub fn execute() -> Result<()> {
    if Path::new("proctor.toml").exists() {
        println!("proctor.toml already exists, skipping.");
    } else {
        std::fs::write("proctor.toml", SAMPLE_CONFIG)?;
        println!("Created proctor.toml");
    }

    std::fs::create_dir_all("rubrics")?;
    let rubric_path = Path::new("rubrics/html.toml");
    if rubric_path.exists() {
        println!("rubrics/html.toml already exists, skipping.");
    } else {
        std::fs::write(rubric_path, BUILTIN_HTML_RUBRIC)?;
        println!("Created rubrics/html.toml");
    }

    println!("\nNext steps:");
    println!("  1. Edit rubrics/html.toml to adjust the rules");
    println!("  2. Run: proctor validate --rubric rubrics");
    println!("  3. Run: proctor session --document index.html");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# proctor configuration

# Rubric files here override the built-in categories with the same id.
rubric_dir = "./rubrics"

# Autosave slot; PROCTOR_STORE_PATH overrides it.
store_path = "./.proctor/attempt.json"

default_category = "html"
default_budget_minutes = 60
output_dir = "./proctor-results"
"#;
