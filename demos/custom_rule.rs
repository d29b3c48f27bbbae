//! Custom rule example: grading with rules defined in code.
//!
//! Rubric rules are usually written in TOML, but any closure over a parsed
//! document works as a predicate. This example mixes both kinds.
//!
//! ```bash
//! cargo run -p proctor-cli --example custom_rule
//! ```

use proctor_core::checks::{Check, ListKind};
use proctor_core::evaluator::evaluate;
use proctor_core::markup::Document;
use proctor_core::model::{CategoryInfo, Tier};
use proctor_core::rubric::{Rubric, RubricRule};

const PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<body>
  <h1>Recipes</h1>
  <ol><li>Boil water</li><li>Add pasta</li><li>Wait</li></ol>
  <p>Serves two. Takes ten minutes.</p>
</body>
</html>"#;

fn main() -> anyhow::Result<()> {
    let mut category = CategoryInfo::new("recipes");
    category.title = "Recipe Card".to_string();
    category.duration_minutes = 10;

    let rules = vec![
        RubricRule::from_check("doctype", 5, Check::Doctype),
        RubricRule::from_check(
            "steps",
            10,
            Check::ListItems {
                list: ListKind::Ol,
                min_items: 3,
            },
        )
        .with_description("Steps are an ordered list"),
        // A single <h1> per page.
        RubricRule::new("one-heading", 5, |doc: &Document<'_>| {
            doc.elements_named("h1").count() == 1
        })
        .with_tier(Tier::Intermediate)
        .with_description("Exactly one top-level heading"),
        RubricRule::new("serving-size", 5, |doc: &Document<'_>| {
            doc.text().to_lowercase().contains("serves")
        })
        .with_tier(Tier::Advanced)
        .with_description("Mentions the serving size"),
    ];
    let rubric = Rubric::new(category, rules)?;

    let result = evaluate(PAGE, &rubric);
    for outcome in &result.per_rule {
        let rule = rubric.rule(&outcome.key);
        println!(
            "{:<14} {:<13} {}",
            outcome.key,
            outcome.tier.to_string(),
            if outcome.passed { "PASS" } else { "FAIL" }
        );
        if let Some(rule) = rule {
            println!("    {}", rule.description());
        }
    }
    println!(
        "\n{}/{} points ({:.1}%), {}",
        result.earned_points,
        result.total_points,
        result.percentage,
        if result.passed { "passed" } else { "failed" }
    );

    Ok(())
}
