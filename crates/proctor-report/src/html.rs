//! HTML report generator.
//!
//! Renders one attempt as a single page with inline styles and a small
//! script for hiding passed rules.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result};

use proctor_core::evaluator::{EvaluationResult, TierSummary};
use proctor_core::report::{AttemptRecord, Grade};
use proctor_core::rubric::Rubric;
use proctor_core::session::format_clock;

use crate::rule_description;

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            c => out.push(c),
        }
    }
    out
}

/// Render an attempt record as a standalone HTML page.
///
/// With a rubric, rules show their descriptions and the category's
/// instructions are included; without one, rule keys stand in.
pub fn generate_html(record: &AttemptRecord, rubric: Option<&Rubric>) -> String {
    let title = rubric.map_or(record.category.as_str(), |r| r.category().title.as_str());
    let mut page = String::new();

    // Writing into a String cannot fail.
    let _ = write_page(&mut page, record, rubric, title);
    page
}

fn write_page(
    page: &mut String,
    record: &AttemptRecord,
    rubric: Option<&Rubric>,
    title: &str,
) -> std::fmt::Result {
    writeln!(page, "<!DOCTYPE html>")?;
    writeln!(page, "<html lang=\"en\">")?;
    writeln!(page, "<head>")?;
    writeln!(page, "<meta charset=\"utf-8\">")?;
    writeln!(page, "<title>{} attempt</title>", escape(title))?;
    writeln!(page, "<style>{STYLE}</style>")?;
    writeln!(page, "</head>")?;
    writeln!(page, "<body>")?;

    writeln!(page, "<div class=\"card\">")?;
    writeln!(page, "<h1>{}</h1>", escape(title))?;
    writeln!(
        page,
        "<dl class=\"facts\"><dt>Ended</dt><dd>{}</dd><dt>Time used</dt><dd>{} of {}</dd>\
         <dt>Violations</dt><dd>{}</dd><dt>Recorded</dt><dd>{}</dd></dl>",
        escape(&record.reason.to_string()),
        format_clock(record.elapsed_seconds),
        format_clock(record.budget_seconds),
        record.violation_count,
        record.created_at.format("%Y-%m-%d %H:%M UTC")
    )?;

    match &record.grade {
        Grade::Ungraded { reason } => {
            writeln!(
                page,
                "<p class=\"score none\">Ungraded: {}</p>",
                escape(reason)
            )?;
            writeln!(page, "</div>")?;
        }
        Grade::Graded(result) => {
            write_score(page, result)?;
            writeln!(page, "</div>")?;
            write_rules(page, result, rubric)?;
        }
    }

    if let Some(info) = rubric.map(Rubric::category) {
        if !info.instructions.is_empty() {
            writeln!(page, "<details><summary>Instructions</summary><ol>")?;
            for line in &info.instructions {
                writeln!(page, "<li>{}</li>", escape(line))?;
            }
            writeln!(page, "</ol></details>")?;
        }
    }

    writeln!(page, "<details><summary>Document as graded</summary>")?;
    writeln!(page, "<pre>{}</pre>", escape(&record.document))?;
    writeln!(page, "</details>")?;

    writeln!(page, "<script>{SCRIPT}</script>")?;
    writeln!(page, "</body>")?;
    write!(page, "</html>")
}

fn write_score(page: &mut String, result: &EvaluationResult) -> std::fmt::Result {
    let class = if result.passed { "passed" } else { "failed" };
    writeln!(
        page,
        "<p class=\"score {class}\">{:.1}% <small>{} of {} points, {}</small></p>",
        result.percentage, result.earned_points, result.total_points, class
    )?;

    let tiers = result.tier_summary();
    if !tiers.is_empty() {
        writeln!(page, "<div class=\"tiers\">")?;
        for tier in &tiers {
            write_tier_bar(page, tier)?;
        }
        writeln!(page, "</div>")?;
    }
    Ok(())
}

fn write_tier_bar(page: &mut String, tier: &TierSummary) -> std::fmt::Result {
    let share = if tier.total_points == 0 {
        0.0
    } else {
        f64::from(tier.earned_points) / f64::from(tier.total_points) * 100.0
    };
    writeln!(
        page,
        "<div class=\"tier\"><span>{}</span>\
         <div class=\"track\"><div class=\"fill\" style=\"width: {share:.0}%\"></div></div>\
         <span>{}/{} pts, {}/{} rules</span></div>",
        tier.tier, tier.earned_points, tier.total_points, tier.rules_passed, tier.rules_total
    )
}

fn write_rules(
    page: &mut String,
    result: &EvaluationResult,
    rubric: Option<&Rubric>,
) -> std::fmt::Result {
    writeln!(page, "<h2>Rules</h2>")?;
    writeln!(
        page,
        "<label><input type=\"checkbox\" id=\"only-missing\"> only missing</label>"
    )?;
    writeln!(page, "<table id=\"results\">")?;
    writeln!(
        page,
        "<tr><th>Rule</th><th>Tier</th><th>Requirement</th><th>Points</th><th></th></tr>"
    )?;
    for outcome in &result.per_rule {
        let (class, badge) = if outcome.passed {
            ("met", "met")
        } else {
            ("missing", "missing")
        };
        writeln!(
            page,
            "<tr class=\"{class}\"><td><code>{}</code></td><td>{}</td><td>{}</td>\
             <td>{}</td><td><span class=\"badge\">{badge}</span></td></tr>",
            escape(&outcome.key),
            outcome.tier,
            escape(&rule_description(rubric, &outcome.key)),
            outcome.points
        )?;
    }
    writeln!(page, "</table>")
}

/// Write an HTML report to `path`, creating parent directories.
pub fn write_html_report(
    record: &AttemptRecord,
    rubric: Option<&Rubric>,
    path: &Path,
) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(path, generate_html(record, rubric))
        .with_context(|| format!("failed to write HTML report to {}", path.display()))
}

const STYLE: &str = "
body { font: 15px/1.5 system-ui, sans-serif; max-width: 60rem; margin: 2rem auto; padding: 0 1rem; color: #222; }
.card { border: 1px solid #ddd; border-radius: 6px; padding: 1rem 1.5rem; }
.facts { display: grid; grid-template-columns: max-content 1fr; gap: 0.2rem 1rem; color: #555; }
.facts dt { font-weight: 600; }
.facts dd { margin: 0; }
.score { font-size: 2rem; font-weight: 700; margin: 0.5rem 0; }
.score small { font-size: 0.9rem; font-weight: 400; color: #555; }
.passed { color: #176b32; }
.failed, .none { color: #a12020; }
.tier { display: grid; grid-template-columns: 8rem 1fr 12rem; align-items: center; gap: 0.75rem; margin: 0.3rem 0; }
.track { background: #eee; border-radius: 3px; height: 0.8rem; }
.fill { background: #2f7fd8; border-radius: 3px; height: 100%; }
table { border-collapse: collapse; width: 100%; }
th, td { text-align: left; padding: 0.35rem 0.6rem; border-bottom: 1px solid #eee; }
.badge { border-radius: 3px; padding: 0 0.4rem; font-size: 0.8rem; }
.met .badge { background: #d6f5df; }
.missing .badge { background: #f9d7d7; }
body.only-missing tr.met { display: none; }
pre { background: #f6f6f6; padding: 1rem; overflow-x: auto; }
";

const SCRIPT: &str = "
const toggle = document.getElementById('only-missing');
if (toggle) {
  toggle.addEventListener('change', () => document.body.classList.toggle('only-missing', toggle.checked));
}
";
