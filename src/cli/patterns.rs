use action_locator::PatternRegistry;
use anyhow::{Context, Result};
use serde::Serialize;

use super::context::CliContext;
use super::output::print_structured;

#[derive(Serialize)]
struct PatternRow<'a> {
    id: &'a str,
    priority: u8,
    critical: bool,
    texts: &'a [String],
    view_ids: &'a [String],
    descriptions: &'a [String],
}

pub fn cmd_patterns(ctx: &CliContext) -> Result<()> {
    let policy = ctx.load_policy()?;
    let registry =
        PatternRegistry::from_specs(&policy.patterns).context("Invalid pattern catalogue")?;
    let rows: Vec<PatternRow<'_>> = registry
        .iter()
        .map(|pattern| PatternRow {
            id: pattern.id().as_str(),
            priority: pattern.priority(),
            critical: pattern.is_critical(),
            texts: pattern.texts(),
            view_ids: pattern.view_ids(),
            descriptions: pattern.descriptions(),
        })
        .collect();
    if print_structured(ctx.output(), &rows)? {
        return Ok(());
    }

    println!("Target patterns for {} ({}):", policy.host.package, rows.len());
    for row in &rows {
        println!(
            "  [{}] {:<12} {}{}",
            row.priority,
            row.id,
            row.texts.join(" | "),
            if row.critical { "  (critical)" } else { "" }
        );
        if !row.view_ids.is_empty() {
            println!("        ids: {}", row.view_ids.join(", "));
        }
    }
    Ok(())
}
