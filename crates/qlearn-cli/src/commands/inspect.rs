//! Inspect a stored policy table

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use serde_json::Value;

use qlearn::persistence;

#[derive(Args)]
pub struct InspectArgs {
    /// Agent name (the table is read from `<dir>/<name>.agent`)
    #[arg(short, long)]
    pub name: String,

    /// Maximum number of states to print
    #[arg(short, long, default_value = "20")]
    pub limit: usize,
}

pub async fn run(args: InspectArgs, dir: &Path) -> Result<()> {
    let table = persistence::read_table::<Value>(dir, &args.name)
        .await
        .with_context(|| format!("Failed to read table for agent {}", args.name))?;

    let Some(table) = table else {
        println!(
            "No stored table for agent {} in {}",
            args.name,
            dir.display()
        );
        return Ok(());
    };

    println!("Agent: {}", args.name);
    println!("Known states: {}\n", table.len());
    println!("{:<40} {:<16} {:>10}", "STATE", "ACTION", "VALUE");
    println!("{}", "-".repeat(68));

    for (hash, row) in table.rows().take(args.limit) {
        for (i, entry) in row.iter().enumerate() {
            let state = if i == 0 { truncate(hash, 40) } else { String::new() };
            println!(
                "{:<40} {:<16} {:>10.4}",
                state,
                truncate(&entry.action.to_string(), 16),
                entry.value
            );
        }
    }

    if table.len() > args.limit {
        println!("\n... {} more states", table.len() - args.limit);
    }

    Ok(())
}

/// Truncate at character boundaries, marking the cut with "..."
fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{kept}...")
}
