use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::*;

use crate::config::Config;
use crate::excel::values::display_value;
use crate::records::{PatchSet, kind_of};
use crate::services::bulk::save_patches;
use crate::services::store::RecordStore;

use super::open_store;

#[derive(Args, Debug)]
pub struct SaveArgs {
    /// JSON patch set: record id -> { expectedUpdatedAt, changes }
    pub patches: PathBuf,

    /// Show the pending changes without saving
    #[arg(long)]
    pub dry_run: bool,
}

pub async fn handle_save_command(args: SaveArgs, config: &Config) -> Result<()> {
    let content = std::fs::read_to_string(&args.patches)
        .with_context(|| format!("Failed to read {}", args.patches.display()))?;
    let edits: PatchSet = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse patch set {}", args.patches.display()))?;

    if edits.is_empty() {
        println!("{}", "No pending edits".yellow());
        return Ok(());
    }

    let store = open_store(config).await?;
    print_pending(&store, &edits).await?;

    if args.dry_run {
        return Ok(());
    }

    let summary = save_patches(&store, edits.into_patches(), config.max_concurrent_rows).await;

    println!();
    println!("Saved {}/{} records", summary.saved(), summary.results.len());

    let conflicts = summary.conflicts();
    if !conflicts.is_empty() {
        println!(
            "{}",
            format!(
                "{} record(s) were modified by another user; reload and retry:",
                conflicts.len()
            )
            .yellow()
        );
        for conflict in conflicts {
            println!("  {} {}", "~".yellow(), conflict.id);
        }
    }
    for failure in summary.errors() {
        println!(
            "  {} {}: {}",
            "x".red(),
            failure.id,
            failure.error.as_deref().unwrap_or("Unknown error")
        );
    }

    Ok(())
}

/// Show stored -> pending value for every staged field
async fn print_pending(store: &dyn RecordStore, edits: &PatchSet) -> Result<()> {
    for patch in edits.clone().into_patches() {
        let Some(record) = store.get(&patch.id).await? else {
            println!("{} {}", patch.id.red(), "(record not found)".dimmed());
            continue;
        };

        println!("{}", record.business_key.bold());
        for field in patch.changes.keys() {
            let show = |v: Option<&crate::records::FieldValue>| {
                v.map(|v| display_value(v, kind_of(field)))
                    .unwrap_or_else(|| "(blank)".to_string())
            };
            println!(
                "  {}: {} -> {}",
                field,
                show(record.get(field)).dimmed(),
                show(edits.current_value(&record, field)).green()
            );
        }
    }
    Ok(())
}
