use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use colored::*;
use log::{info, warn};

use crate::config::Config;
use crate::services::reconcile::{ImportSummary, reconcile_rows};
use crate::services::store::{MemoryRecordStore, RecordStore};

use super::{open_store, parse_file, parse_year, print_parse_summary};

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Spreadsheet to import (.xlsx or .xls)
    pub file: PathBuf,

    /// Year prefix for generated keys ("25" or "2025"); defaults to this year
    #[arg(long)]
    pub year: Option<String>,

    /// Reconcile against a copy of the store without writing
    #[arg(long)]
    pub dry_run: bool,
}

pub async fn handle_import_command(args: ImportArgs, config: &Config) -> Result<()> {
    let year = parse_year(args.year.as_deref())?;
    let report = parse_file(&args.file, config)?;
    print_parse_summary(&report);

    if report.rows.is_empty() {
        println!("{}", "Nothing to import".yellow());
        return Ok(());
    }
    if report.is_low_confidence() {
        warn!("Importing from a low-confidence parse; review the warnings above");
    }

    let options = config.reconcile_options(year);
    let cancel = options.cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, finishing in-flight rows");
            cancel.cancel();
        }
    });

    let sqlite = open_store(config).await?;
    let source_rows = report.source_rows;

    let summary = if args.dry_run {
        let copy = MemoryRecordStore::with_records(sqlite.list().await?)?;
        println!("{}", "Dry run: nothing will be written".cyan());
        reconcile_rows(&copy, report.rows, &options).await
    } else {
        reconcile_rows(&sqlite, report.rows, &options).await
    };

    print_summary(&summary, &source_rows);
    Ok(())
}

fn print_summary(summary: &ImportSummary, source_rows: &[usize]) {
    println!();
    println!(
        "{} rows: {} created, {} updated, {} failed",
        summary.total,
        summary.created.to_string().green(),
        summary.updated.to_string().blue(),
        if summary.failed > 0 {
            summary.failed.to_string().red()
        } else {
            summary.failed.to_string().normal()
        }
    );

    for failure in summary.failures() {
        let sheet_row = source_rows
            .get(failure.row_index)
            .map(|r| (r + 1).to_string())
            .unwrap_or_else(|| "?".to_string());
        println!(
            "  {} row {}{}: {}",
            "x".red(),
            sheet_row,
            failure
                .business_key
                .as_deref()
                .map(|k| format!(" ({})", k))
                .unwrap_or_default(),
            failure.error.as_deref().unwrap_or("Unknown error")
        );
    }
}
