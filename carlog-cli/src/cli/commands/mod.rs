//! Command handlers

mod add;
mod export;
mod import;
mod list;
mod preview;
mod save;

pub use add::{AddArgs, handle_add_command};
pub use export::{ExportArgs, handle_export_command};
pub use import::{ImportArgs, handle_import_command};
pub use list::{ListArgs, handle_list_command};
pub use preview::{PreviewArgs, handle_preview_command};
pub use save::{SaveArgs, handle_save_command};

use std::path::Path;

use anyhow::{Context, Result};
use colored::*;

use crate::config::Config;
use crate::config::repository::open_database;
use crate::excel::{Diagnostic, ParseReport, parse_workbook_bytes, validate_file_name};
use crate::records::KeyYear;
use crate::services::store::SqliteRecordStore;

async fn open_store(config: &Config) -> Result<SqliteRecordStore> {
    let pool = open_database(&config.database_path).await?;
    Ok(SqliteRecordStore::new(pool))
}

/// Read and parse a spreadsheet; rejects non-Excel file names up front
fn parse_file(path: &Path, config: &Config) -> Result<ParseReport> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    if !validate_file_name(&name) {
        anyhow::bail!("Not an Excel file (.xlsx or .xls): {}", path.display());
    }

    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(parse_workbook_bytes(&bytes, &config.target_sheet))
}

fn parse_year(year: Option<&str>) -> Result<KeyYear> {
    match year {
        Some(y) => KeyYear::parse(y).with_context(|| format!("Invalid year '{}'", y)),
        None => Ok(KeyYear::current()),
    }
}

fn print_parse_summary(report: &ParseReport) {
    if let (Some(sheet), Some(row)) = (&report.sheet_name, report.header_row) {
        println!(
            "Sheet {} (headers on row {}): {} rows read, {} dropped, {} columns matched",
            sheet.cyan(),
            row + 1,
            report.total_rows,
            report.dropped_rows,
            report.mapping.matched_count()
        );
    }
    for diagnostic in &report.diagnostics {
        let line = format!("  ! {}", diagnostic);
        match diagnostic {
            Diagnostic::Parse(_) | Diagnostic::DegradedMapping => println!("{}", line.red()),
            _ => println!("{}", line.yellow()),
        }
    }
}
