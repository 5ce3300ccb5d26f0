use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use colored::*;

use crate::config::Config;
use crate::excel::values::display_value;
use crate::records::{Field, NormalizedRow, kind_of};

use super::{parse_file, print_parse_summary};

#[derive(Args, Debug)]
pub struct PreviewArgs {
    /// Spreadsheet to read (.xlsx or .xls)
    pub file: PathBuf,

    /// Number of rows to show
    #[arg(short, long, default_value_t = 10)]
    pub limit: usize,

    /// Write unrecognized column headers to this CSV file
    #[arg(long, value_name = "PATH")]
    pub unmatched_csv: Option<PathBuf>,
}

pub async fn handle_preview_command(args: PreviewArgs, config: &Config) -> Result<()> {
    let report = parse_file(&args.file, config)?;
    print_parse_summary(&report);

    if report.rows.is_empty() {
        println!("{}", "No rows to import".yellow());
    }

    for (row, source_row) in report
        .rows
        .iter()
        .zip(report.source_rows.iter())
        .take(args.limit)
    {
        println!();
        println!("{}", format!("Row {}", source_row + 1).bold());
        print_row(row);
    }

    if report.rows.len() > args.limit {
        println!();
        println!("... {} more rows", report.rows.len() - args.limit);
    }

    if let Some(path) = &args.unmatched_csv {
        write_unmatched_csv(path, &report.mapping.unmatched)?;
        println!(
            "Wrote {} unmatched headers to {}",
            report.mapping.unmatched.len(),
            path.display().to_string().cyan()
        );
    }

    Ok(())
}

fn print_row(row: &NormalizedRow) {
    for (name, value) in &row.fields {
        let label = Field::from_name(name).map(|f| f.label()).unwrap_or(name.as_str());
        println!(
            "  {:<30} {}",
            label.dimmed(),
            display_value(value, kind_of(name))
        );
    }
}

fn write_unmatched_csv(path: &Path, headers: &[String]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    writer.write_record(["unmatched_header"])?;
    for header in headers {
        writer.write_record([header])?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_unmatched_csv() {
        let path = std::env::temp_dir().join(format!("carlog-unmatched-{}.csv", uuid::Uuid::new_v4()));
        let headers = vec!["Shoe size".to_string(), "Notes, misc".to_string()];

        write_unmatched_csv(&path, &headers).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let read: Vec<String> = reader
            .records()
            .map(|r| r.unwrap()[0].to_string())
            .collect();
        assert_eq!(read, headers);

        std::fs::remove_file(&path).unwrap();
    }
}
