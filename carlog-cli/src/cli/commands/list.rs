use anyhow::Result;
use clap::Args;
use colored::*;

use crate::config::Config;
use crate::excel::values::display_value;
use crate::excel::writer::sorted_for_export;
use crate::records::{Field, KeyYear, Record, next_business_key};
use crate::services::store::RecordStore;

use super::open_store;

/// Columns shown by default
const SUMMARY_FIELDS: &[Field] = &[
    Field::Status,
    Field::Location,
    Field::ReceivedDate,
    Field::Customer,
    Field::ContainmentComplete,
    Field::ProposedCost,
];

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Show every field of each record
    #[arg(long)]
    pub all: bool,
}

pub async fn handle_list_command(args: ListArgs, config: &Config) -> Result<()> {
    let store = open_store(config).await?;
    let records = store.list().await?;

    if records.is_empty() {
        println!("{}", "No records".yellow());
    }

    for record in sorted_for_export(&records) {
        if args.all {
            print_full(record);
        } else {
            print_summary_line(record);
        }
    }

    let next = next_business_key(&records, &KeyYear::current());
    println!();
    println!("{} records, next key {}", records.len(), next.to_string().cyan());
    Ok(())
}

fn cell(record: &Record, field: Field) -> String {
    record
        .get(field.name())
        .map(|v| display_value(v, field.kind()))
        .unwrap_or_default()
}

fn print_summary_line(record: &Record) {
    let cells: Vec<String> = SUMMARY_FIELDS
        .iter()
        .filter_map(|f| {
            let value = cell(record, *f);
            (!value.is_empty()).then(|| format!("{}={}", f.name(), value))
        })
        .collect();
    println!("{:<10} {}", record.business_key.bold(), cells.join("  "));
}

fn print_full(record: &Record) {
    println!("{}", record.business_key.bold());
    for field in Field::ALL.iter().skip(1) {
        let value = cell(record, *field);
        if !value.is_empty() {
            println!("  {:<30} {}", field.label().dimmed(), value);
        }
    }
    println!(
        "  {:<30} {}",
        "Updated".dimmed(),
        record.updated_at.to_rfc3339()
    );
}
