use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use colored::*;

use crate::config::Config;
use crate::excel::writer::{export_file_name, write_records_file};
use crate::services::store::RecordStore;

use super::open_store;

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Output file; defaults to "CAR LOG - Export - <date>.xlsx"
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub async fn handle_export_command(args: ExportArgs, config: &Config) -> Result<()> {
    let store = open_store(config).await?;
    let records = store.list().await?;

    let path = args
        .output
        .unwrap_or_else(|| PathBuf::from(export_file_name(chrono::Local::now().date_naive())));

    write_records_file(&records, &path)?;
    println!(
        "Exported {} records to {}",
        records.len(),
        path.display().to_string().cyan()
    );
    Ok(())
}
