use anyhow::Result;
use clap::Args;
use colored::*;

use crate::config::Config;
use crate::services::entry::{add_record, parse_assignments};

use super::{open_store, parse_year};

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Field value as field=value; repeatable (e.g. --set status=Open)
    #[arg(long = "set", value_name = "FIELD=VALUE")]
    pub assignments: Vec<String>,

    /// Year prefix for the new key ("25" or "2025"); defaults to this year
    #[arg(long)]
    pub year: Option<String>,
}

pub async fn handle_add_command(args: AddArgs, config: &Config) -> Result<()> {
    let year = parse_year(args.year.as_deref())?;
    let fields = parse_assignments(&args.assignments)?;

    let store = open_store(config).await?;
    let record = add_record(&store, &year, fields).await?;

    println!(
        "Created {} with {} field(s)",
        record.business_key.green().bold(),
        record.fields.len()
    );
    Ok(())
}
