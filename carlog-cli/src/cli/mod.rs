//! Command-line interface

pub mod commands;

use clap::{Parser, Subcommand};

use commands::{AddArgs, ExportArgs, ImportArgs, ListArgs, PreviewArgs, SaveArgs};

#[derive(Parser, Debug)]
#[command(name = "carlog", version, about = "Corrective-action log import, reconciliation and export")]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Parse a spreadsheet and show what an import would read
    Preview(PreviewArgs),
    /// Import a spreadsheet into the record store
    Import(ImportArgs),
    /// Export all records to a spreadsheet
    Export(ExportArgs),
    /// Save a file of pending field edits
    Save(SaveArgs),
    /// Add a record with the next business key
    Add(AddArgs),
    /// List stored records
    List(ListArgs),
}
