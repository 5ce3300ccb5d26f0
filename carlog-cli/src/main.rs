mod cli;
mod config;
mod excel;
mod records;
mod services;

use anyhow::Result;
use clap::Parser;

use cli::commands::{
    handle_add_command, handle_export_command, handle_import_command, handle_list_command,
    handle_preview_command, handle_save_command,
};
use cli::{Cli, Commands};
use config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = Config::load()?;

    let default_level = if cli.verbose {
        "debug"
    } else {
        config.log_level.as_str()
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    if cli.no_color {
        colored::control::set_override(false);
    }

    match cli.command {
        Commands::Preview(args) => handle_preview_command(args, &config).await,
        Commands::Import(args) => handle_import_command(args, &config).await,
        Commands::Export(args) => handle_export_command(args, &config).await,
        Commands::Save(args) => handle_save_command(args, &config).await,
        Commands::Add(args) => handle_add_command(args, &config).await,
        Commands::List(args) => handle_list_command(args, &config).await,
    }
}
