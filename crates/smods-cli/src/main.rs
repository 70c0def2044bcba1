//! smods-inject - inject the Steamodded mod loader into Balatro

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

use smods_cli::Cli;
use smods_cli::cmd;
use smods_core::Config;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level)
        .with_context(|| format!("invalid log level '{}'", cli.log_level))?;
    let log_level = filter.max_level_hint().unwrap_or(LevelFilter::INFO);
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut config = Config::default().with_log_level(log_level);
    if let Some(archiver) = &cli.sevenzip {
        config = config.with_archiver(archiver);
    }
    if let Some(dir) = &cli.tmpdir {
        config = config.with_temp_root(dir);
    }

    match cli.target() {
        Some(path) => cmd::inject::inject(path, &config),
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    }
}
