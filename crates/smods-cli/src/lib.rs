//! smods-inject - inject the Steamodded mod loader into Balatro
//!
//! Command-line front end for [`smods_core`]. Parses arguments, builds the
//! run [`Config`](smods_core::Config) from flags and environment, and renders
//! progress on the terminal.

pub mod cmd;
pub mod ui;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Inject the Steamodded mod loader into Balatro
#[derive(Debug, Parser)]
#[command(name = "smods-inject")]
#[command(author, version)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    /// Log filter (e.g. `info`, `debug`, `smods_core=trace`)
    #[arg(long, global = true, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Path to the 7-Zip executable used for Windows builds
    #[arg(long, global = true, env = "SMODS_SEVENZIP")]
    pub sevenzip: Option<PathBuf>,

    /// Directory for scratch workspaces
    #[arg(long, global = true, env = "SMODS_TMPDIR", hide = true)]
    pub tmpdir: Option<PathBuf>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Game to inject into (shorthand for `inject <PATH>`)
    pub path: Option<PathBuf>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Inject the mod loader into a game
    #[command(visible_alias = "i")]
    Inject {
        /// Balatro.app bundle or Balatro.exe
        path: PathBuf,
    },
}

impl Cli {
    /// The game path to inject into, from either the subcommand or the
    /// positional shorthand.
    pub fn target(&self) -> Option<&PathBuf> {
        match &self.command {
            Some(Commands::Inject { path }) => Some(path),
            None => self.path.as_ref(),
        }
    }
}
