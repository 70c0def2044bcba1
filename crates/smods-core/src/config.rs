//! Run configuration.
//!
//! A single value built by the caller (usually the CLI from flags and
//! environment) and handed to the [`Injector`](crate::pipeline::Injector).
//! Nothing in the core reads process-global settings.

use std::path::{Path, PathBuf};

use tracing::level_filters::LevelFilter;

/// Environment variable naming an explicit 7-Zip executable.
pub const ARCHIVER_ENV: &str = "SMODS_SEVENZIP";

/// Environment variable naming the parent directory for workspaces.
pub const TEMP_ROOT_ENV: &str = "SMODS_TMPDIR";

/// Environment variable holding the log level directive.
pub const LOG_LEVEL_ENV: &str = "LOG_LEVEL";

/// Settings for one injection run.
#[derive(Debug, Clone)]
pub struct Config {
    /// Most verbose level the caller will display. Only affects how much
    /// detail is reported, never control flow.
    pub log_level: LevelFilter,
    /// Explicit 7-Zip executable. When `None`, `PATH` is searched.
    pub archiver: Option<PathBuf>,
    /// Parent directory for scratch workspaces. When `None`, the system
    /// temp directory is used.
    pub temp_root: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: LevelFilter::INFO,
            archiver: None,
            temp_root: None,
        }
    }
}

impl Config {
    /// Set the reporting verbosity.
    pub fn with_log_level(mut self, level: LevelFilter) -> Self {
        self.log_level = level;
        self
    }

    /// Use a specific 7-Zip executable instead of searching `PATH`.
    pub fn with_archiver(mut self, path: impl Into<PathBuf>) -> Self {
        self.archiver = Some(path.into());
        self
    }

    /// Create workspaces under `dir`.
    pub fn with_temp_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_root = Some(dir.into());
        self
    }

    /// Parent directory for workspaces, if overridden.
    pub fn temp_root(&self) -> Option<&Path> {
        self.temp_root.as_deref()
    }

    /// Whether per-file detail should be reported.
    pub fn verbose(&self) -> bool {
        self.log_level >= LevelFilter::DEBUG
    }
}
