//! Console [`Reporter`] implementation.
//!
//! Progress goes to stderr so stdout only carries the final result line.

use crossterm::style::Stylize;
use smods_core::{Reporter, RunState};

use super::theme::Theme;

/// Plain line-oriented terminal reporter.
#[derive(Debug, Clone, Default)]
pub struct Output {
    verbose: bool,
    theme: Theme,
}

impl Output {
    /// Create an output handle. `verbose` enables per-file and per-state lines.
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            theme: Theme::default(),
        }
    }
}

impl Reporter for Output {
    fn section(&self, title: &str) {
        let icon = self.theme.icons.active.with(self.theme.colors.header);
        eprintln!("{icon} {}", title.bold());
    }

    fn state(&self, state: RunState) {
        if self.verbose {
            let line = format!("{} {state}", self.theme.icons.step);
            eprintln!("  {}", line.with(self.theme.colors.secondary));
        }
    }

    fn detail(&self, msg: &str) {
        if self.verbose {
            eprintln!("    {}", msg.with(self.theme.colors.secondary));
        }
    }

    fn info(&self, msg: &str) {
        eprintln!("{} {msg}", self.theme.icons.info.with(self.theme.colors.info));
    }

    fn success(&self, msg: &str) {
        let color = self.theme.colors.success;
        println!("{} {}", self.theme.icons.success.with(color), msg.with(color));
    }

    fn warning(&self, msg: &str) {
        let color = self.theme.colors.warning;
        eprintln!("{} {}", self.theme.icons.warning.with(color), msg.with(color));
    }

    fn error(&self, msg: &str) {
        let color = self.theme.colors.error;
        eprintln!("{} {}", self.theme.icons.error.with(color), msg.with(color));
    }
}
