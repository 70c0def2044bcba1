//! Inject command

use anyhow::{Context, Result};
use std::path::Path;

use smods_core::{Config, InjectError, Injector, Reporter, classify};

use crate::ui::Output;

/// Inject the mod loader into the game at `path`.
///
/// # Errors
///
/// Returns the pipeline error with the target path as context.
pub fn inject(path: &Path, config: &Config) -> Result<()> {
    let output = Output::new(config.verbose());

    let package = classify(path)?;
    output.info(&format!(
        "Found {} at {}",
        package.variant(),
        package.path().display()
    ));

    let report = match Injector::new(config, &output).run(&package) {
        Ok(report) => report,
        Err(e) => {
            hint(&output, &e);
            return Err(e)
                .with_context(|| format!("failed to inject into {}", package.path().display()));
        }
    };

    if let Some(version) = &report.version {
        tracing::debug!("Game version {version}");
    }
    output.success(&format!(
        "Successfully injected mod loader into {}",
        package.path().display()
    ));
    Ok(())
}

/// Point the user at the likely fix for well-known failures.
fn hint(output: &Output, err: &InjectError) {
    if err.is_already_patched() {
        output.warning("The game seems to be patched already. Verify the game files and try again.");
    } else if err.is_unsupported_version() {
        output.warning("This game version is not supported. Check for a newer release of smods-inject.");
    }
}
