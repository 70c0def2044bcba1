//! Game version detection from the extracted workspace.

use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

use crate::error::InjectError;

/// Workspace-relative path of the version marker.
pub const VERSION_MARKER: &str = "version.jkr";

/// Version tokens read from the marker, first entry authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VersionIdentifier(Vec<String>);

impl VersionIdentifier {
    /// Parse marker text: one token per line, surrounding whitespace
    /// trimmed, blank lines skipped.
    pub fn parse(text: &str) -> Self {
        Self(
            text.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(ToOwned::to_owned)
                .collect(),
        )
    }

    /// The authoritative version, if the marker had any tokens.
    pub fn primary(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    /// All tokens in file order.
    pub fn tokens(&self) -> &[String] {
        &self.0
    }

    /// `true` when the marker held no tokens.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for VersionIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.primary().unwrap_or("<empty>"))
    }
}

/// Read the version marker from the workspace rooted at `root`.
///
/// # Errors
///
/// Returns [`InjectError::VersionMarkerMissing`] if the marker is absent and
/// [`InjectError::VersionMarkerUnreadable`] for any other I/O failure
/// (including non-UTF-8 contents).
pub fn resolve_version(root: &Path) -> Result<VersionIdentifier, InjectError> {
    let path = root.join(VERSION_MARKER);
    match fs::read_to_string(&path) {
        Ok(text) => {
            let version = VersionIdentifier::parse(&text);
            tracing::debug!("Detected game version {version} ({} tokens)", version.tokens().len());
            Ok(version)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            Err(InjectError::VersionMarkerMissing { path })
        }
        Err(source) => Err(InjectError::VersionMarkerUnreadable { path, source }),
    }
}
