//! Error taxonomy for the injection pipeline.
//!
//! Every component reports through [`InjectError`]. The variants are grouped
//! by the stage that produces them so callers can give targeted guidance:
//! a [`InjectError::PatchConflict`] usually means the game was already
//! patched, while [`InjectError::VersionUnsupported`] and
//! [`InjectError::InjectionPointUnknown`] mean this build of the tool does not
//! know the game version yet.

use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// Boxed error used as the source of archive failures, which can originate
/// from the filesystem, the zip codec, or directory traversal.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

const UNSUPPORTED_HINT: &str = "unsupported version, check for a newer release of this tool";

/// Errors produced while identifying, unpacking, patching, or repacking a game.
#[derive(Error, Debug)]
pub enum InjectError {
    // -- platform identification --
    /// The target path does not exist.
    #[error("{} does not exist", path.display())]
    TargetNotFound {
        /// Path that was probed.
        path: PathBuf,
    },

    /// The target is a directory that is not a recognisable app bundle.
    #[error(
        "{} is a directory but not a Balatro app bundle. Provide the path to the Balatro executable.",
        path.display()
    )]
    AmbiguousTarget {
        /// Directory that was probed.
        path: PathBuf,
    },

    /// The target file's signature matches no supported container format.
    #[error(
        "could not determine the type of Balatro executable at {}. Ensure you have provided the correct path.",
        path.display()
    )]
    UnrecognizedFormat {
        /// File that was probed.
        path: PathBuf,
    },

    /// The target exists but could not be inspected.
    #[error("failed to read {}", path.display())]
    TargetUnreadable {
        /// Path that was probed.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    // -- archive access --
    /// Unpacking the package failed; no workspace was produced.
    #[error("failed to extract {}", path.display())]
    ArchiveExtractionFailure {
        /// Archive being extracted.
        path: PathBuf,
        /// Underlying failure.
        #[source]
        source: BoxError,
    },

    /// Writing the workspace back into the package failed.
    #[error("failed to repack {}", path.display())]
    ArchiveRepackFailure {
        /// Archive being written.
        path: PathBuf,
        /// Underlying failure.
        #[source]
        source: BoxError,
    },

    /// The external archiver ran but exited unsuccessfully.
    #[error("{} failed ({status}): {}", tool.display(), stderr.trim())]
    ExternalToolError {
        /// Executable that was invoked.
        tool: PathBuf,
        /// Exit status reported by the process.
        status: ExitStatus,
        /// Captured standard error.
        stderr: String,
    },

    /// No usable external archiver could be resolved.
    #[error("7-Zip is not available: {reason}")]
    ArchiverUnavailable {
        /// Why resolution failed.
        reason: String,
    },

    // -- version resolution --
    /// The workspace has no version marker file.
    #[error("version marker {} is missing", path.display())]
    VersionMarkerMissing {
        /// Expected marker location.
        path: PathBuf,
    },

    /// The version marker exists but could not be read.
    #[error("failed to read version marker {}", path.display())]
    VersionMarkerUnreadable {
        /// Marker location.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    // -- script modification --
    /// A script the pipeline needs to modify is absent from the workspace.
    #[error("{} not found in the extracted game", path.display())]
    ScriptMissing {
        /// Expected script location.
        path: PathBuf,
    },

    /// Reading or writing a workspace script failed.
    #[error("failed to update {}", path.display())]
    ScriptIo {
        /// Script location.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    // -- injection targeting --
    /// The target script's fingerprint has no known injection point.
    #[error(
        "no injection point is known for game.lua with fingerprint {fingerprint}: {}",
        UNSUPPORTED_HINT
    )]
    InjectionPointUnknown {
        /// MD5 hex digest of the target script.
        fingerprint: String,
    },

    /// No patch is registered for the detected game version.
    #[error(
        "no patch is available for Balatro version {}: {}",
        display_version(version),
        UNSUPPORTED_HINT
    )]
    VersionUnsupported {
        /// Primary version token (empty if the marker was empty).
        version: String,
    },

    /// The patch's anchor context does not match the target script.
    #[error(
        "failed to inject the Steamodded start code for version {version} (hunk {hunk} does not match at line {line}). Is this game already patched?"
    )]
    PatchConflict {
        /// Version whose patch was applied.
        version: String,
        /// 1-based index of the failing hunk.
        hunk: usize,
        /// 1-based line in the target script where matching failed.
        line: usize,
    },

    /// The registered patch for a version could not be parsed.
    #[error("patch for Balatro version {version} is malformed: {reason}")]
    PatchMalformed {
        /// Version whose patch was parsed.
        version: String,
        /// Parser diagnostic.
        reason: String,
    },

    // -- lifecycle --
    /// Removing the scratch workspace failed. Never fatal to a run.
    #[error("failed to remove workspace {}", path.display())]
    WorkspaceCleanupFailure {
        /// Workspace location.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
}

impl InjectError {
    /// Returns `true` when the failure most likely means the game already
    /// carries the loader.
    pub fn is_already_patched(&self) -> bool {
        matches!(self, Self::PatchConflict { .. })
    }

    /// Returns `true` when the failure means this build does not know the
    /// game version.
    pub fn is_unsupported_version(&self) -> bool {
        matches!(
            self,
            Self::VersionUnsupported { .. } | Self::InjectionPointUnknown { .. }
        )
    }
}

fn display_version(version: &str) -> &str {
    if version.is_empty() { "<empty>" } else { version }
}
