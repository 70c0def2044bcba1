//! Resolution of the external 7-Zip executable.
//!
//! Where the binary comes from (an explicit path, `PATH`, or a copy staged
//! into a temp directory by the caller) is decided here, once, before a run
//! touches the filesystem. A staged copy is owned by the [`Archiver`] and
//! removed by [`Archiver::cleanup`] or on drop.

use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::error::InjectError;

/// Executable names searched on `PATH`, in order of preference.
pub const SEVENZIP_CANDIDATES: &[&str] = &["7zz", "7z"];

/// A resolved 7-Zip executable.
#[derive(Debug)]
pub struct Archiver {
    path: PathBuf,
    staging: Option<TempDir>,
}

impl Archiver {
    /// Use the executable at `path` as-is. Nothing is cleaned up afterwards.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            staging: None,
        }
    }

    /// Use an executable that lives inside `staging`, which this archiver
    /// now owns and removes on cleanup.
    ///
    /// This is the entry point for embedders that ship their own 7-Zip build:
    /// write it into a fresh [`TempDir`], hand both over here and pass the
    /// result to [`SevenZipArchive::new`](super::sevenzip::SevenZipArchive::new).
    /// The copy is removed when the strategy is released at the end of a run.
    pub fn staged(staging: TempDir, relative: impl AsRef<Path>) -> Self {
        let path = staging.path().join(relative);
        Self {
            path,
            staging: Some(staging),
        }
    }

    /// Resolve the archiver from an explicit path or by searching `PATH`
    /// for [`SEVENZIP_CANDIDATES`].
    ///
    /// # Errors
    ///
    /// Returns [`InjectError::ArchiverUnavailable`] if the explicit path is
    /// not a file or no candidate is found on `PATH`.
    pub fn locate(explicit: Option<&Path>) -> Result<Self, InjectError> {
        if let Some(path) = explicit {
            if !path.is_file() {
                return Err(InjectError::ArchiverUnavailable {
                    reason: format!("{} is not a file", path.display()),
                });
            }
            return Ok(Self::at(path));
        }

        for name in SEVENZIP_CANDIDATES {
            match which::which(name) {
                Ok(path) => return Ok(Self::at(path)),
                Err(e) => tracing::trace!("{name} not found on PATH: {e}"),
            }
        }

        Err(InjectError::ArchiverUnavailable {
            reason: format!(
                "none of {} found in PATH. Is 7-Zip installed?",
                SEVENZIP_CANDIDATES.join(", ")
            ),
        })
    }

    /// Path of the executable to invoke.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove any staged copy of the executable.
    ///
    /// # Errors
    ///
    /// Returns the I/O error from removing the staging directory.
    pub fn cleanup(self) -> io::Result<()> {
        match self.staging {
            Some(dir) => {
                let path = dir.path().to_path_buf();
                dir.close()?;
                tracing::debug!("Removed staged 7-Zip at {}", path.display());
            }
            None => tracing::debug!("7-Zip was not staged, nothing to clean up"),
        }
        Ok(())
    }
}
