//! IO modules - everything that touches the disk or spawns 7-Zip

pub mod archive;
pub mod bundle;
pub mod sevenzip;
pub mod tool;

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;

pub use archive::{ArchiveAccess, Workspace};

/// Replace `path` with `contents` in one step.
///
/// The data is written to a sibling temp file which is then renamed over
/// the original, so readers see either the old or the new file and a failed
/// write leaves the original untouched. Permissions of the original are kept.
pub(crate) fn replace_file(path: &Path, contents: &[u8]) -> io::Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no parent"))?;

    let mut staged = NamedTempFile::new_in(dir)?;
    staged.write_all(contents)?;
    staged.as_file().sync_all()?;
    persist_over(staged, path)
}

/// Rename a staged temp file over `path`, carrying over the original's
/// permissions when it exists.
pub(crate) fn persist_over(staged: NamedTempFile, path: &Path) -> io::Result<()> {
    if let Ok(metadata) = fs::metadata(path) {
        fs::set_permissions(staged.path(), metadata.permissions())?;
    }
    staged.persist(path).map_err(|e| e.error)?;
    Ok(())
}
