//! In-process zip access for macOS app bundles.
//!
//! The game lives in `Contents/Resources/Balatro.love`, a plain zip file.
//! Extraction keeps relative paths and unix modes; repacking writes a new
//! archive next to the original and renames it into place.

use std::fs::{self, File};
use std::io::{self, Read, Seek, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

use super::archive::{ArchiveAccess, Workspace};
use crate::error::{BoxError, InjectError};
use crate::platform::TargetPackage;

/// Archive strategy for [`PackageVariant::MacOsBundle`](crate::platform::PackageVariant::MacOsBundle).
#[derive(Debug, Default)]
pub struct BundleArchive {
    temp_root: Option<PathBuf>,
}

impl BundleArchive {
    /// Create a strategy whose workspaces live under `temp_root`.
    pub fn new(temp_root: Option<PathBuf>) -> Self {
        Self { temp_root }
    }
}

impl ArchiveAccess for BundleArchive {
    fn name(&self) -> &'static str {
        "bundle"
    }

    fn extract(&self, package: &TargetPackage) -> Result<Workspace, InjectError> {
        let archive_path = package.bundle_archive();
        let failure = |source: BoxError| InjectError::ArchiveExtractionFailure {
            path: archive_path.clone(),
            source,
        };

        let workspace = Workspace::create(self.temp_root.as_deref()).map_err(|e| failure(e.into()))?;
        let file = File::open(&archive_path).map_err(|e| failure(e.into()))?;
        // On error the workspace is dropped here, which removes it.
        let count = unpack(file, workspace.root()).map_err(failure)?;

        tracing::debug!(
            "Extracted {count} entries from {} into {}",
            archive_path.display(),
            workspace.root().display()
        );
        Ok(workspace)
    }

    fn repack(&self, workspace: &Workspace, package: &TargetPackage) -> Result<(), InjectError> {
        let archive_path = package.bundle_archive();
        let failure = |source: BoxError| InjectError::ArchiveRepackFailure {
            path: archive_path.clone(),
            source,
        };

        let dir = archive_path
            .parent()
            .ok_or_else(|| failure("archive path has no parent directory".into()))?;
        let staged = NamedTempFile::new_in(dir).map_err(|e| failure(e.into()))?;
        let count = pack(workspace.root(), staged.as_file()).map_err(failure)?;
        super::persist_over(staged, &archive_path).map_err(|e| failure(e.into()))?;

        tracing::debug!("Wrote {count} files to {}", archive_path.display());
        Ok(())
    }
}

/// Unpack every entry of a zip stream into `dest`, returning the number of
/// files written.
///
/// Entries whose names would land outside `dest` abort the extraction.
pub fn unpack<R: Read + Seek>(reader: R, dest: &Path) -> Result<usize, BoxError> {
    let mut archive = ZipArchive::new(reader)?;
    let mut count = 0;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let Some(relative) = entry.enclosed_name().map(|p| p.to_path_buf()) else {
            return Err(format!("unsafe path in archive: {}", entry.name()).into());
        };
        let absolute = dest.join(&relative);

        if entry.is_dir() {
            fs::create_dir_all(&absolute)?;
            continue;
        }

        if let Some(parent) = absolute.parent() {
            fs::create_dir_all(parent)?;
        }

        tracing::trace!("Extracting {}", relative.display());
        let mut outfile = File::create(&absolute)?;
        io::copy(&mut entry, &mut outfile)?;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&absolute, fs::Permissions::from_mode(mode & 0o7777))?;
        }

        count += 1;
    }

    Ok(count)
}

/// Write every file and directory under `root` into a zip stream, returning
/// the number of files written.
///
/// Entries are sorted and carry a fixed timestamp so identical trees produce
/// identical archives.
pub fn pack<W: Write + Seek>(root: &Path, writer: W) -> Result<usize, BoxError> {
    let mut zip = ZipWriter::new(writer);
    let mut count = 0;

    for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
        let entry = entry?;
        let name = entry_name(entry.path().strip_prefix(root)?);
        let options = entry_options(&entry)?;

        if entry.file_type().is_dir() {
            zip.add_directory(name, options)?;
            continue;
        }

        zip.start_file(name, options)?;
        let mut file = File::open(entry.path())?;
        io::copy(&mut file, &mut zip)?;
        count += 1;
    }

    zip.finish()?;
    Ok(count)
}

/// Zip entry name for a workspace-relative path (always `/`-separated).
fn entry_name(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg_attr(not(unix), allow(clippy::unnecessary_wraps))]
fn entry_options(entry: &walkdir::DirEntry) -> Result<SimpleFileOptions, BoxError> {
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default());

    #[cfg(unix)]
    let options = {
        use std::os::unix::fs::PermissionsExt;
        let mode = entry.metadata()?.permissions().mode();
        options.unix_permissions(mode & 0o7777)
    };
    #[cfg(not(unix))]
    let _ = entry;

    Ok(options)
}
