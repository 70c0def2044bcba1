//! Archive access contract and the scratch workspace it produces.

use std::fmt::Debug;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use walkdir::WalkDir;

use super::bundle::BundleArchive;
use super::sevenzip::SevenZipArchive;
use super::tool::Archiver;
use crate::config::Config;
use crate::error::InjectError;
use crate::platform::{PackageVariant, TargetPackage};

/// Prefix for every workspace directory created by a run.
pub const WORKSPACE_PREFIX: &str = "smods-";

/// Scratch directory holding an unpacked package for one run.
///
/// Owned by exactly one run. Call [`Workspace::cleanup`] to remove it and
/// observe failures; dropping it removes it silently.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Create a fresh, uniquely named workspace under `parent`, or under the
    /// system temp directory when `parent` is `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn create(parent: Option<&Path>) -> io::Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(WORKSPACE_PREFIX);
        let dir = match parent {
            Some(parent) => builder.tempdir_in(parent)?,
            None => builder.tempdir()?,
        };
        Ok(Self { dir })
    }

    /// Root of the unpacked tree.
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Absolute path of `relative` inside the workspace.
    pub fn join(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.dir.path().join(relative)
    }

    /// Every regular file under the workspace, relative to the root, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the tree cannot be traversed.
    pub fn files(&self) -> Result<Vec<PathBuf>, walkdir::Error> {
        let mut files = Vec::new();
        for entry in WalkDir::new(self.root()).sort_by_file_name() {
            let entry = entry?;
            if entry.file_type().is_file() {
                if let Ok(relative) = entry.path().strip_prefix(self.root()) {
                    files.push(relative.to_path_buf());
                }
            }
        }
        Ok(files)
    }

    /// Remove the workspace from disk.
    ///
    /// # Errors
    ///
    /// Returns [`InjectError::WorkspaceCleanupFailure`] if removal fails.
    pub fn cleanup(self) -> Result<(), InjectError> {
        let path = self.dir.path().to_path_buf();
        self.dir
            .close()
            .map_err(|source| InjectError::WorkspaceCleanupFailure {
                path: path.clone(),
                source,
            })?;
        tracing::debug!("Removed workspace {}", path.display());
        Ok(())
    }
}

/// Unpack a package into a workspace and write a workspace back.
///
/// One implementation exists per [`PackageVariant`]; the pipeline only ever
/// talks to this trait.
pub trait ArchiveAccess: Debug {
    /// Short label for logs.
    fn name(&self) -> &'static str;

    /// Unpack every entry of `package` into a new workspace.
    ///
    /// Either returns a fully populated workspace or fails; a partially
    /// populated directory is removed before the error is returned.
    ///
    /// # Errors
    ///
    /// Returns [`InjectError::ArchiveExtractionFailure`] or
    /// [`InjectError::ExternalToolError`].
    fn extract(&self, package: &TargetPackage) -> Result<Workspace, InjectError>;

    /// Rewrite `package` so it holds every file under `workspace`.
    ///
    /// # Errors
    ///
    /// Returns [`InjectError::ArchiveRepackFailure`] or
    /// [`InjectError::ExternalToolError`].
    fn repack(&self, workspace: &Workspace, package: &TargetPackage) -> Result<(), InjectError>;

    /// Give back anything acquired at construction (e.g. a staged archiver).
    ///
    /// # Errors
    ///
    /// Returns the I/O error from removing acquired resources.
    fn release(self: Box<Self>) -> io::Result<()> {
        Ok(())
    }
}

/// Build the archive strategy for `package`.
///
/// Construction happens before anything on disk is touched; for Windows
/// installers this is where the external archiver is resolved.
///
/// # Errors
///
/// Returns [`InjectError::UnrecognizedFormat`] for [`PackageVariant::Unknown`]
/// and [`InjectError::ArchiverUnavailable`] if 7-Zip cannot be found.
pub fn for_package(
    package: &TargetPackage,
    config: &Config,
) -> Result<Box<dyn ArchiveAccess>, InjectError> {
    let temp_root = config.temp_root.clone();
    match package.variant() {
        PackageVariant::MacOsBundle => Ok(Box::new(BundleArchive::new(temp_root))),
        PackageVariant::WindowsInstaller => {
            let archiver = Archiver::locate(config.archiver.as_deref())?;
            tracing::debug!("Using 7-Zip at {}", archiver.path().display());
            Ok(Box::new(SevenZipArchive::new(archiver, temp_root)))
        }
        PackageVariant::Unknown => Err(InjectError::UnrecognizedFormat {
            path: package.path().to_path_buf(),
        }),
    }
}
