//! Package format detection.
//!
//! A Balatro install is either a macOS app bundle (a directory holding a
//! `.love` zip) or a Windows executable with the game archive appended. The
//! format is decided from a single probe of the path and never guessed.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use crate::error::InjectError;

/// Location of the game archive inside a macOS app bundle.
pub const BUNDLE_ARCHIVE: &str = "Contents/Resources/Balatro.love";

/// Number of leading bytes inspected when classifying a file.
pub const SIGNATURE_WINDOW: u64 = 512;

/// DOS/PE executable signature.
const PE_SIGNATURE: &[u8] = b"MZ";

/// Container format of a game install.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageVariant {
    /// Windows executable; readable only through the external archiver.
    WindowsInstaller,
    /// macOS app bundle wrapping a zip archive.
    MacOsBundle,
    /// Not a supported format.
    Unknown,
}

impl std::fmt::Display for PackageVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::WindowsInstaller => "Windows",
            Self::MacOsBundle => "macOS",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// The on-disk artifact being modified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetPackage {
    path: PathBuf,
    variant: PackageVariant,
}

impl TargetPackage {
    /// Pair an already-absolute path with its variant.
    ///
    /// Prefer [`classify`], which probes the filesystem.
    pub fn new(path: impl Into<PathBuf>, variant: PackageVariant) -> Self {
        Self {
            path: path.into(),
            variant,
        }
    }

    /// Absolute path of the package (bundle directory or executable).
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Detected container format.
    pub fn variant(&self) -> PackageVariant {
        self.variant
    }

    /// The zip archive inside a macOS bundle.
    pub fn bundle_archive(&self) -> PathBuf {
        self.path.join(BUNDLE_ARCHIVE)
    }
}

/// Classify `path` into a [`TargetPackage`].
///
/// Directories are bundles if they contain [`BUNDLE_ARCHIVE`]; regular files
/// are classified by the signature in their first [`SIGNATURE_WINDOW`] bytes.
///
/// # Errors
///
/// - [`InjectError::TargetNotFound`] if nothing exists at `path`.
/// - [`InjectError::AmbiguousTarget`] for a directory without the bundle archive.
/// - [`InjectError::UnrecognizedFormat`] for a file with an unknown signature.
/// - [`InjectError::TargetUnreadable`] if the path cannot be inspected.
pub fn classify(path: &Path) -> Result<TargetPackage, InjectError> {
    let path = std::path::absolute(path).map_err(|source| InjectError::TargetUnreadable {
        path: path.to_path_buf(),
        source,
    })?;

    let metadata = match fs::metadata(&path) {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(InjectError::TargetNotFound { path });
        }
        Err(source) => return Err(InjectError::TargetUnreadable { path, source }),
    };

    if metadata.is_dir() {
        if path.join(BUNDLE_ARCHIVE).is_file() {
            tracing::debug!("{} is a macOS bundle", path.display());
            return Ok(TargetPackage::new(path, PackageVariant::MacOsBundle));
        }
        return Err(InjectError::AmbiguousTarget { path });
    }

    let header = match read_header(&path) {
        Ok(h) => h,
        Err(source) => return Err(InjectError::TargetUnreadable { path, source }),
    };

    match detect_signature(&header) {
        PackageVariant::Unknown => Err(InjectError::UnrecognizedFormat { path }),
        variant => {
            tracing::debug!("{} has a {variant} signature", path.display());
            Ok(TargetPackage::new(path, variant))
        }
    }
}

/// Classify a leading byte window by container signature.
pub fn detect_signature(header: &[u8]) -> PackageVariant {
    if header.starts_with(PE_SIGNATURE) {
        PackageVariant::WindowsInstaller
    } else {
        PackageVariant::Unknown
    }
}

fn read_header(path: &Path) -> io::Result<Vec<u8>> {
    let mut header = Vec::new();
    File::open(path)?
        .take(SIGNATURE_WINDOW)
        .read_to_end(&mut header)?;
    Ok(header)
}
