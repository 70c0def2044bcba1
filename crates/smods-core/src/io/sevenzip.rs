//! Windows executables, unpacked and repacked by an external 7-Zip.
//!
//! Invocation contract:
//!
//! ```text
//! <7z> x <package> -o<workspace>
//! <7z> a -tzip <package> <workspace>/*
//! ```
//!
//! Exit code 0 is success. Anything else becomes
//! [`InjectError::ExternalToolError`] carrying the captured stderr.

use std::ffi::OsString;
use std::io;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};

use super::archive::{ArchiveAccess, Workspace};
use super::tool::Archiver;
use crate::error::InjectError;
use crate::platform::TargetPackage;

/// Archive strategy for [`PackageVariant::WindowsInstaller`](crate::platform::PackageVariant::WindowsInstaller).
#[derive(Debug)]
pub struct SevenZipArchive {
    archiver: Archiver,
    temp_root: Option<PathBuf>,
}

impl SevenZipArchive {
    /// Create a strategy driving `archiver`, with workspaces under `temp_root`.
    pub fn new(archiver: Archiver, temp_root: Option<PathBuf>) -> Self {
        Self {
            archiver,
            temp_root,
        }
    }

    fn invoke(&self, args: &[OsString]) -> io::Result<Output> {
        tracing::debug!("Running {} {:?}", self.archiver.path().display(), args);
        Command::new(self.archiver.path())
            .args(args)
            .stdin(Stdio::null())
            .output()
    }

    /// Turn a finished process into a result, keeping stderr on failure.
    fn check(&self, output: &Output) -> Result<(), InjectError> {
        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.trim().is_empty() {
            tracing::trace!("7-Zip output:\n{stdout}");
        }
        if output.status.success() {
            return Ok(());
        }
        Err(InjectError::ExternalToolError {
            tool: self.archiver.path().to_path_buf(),
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

impl ArchiveAccess for SevenZipArchive {
    fn name(&self) -> &'static str {
        "7-zip"
    }

    fn extract(&self, package: &TargetPackage) -> Result<Workspace, InjectError> {
        let failure = |source: io::Error| InjectError::ArchiveExtractionFailure {
            path: package.path().to_path_buf(),
            source: source.into(),
        };

        let workspace = Workspace::create(self.temp_root.as_deref()).map_err(failure)?;

        let mut out_flag = OsString::from("-o");
        out_flag.push(workspace.root());
        let args = [
            OsString::from("x"),
            package.path().as_os_str().to_owned(),
            out_flag,
        ];

        let output = self.invoke(&args).map_err(failure)?;
        // A failed run drops the workspace along with whatever 7-Zip wrote.
        self.check(&output)?;

        tracing::debug!(
            "Extracted {} into {}",
            package.path().display(),
            workspace.root().display()
        );
        Ok(workspace)
    }

    fn repack(&self, workspace: &Workspace, package: &TargetPackage) -> Result<(), InjectError> {
        let args = [
            OsString::from("a"),
            OsString::from("-tzip"),
            package.path().as_os_str().to_owned(),
            workspace.join("*").into_os_string(),
        ];

        let output = self
            .invoke(&args)
            .map_err(|source| InjectError::ArchiveRepackFailure {
                path: package.path().to_path_buf(),
                source: source.into(),
            })?;
        self.check(&output)?;

        tracing::debug!("Repacked {}", package.path().display());
        Ok(())
    }

    fn release(self: Box<Self>) -> io::Result<()> {
        self.archiver.cleanup()
    }
}
