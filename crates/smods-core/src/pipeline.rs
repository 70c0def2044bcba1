//! The injection run: extract, append the loader, insert the start call,
//! repack, clean up.
//!
//! ```text
//! Created -> Extracted -> LoaderInjected -> TargetPatched -> Repacked -> CleanedUp
//! ```
//!
//! Any error aborts the remaining steps. Whatever happened, the workspace is
//! removed exactly once as the last action and the archive strategy is
//! released after that. Neither failure replaces the run's own error or
//! turns a successful run into a failed one; both are logged and reported as
//! warnings.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::InjectError;
use crate::inject::{InjectionStrategy, InjectionTargets, inject_start_code};
use crate::io::archive::{self, ArchiveAccess, Workspace};
use crate::loader::{LoaderBundle, inject_loader_sources};
use crate::platform::{PackageVariant, TargetPackage};
use crate::reporter::Reporter;
use crate::version::{VersionIdentifier, resolve_version};

/// Progress of a run. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RunState {
    /// The archive strategy exists; nothing on disk has changed.
    Created,
    /// The package is unpacked into a workspace.
    Extracted,
    /// The loader sources are appended to `main.lua`.
    LoaderInjected,
    /// The start call is in `game.lua`.
    TargetPatched,
    /// The package holds the modified files.
    Repacked,
    /// The workspace is gone.
    CleanedUp,
}

impl RunState {
    /// The state that follows this one.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Created => Some(Self::Extracted),
            Self::Extracted => Some(Self::LoaderInjected),
            Self::LoaderInjected => Some(Self::TargetPatched),
            Self::TargetPatched => Some(Self::Repacked),
            Self::Repacked => Some(Self::CleanedUp),
            Self::CleanedUp => None,
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Created => "created",
            Self::Extracted => "extracted",
            Self::LoaderInjected => "loader injected",
            Self::TargetPatched => "target patched",
            Self::Repacked => "repacked",
            Self::CleanedUp => "cleaned up",
        };
        f.write_str(label)
    }
}

/// Summary of a successful run.
#[derive(Debug)]
pub struct InjectionReport {
    /// The package that was modified.
    pub package: PathBuf,
    /// Its container format.
    pub variant: PackageVariant,
    /// Game version, if it had to be read.
    pub version: Option<VersionIdentifier>,
    /// How the start call was placed.
    pub strategy: InjectionStrategy,
    /// Number of loader files appended to `main.lua`.
    pub loader_files: usize,
    /// Last state reached. [`RunState::Repacked`] when cleanup failed.
    pub final_state: RunState,
    /// Workspace removal failure, if any. Never fatal.
    pub cleanup_warning: Option<InjectError>,
}

/// What the modify-and-repack stage produced.
struct Modified {
    version: Option<VersionIdentifier>,
    strategy: InjectionStrategy,
    loader_files: usize,
}

/// Drives one injection run against a package.
pub struct Injector<'a, R: Reporter + ?Sized> {
    config: &'a Config,
    reporter: &'a R,
    targets: InjectionTargets,
    loader: LoaderBundle,
}

impl<R: Reporter + ?Sized> fmt::Debug for Injector<'_, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Injector")
            .field("config", self.config)
            .field("targets", &self.targets)
            .field("loader", &self.loader)
            .finish_non_exhaustive()
    }
}

impl<'a, R: Reporter + ?Sized> Injector<'a, R> {
    /// Create an injector with the compiled-in targets and loader.
    pub fn new(config: &'a Config, reporter: &'a R) -> Self {
        Self {
            config,
            reporter,
            targets: InjectionTargets::builtin(),
            loader: LoaderBundle::embedded(),
        }
    }

    /// Use different fingerprints and patches.
    pub fn with_targets(mut self, targets: InjectionTargets) -> Self {
        self.targets = targets;
        self
    }

    /// Append a different loader.
    pub fn with_loader(mut self, loader: LoaderBundle) -> Self {
        self.loader = loader;
        self
    }

    /// Inject the loader into `package`.
    ///
    /// # Errors
    ///
    /// Returns the first [`InjectError`] raised by any stage. The package is
    /// only rewritten once every in-workspace step has succeeded.
    pub fn run(&self, package: &TargetPackage) -> Result<InjectionReport, InjectError> {
        let archive = archive::for_package(package, self.config)?;
        self.run_with(package, archive)
    }

    /// Like [`Injector::run`] with a caller-supplied archive strategy.
    ///
    /// # Errors
    ///
    /// See [`Injector::run`].
    pub fn run_with(
        &self,
        package: &TargetPackage,
        archive: Box<dyn ArchiveAccess>,
    ) -> Result<InjectionReport, InjectError> {
        tracing::info!(
            "Injecting into {} ({}) via {}",
            package.path().display(),
            package.variant(),
            archive.name()
        );
        let mut state = RunState::Created;

        self.reporter.section("Extracting");
        let workspace = match archive.extract(package) {
            Ok(workspace) => workspace,
            Err(e) => {
                self.release(archive);
                return Err(e);
            }
        };
        self.advance(&mut state);
        self.list_files(&workspace);

        let outcome = self.modify_and_repack(&workspace, package, archive.as_ref(), &mut state);

        let cleanup_warning = match workspace.cleanup() {
            Ok(()) => {
                if outcome.is_ok() {
                    self.advance(&mut state);
                }
                None
            }
            Err(e) => {
                tracing::warn!("{e}");
                self.reporter.warning(&format!("Could not remove workspace: {e}"));
                Some(e)
            }
        };
        self.release(archive);

        let modified = outcome?;
        Ok(InjectionReport {
            package: package.path().to_path_buf(),
            variant: package.variant(),
            version: modified.version,
            strategy: modified.strategy,
            loader_files: modified.loader_files,
            final_state: state,
            cleanup_warning,
        })
    }

    fn modify_and_repack(
        &self,
        workspace: &Workspace,
        package: &TargetPackage,
        archive: &dyn ArchiveAccess,
        state: &mut RunState,
    ) -> Result<Modified, InjectError> {
        self.reporter.section("Injecting loader");
        let loader_files = inject_loader_sources(workspace.root(), &self.loader)?;
        if self.config.verbose() {
            for source in self.loader.sources() {
                self.reporter.detail(&format!("appended {}", source.name));
            }
        }
        self.advance(state);

        self.reporter.section("Patching game.lua");
        let mut version = None;
        let strategy = inject_start_code(workspace.root(), &self.targets, || {
            let resolved = resolve_version(workspace.root())?;
            version = Some(resolved.clone());
            Ok(resolved)
        })?;
        self.reporter.info(&format!("Inserted start call using {strategy}"));
        self.advance(state);

        self.reporter.section("Repacking");
        archive.repack(workspace, package)?;
        self.advance(state);

        Ok(Modified {
            version,
            strategy,
            loader_files,
        })
    }

    fn advance(&self, state: &mut RunState) {
        if let Some(next) = state.next() {
            tracing::debug!("Run state {state} -> {next}");
            *state = next;
            self.reporter.state(next);
        }
    }

    /// Report every unpacked file in verbose mode.
    fn list_files(&self, workspace: &Workspace) {
        if !self.config.verbose() {
            return;
        }
        match workspace.files() {
            Ok(files) => {
                for file in files {
                    self.reporter.detail(&display_relative(&file));
                }
            }
            Err(e) => tracing::warn!("Could not list workspace: {e}"),
        }
    }

    fn release(&self, archive: Box<dyn ArchiveAccess>) {
        let name = archive.name();
        if let Err(e) = archive.release() {
            tracing::warn!("Failed to release {name}: {e}");
            self.reporter.warning(&format!("Could not release {name}: {e}"));
        }
    }
}

fn display_relative(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
