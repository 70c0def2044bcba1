//! smods-core - inject the Steamodded loader into a packaged Balatro
//!
//! # Overview
//!
//! A run takes an installed game package, unpacks it into a scratch
//! workspace, appends the loader sources to `main.lua`, inserts the loader's
//! start call into `game.lua`, and writes the workspace back into the
//! package.
//!
//! # Architecture
//!
//! - **Platform**: [`platform::classify`] decides whether a path is a macOS
//!   app bundle or a Windows executable.
//! - **Archive access**: [`io::ArchiveAccess`] hides the container. Bundles
//!   are zip archives handled in-process; Windows executables go through an
//!   external 7-Zip.
//! - **Injection**: [`inject`] places the start call either by a fingerprint
//!   of `game.lua` or by a version-keyed unified diff.
//! - **Pipeline**: [`pipeline::Injector`] runs the stages in order and always
//!   removes its workspace.
//!
//! ```text
//! $TMPDIR/
//! └── smods-XXXXXX/   # Workspace, removed at the end of every run
//!     ├── main.lua    # Receives the loader
//!     ├── game.lua    # Receives the start call
//!     └── version.jkr # Game version, first line authoritative
//! ```

pub mod config;
pub mod error;
pub mod inject;
pub mod io;
pub mod loader;
pub mod pipeline;
pub mod platform;
pub mod version;

pub mod reporter;

pub use config::Config;
pub use error::InjectError;
pub use inject::InjectionStrategy;
pub use pipeline::{InjectionReport, Injector, RunState};
pub use platform::{PackageVariant, TargetPackage, classify};
pub use reporter::{NullReporter, Reporter};
pub use version::VersionIdentifier;
