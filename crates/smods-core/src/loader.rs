//! Appending the bundled loader sources to the game's entry script.

use std::fs::OpenOptions;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::error::InjectError;

/// Workspace-relative path of the entry script.
pub const ENTRY_SCRIPT: &str = "main.lua";

/// One Lua file of the loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderSource {
    /// Bundle-relative name, used for reporting.
    pub name: &'static str,
    /// File contents.
    pub contents: &'static str,
}

const EMBEDDED: &[LoaderSource] = &[
    LoaderSource {
        name: "core/core.lua",
        contents: include_str!("../assets/loader/core/core.lua"),
    },
    LoaderSource {
        name: "debug/debug.lua",
        contents: include_str!("../assets/loader/debug/debug.lua"),
    },
    LoaderSource {
        name: "loader/loader.lua",
        contents: include_str!("../assets/loader/loader/loader.lua"),
    },
];

/// Ordered, read-only set of loader sources.
///
/// Order is part of the output: the same bundle always produces the same
/// bytes in the entry script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderBundle {
    sources: &'static [LoaderSource],
}

impl LoaderBundle {
    /// Wrap an ordered list of sources.
    pub const fn new(sources: &'static [LoaderSource]) -> Self {
        Self { sources }
    }

    /// The loader compiled into this binary.
    pub const fn embedded() -> Self {
        Self::new(EMBEDDED)
    }

    /// Sources in append order.
    pub fn sources(&self) -> &[LoaderSource] {
        self.sources
    }
}

impl Default for LoaderBundle {
    fn default() -> Self {
        Self::embedded()
    }
}

/// Append every source in `bundle` to the entry script under `root`, each
/// followed by a single newline. Returns the number of files appended.
///
/// Not idempotent: calling this twice appends the bundle twice.
///
/// # Errors
///
/// Returns [`InjectError::ScriptMissing`] if the entry script does not exist
/// and [`InjectError::ScriptIo`] if writing fails.
pub fn inject_loader_sources(root: &Path, bundle: &LoaderBundle) -> Result<usize, InjectError> {
    let path = root.join(ENTRY_SCRIPT);
    let file = match OpenOptions::new().append(true).open(&path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(InjectError::ScriptMissing { path });
        }
        Err(source) => return Err(InjectError::ScriptIo { path, source }),
    };

    let mut writer = BufWriter::new(file);
    let written = append_all(&mut writer, bundle).and_then(|()| writer.flush());
    if let Err(source) = written {
        return Err(InjectError::ScriptIo { path, source });
    }

    Ok(bundle.sources().len())
}

fn append_all<W: Write>(writer: &mut W, bundle: &LoaderBundle) -> io::Result<()> {
    for source in bundle.sources() {
        tracing::debug!("Appending {} to {ENTRY_SCRIPT}", source.name);
        writer.write_all(source.contents.as_bytes())?;
        writer.write_all(b"\n")?;
    }
    Ok(())
}
