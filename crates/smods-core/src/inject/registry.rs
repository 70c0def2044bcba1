//! Compiled-in structural patches keyed by game version.

/// Entries as `(version, unified diff)`.
const BUILTIN: &[(&str, &str)] = &[(
    "1.0.1o-FULL",
    include_str!("../../assets/patches/1.0.1o-FULL.patch"),
)];

/// Static map from exact version string to patch text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchRegistry {
    entries: &'static [(&'static str, &'static str)],
}

impl PatchRegistry {
    /// Wrap a list of `(version, patch)` entries.
    pub const fn new(entries: &'static [(&'static str, &'static str)]) -> Self {
        Self { entries }
    }

    /// The patches compiled into this binary.
    pub const fn builtin() -> Self {
        Self::new(BUILTIN)
    }

    /// Patch text for exactly `version`. No normalization or range matching.
    pub fn lookup(&self, version: &str) -> Option<&'static str> {
        self.entries
            .iter()
            .find(|(known, _)| *known == version)
            .map(|(_, patch)| *patch)
    }

    /// Versions with a registered patch.
    pub fn versions(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(version, _)| *version)
    }

    /// `true` if no patches are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for PatchRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
