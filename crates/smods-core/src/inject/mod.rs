//! Inserting the loader's start call into `game.lua`.
//!
//! Two strategies locate the insertion point:
//!
//! - **Fingerprint lookup**: the MD5 of `game.lua` is looked up in a static
//!   table of known builds, each recording the line and indentation for the
//!   call.
//! - **Structural patch**: the game version from `version.jkr` selects a
//!   unified diff that is applied strictly against its anchor lines.
//!
//! A fingerprint hit always wins; the version marker is only read when the
//! fingerprint is unknown. Both algorithms are pure functions of the script
//! text. The script is written once, atomically, or not at all.

pub mod fingerprint;
pub mod patch;
pub mod registry;

use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

use crate::error::InjectError;
use crate::version::VersionIdentifier;
use fingerprint::{FingerprintTable, InjectionPoint, insert_start_code};
use patch::{PatchError, PatchSet};
use registry::PatchRegistry;

/// Workspace-relative path of the script that receives the start call.
pub const TARGET_SCRIPT: &str = "game.lua";

/// The strategy chosen for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InjectionStrategy {
    /// Insert at a recorded position in a known build.
    FingerprintLookup {
        /// MD5 hex of the script as found.
        fingerprint: String,
        /// Recorded insertion point.
        point: InjectionPoint,
    },
    /// Apply the unified diff registered for a version.
    StructuralPatch {
        /// Primary version token.
        version: String,
        /// Patch text.
        patch: &'static str,
    },
}

impl InjectionStrategy {
    /// Short human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::FingerprintLookup { .. } => "fingerprint lookup",
            Self::StructuralPatch { .. } => "structural patch",
        }
    }
}

impl fmt::Display for InjectionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FingerprintLookup { fingerprint, point } => write!(
                f,
                "{} ({fingerprint}, line {})",
                self.name(),
                point.line
            ),
            Self::StructuralPatch { version, .. } => write!(f, "{} ({version})", self.name()),
        }
    }
}

/// The data both strategies draw from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InjectionTargets {
    /// Known builds by fingerprint.
    pub fingerprints: FingerprintTable,
    /// Known versions by patch.
    pub patches: PatchRegistry,
}

impl InjectionTargets {
    /// Everything compiled into this binary.
    pub const fn builtin() -> Self {
        Self {
            fingerprints: FingerprintTable::builtin(),
            patches: PatchRegistry::builtin(),
        }
    }

    /// Pick a strategy for `content`.
    ///
    /// `version` is only called on a fingerprint miss with at least one
    /// registered patch.
    ///
    /// # Errors
    ///
    /// - [`InjectError::InjectionPointUnknown`] on a fingerprint miss when no
    ///   patches are registered.
    /// - [`InjectError::VersionUnsupported`] when the version has no patch
    ///   (including an empty version marker).
    /// - Whatever `version` returns.
    pub fn select<F>(&self, content: &[u8], version: F) -> Result<InjectionStrategy, InjectError>
    where
        F: FnOnce() -> Result<VersionIdentifier, InjectError>,
    {
        let fingerprint = fingerprint::fingerprint(content);
        if let Some(point) = self.fingerprints.lookup(&fingerprint) {
            tracing::debug!("Known {TARGET_SCRIPT} fingerprint {fingerprint}");
            return Ok(InjectionStrategy::FingerprintLookup { fingerprint, point });
        }
        tracing::debug!("Unknown {TARGET_SCRIPT} fingerprint {fingerprint}");

        if self.patches.is_empty() {
            return Err(InjectError::InjectionPointUnknown { fingerprint });
        }

        let version = version()?;
        let primary = version.primary().unwrap_or_default();
        match self.patches.lookup(primary) {
            Some(patch) => Ok(InjectionStrategy::StructuralPatch {
                version: primary.to_string(),
                patch,
            }),
            None => Err(InjectError::VersionUnsupported {
                version: primary.to_string(),
            }),
        }
    }
}

impl Default for InjectionTargets {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Run `strategy` against the script text.
///
/// # Errors
///
/// - [`InjectError::InjectionPointUnknown`] if a recorded line lies past the
///   end of the script.
/// - [`InjectError::PatchMalformed`] if the patch text does not parse or has
///   nothing for `game.lua`.
/// - [`InjectError::PatchConflict`] if the patch anchors do not match.
pub fn apply_strategy(content: &str, strategy: &InjectionStrategy) -> Result<String, InjectError> {
    match strategy {
        InjectionStrategy::FingerprintLookup { fingerprint, point } => {
            insert_start_code(content, *point).ok_or_else(|| InjectError::InjectionPointUnknown {
                fingerprint: fingerprint.clone(),
            })
        }
        InjectionStrategy::StructuralPatch { version, patch } => {
            let malformed = |reason: String| InjectError::PatchMalformed {
                version: version.clone(),
                reason,
            };

            let set = PatchSet::parse(patch).map_err(|e| malformed(e.to_string()))?;
            let file = set
                .for_file(TARGET_SCRIPT)
                .ok_or_else(|| malformed(format!("no changes for {TARGET_SCRIPT}")))?;

            file.apply(content).map_err(|e| match e {
                PatchError::Conflict { hunk, line } => InjectError::PatchConflict {
                    version: version.clone(),
                    hunk,
                    line,
                },
                PatchError::Malformed { .. } => malformed(e.to_string()),
            })
        }
    }
}

/// Insert the start call into `game.lua` under `root`.
///
/// Returns the strategy that was used. On any error the script is left
/// byte-for-byte unchanged.
///
/// # Errors
///
/// [`InjectError::ScriptMissing`] if the script is absent,
/// [`InjectError::ScriptIo`] if it cannot be read, is not UTF-8, or cannot be
/// written, and anything from [`InjectionTargets::select`] or
/// [`apply_strategy`].
pub fn inject_start_code<F>(
    root: &Path,
    targets: &InjectionTargets,
    version: F,
) -> Result<InjectionStrategy, InjectError>
where
    F: FnOnce() -> Result<VersionIdentifier, InjectError>,
{
    let path = root.join(TARGET_SCRIPT);
    let bytes = match fs::read(&path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(InjectError::ScriptMissing { path });
        }
        Err(source) => return Err(InjectError::ScriptIo { path, source }),
    };

    let strategy = targets.select(&bytes, version)?;

    let content = match String::from_utf8(bytes) {
        Ok(content) => content,
        Err(e) => {
            return Err(InjectError::ScriptIo {
                path,
                source: io::Error::new(io::ErrorKind::InvalidData, e),
            });
        }
    };

    let patched = apply_strategy(&content, &strategy)?;
    crate::io::replace_file(&path, patched.as_bytes())
        .map_err(|source| InjectError::ScriptIo { path, source })?;

    tracing::info!("Inserted start call using {strategy}");
    Ok(strategy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const GAME: &str = "\
function Game:start_up()
    self.SETTINGS = {}
    self.SPEEDFACTOR = 1
    set_profile_progress()
end
";

    const PATCH: &str = "\
--- a/game.lua
+++ b/game.lua
@@ -2,3 +2,4 @@
     self.SETTINGS = {}
     self.SPEEDFACTOR = 1
+    initSteamodded()
     set_profile_progress()
";

    const GAME_MD5: &str = "09b26dd83d671e5d84d65fe313f93391";

    static PATCHES: &[(&str, &str)] = &[("9.9.9-TEST", PATCH)];

    fn patch_only() -> InjectionTargets {
        InjectionTargets {
            fingerprints: FingerprintTable::new(&[]),
            patches: PatchRegistry::new(PATCHES),
        }
    }

    fn version(text: &'static str) -> impl FnOnce() -> Result<VersionIdentifier, InjectError> {
        move || Ok(VersionIdentifier::parse(text))
    }

    #[test]
    fn test_fingerprint_hit_skips_version() {
        static KNOWN: &[(&str, InjectionPoint)] = &[(
            GAME_MD5,
            InjectionPoint {
                line: 4,
                indentation: 4,
            },
        )];
        let targets = InjectionTargets {
            fingerprints: FingerprintTable::new(KNOWN),
            patches: PatchRegistry::new(PATCHES),
        };

        let strategy = targets
            .select(GAME.as_bytes(), || panic!("version must not be read"))
            .unwrap();
        assert_eq!(strategy.name(), "fingerprint lookup");

        let patched = apply_strategy(GAME, &strategy).unwrap();
        assert_eq!(
            patched.lines().nth(3),
            Some("    initSteamodded()"),
        );
        assert_eq!(patched.lines().nth(4), Some("    set_profile_progress()"));
    }

    #[test]
    fn test_fixture_fingerprint() {
        assert_eq!(fingerprint::fingerprint(GAME.as_bytes()), GAME_MD5);
    }

    #[test]
    fn test_patch_selected_by_exact_version() {
        let strategy = patch_only()
            .select(GAME.as_bytes(), version("9.9.9-TEST\n"))
            .unwrap();
        assert_eq!(strategy.name(), "structural patch");

        let err = patch_only()
            .select(GAME.as_bytes(), version("1.2.3\n"))
            .unwrap_err();
        assert!(matches!(err, InjectError::VersionUnsupported { ref version } if version == "1.2.3"));
    }

    #[test]
    fn test_empty_marker_is_unsupported() {
        let err = patch_only().select(GAME.as_bytes(), version("")).unwrap_err();
        assert!(matches!(err, InjectError::VersionUnsupported { ref version } if version.is_empty()));
    }

    #[test]
    fn test_no_patches_means_unknown_injection_point() {
        let targets = InjectionTargets {
            fingerprints: FingerprintTable::new(&[]),
            patches: PatchRegistry::new(&[]),
        };
        let err = targets
            .select(GAME.as_bytes(), || panic!("version must not be read"))
            .unwrap_err();
        assert!(matches!(err, InjectError::InjectionPointUnknown { .. }));
    }

    #[test]
    fn test_version_errors_propagate() {
        let dir = tempdir().unwrap();
        let err = patch_only()
            .select(GAME.as_bytes(), || crate::version::resolve_version(dir.path()))
            .unwrap_err();
        assert!(matches!(err, InjectError::VersionMarkerMissing { .. }));
    }

    #[test]
    fn test_fingerprint_line_past_end_is_unknown() {
        let strategy = InjectionStrategy::FingerprintLookup {
            fingerprint: "ab".repeat(16),
            point: InjectionPoint {
                line: 40,
                indentation: 4,
            },
        };
        let err = apply_strategy(GAME, &strategy).unwrap_err();
        assert!(matches!(err, InjectError::InjectionPointUnknown { .. }));
    }

    #[test]
    fn test_malformed_patch_is_distinct_from_conflict() {
        let strategy = InjectionStrategy::StructuralPatch {
            version: "9.9.9-TEST".to_string(),
            patch: "not a diff\n",
        };
        let err = apply_strategy(GAME, &strategy).unwrap_err();
        assert!(matches!(err, InjectError::PatchMalformed { .. }));
    }

    #[test]
    fn test_inject_writes_once_then_conflicts() {
        let dir = tempdir().unwrap();
        let script = dir.path().join(TARGET_SCRIPT);
        fs::write(&script, GAME).unwrap();

        let strategy = inject_start_code(dir.path(), &patch_only(), version("9.9.9-TEST")).unwrap();
        assert_eq!(strategy.name(), "structural patch");

        let patched = fs::read_to_string(&script).unwrap();
        assert!(patched.contains("    self.SPEEDFACTOR = 1\n    initSteamodded()\n"));

        let err = inject_start_code(dir.path(), &patch_only(), version("9.9.9-TEST")).unwrap_err();
        assert!(err.is_already_patched());
        assert_eq!(fs::read_to_string(&script).unwrap(), patched);
    }

    #[test]
    fn test_failure_leaves_script_unchanged() {
        let dir = tempdir().unwrap();
        let script = dir.path().join(TARGET_SCRIPT);
        fs::write(&script, GAME).unwrap();

        let err = inject_start_code(dir.path(), &patch_only(), version("1.2.3\n")).unwrap_err();
        assert!(err.is_unsupported_version());
        assert_eq!(fs::read(&script).unwrap(), GAME.as_bytes());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_missing_script() {
        let dir = tempdir().unwrap();
        let err = inject_start_code(dir.path(), &InjectionTargets::builtin(), version("")).unwrap_err();
        assert!(matches!(err, InjectError::ScriptMissing { .. }));
    }

    #[test]
    fn test_builtin_patch_against_matching_script() {
        // Just the anchor region the bundled 1.0.1o-FULL patch expects.
        let mut game: String = (1..=202).map(|n| format!("-- line {n}\n")).collect();
        game.push_str(
            "    self.SETTINGS.language = self.SETTINGS.language or 'en-us'\n\
             \x20   boot_timer('prep stage', 'splash prep',1)\n\
             \x20   self:splash_screen()\n\
             \x20   boot_timer('splash prep', 'end',1)\n\
             \n\
             \x20   self.F_NO_SAVING = nil\n",
        );

        let strategy = InjectionTargets::builtin()
            .select(game.as_bytes(), version("1.0.1o-FULL\n"))
            .unwrap();
        let patched = apply_strategy(&game, &strategy).unwrap();
        let lines: Vec<&str> = patched.lines().collect();
        assert_eq!(lines[204], "    self:splash_screen()");
        assert_eq!(lines[205], "    initSteamodded()");
        assert_eq!(lines[206], "    boot_timer('splash prep', 'end',1)");
    }
}
