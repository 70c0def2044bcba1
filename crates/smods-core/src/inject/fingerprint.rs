//! Fingerprint-keyed injection points.
//!
//! Each known `game.lua` is identified by the MD5 of its contents. The table
//! records where the start call goes for that exact file.

use md5::{Digest, Md5};

/// The call that boots the loader.
pub const START_CODE: &str = "initSteamodded()";

/// Where to insert the start call in a known script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InjectionPoint {
    /// 1-based line the start call is inserted before.
    pub line: usize,
    /// Number of leading spaces on the inserted line.
    pub indentation: usize,
}

const BUILTIN: &[(&str, InjectionPoint)] = &[(
    "cc95a80eef5ae01641621abdb670771d",
    InjectionPoint {
        line: 206,
        indentation: 4,
    },
)];

/// Static map from fingerprint to injection point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FingerprintTable {
    entries: &'static [(&'static str, InjectionPoint)],
}

impl FingerprintTable {
    /// Wrap a list of `(md5 hex, point)` entries. Fingerprints must be unique.
    pub const fn new(entries: &'static [(&'static str, InjectionPoint)]) -> Self {
        Self { entries }
    }

    /// The table compiled into this binary.
    pub const fn builtin() -> Self {
        Self::new(BUILTIN)
    }

    /// Injection point recorded for `fingerprint` (lowercase hex).
    pub fn lookup(&self, fingerprint: &str) -> Option<InjectionPoint> {
        self.entries
            .iter()
            .find(|(known, _)| *known == fingerprint)
            .map(|(_, point)| *point)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` if the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Lowercase hex MD5 of `content`.
pub fn fingerprint(content: &[u8]) -> String {
    hex::encode(Md5::digest(content))
}

/// Insert the start call as a new line before `point.line`.
///
/// The original line at that position moves down by one. All other bytes are
/// kept as they are, and the new line takes the line ending used by its
/// neighbours. Returns `None` if the line lies past the end of the script
/// (one past the last line is allowed and appends).
pub fn insert_start_code(content: &str, point: InjectionPoint) -> Option<String> {
    let lines: Vec<&str> = content.split_inclusive('\n').collect();
    let index = point.line.checked_sub(1)?;
    if index > lines.len() {
        return None;
    }

    let (before, after) = lines.split_at(index);
    let ending = after
        .iter()
        .chain(before.iter().rev())
        .find_map(|line| line_ending(line))
        .unwrap_or("\n");
    let start_line = format!("{}{START_CODE}", " ".repeat(point.indentation));

    let split = before.iter().map(|line| line.len()).sum::<usize>();
    let mut out = String::with_capacity(content.len() + start_line.len() + 2 * ending.len());
    out.push_str(&content[..split]);
    if !out.is_empty() && line_ending(&out).is_none() {
        out.push_str(ending);
    }
    out.push_str(&start_line);
    // Appending after an unterminated last line keeps the file unterminated.
    if !after.is_empty() || content.is_empty() || content.ends_with('\n') {
        out.push_str(ending);
    }
    out.push_str(&content[split..]);
    Some(out)
}

fn line_ending(line: &str) -> Option<&'static str> {
    if line.ends_with("\r\n") {
        Some("\r\n")
    } else if line.ends_with('\n') {
        Some("\n")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn numbered(count: usize) -> String {
        (1..=count).map(|n| format!("line {n}\n")).collect()
    }

    #[test]
    fn test_md5_hex() {
        assert_eq!(fingerprint(b""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(fingerprint(b"abc"), "900150983cd24fb0d6963f7d28e17f72");
    }

    #[test]
    fn test_builtin_lookup() {
        let table = FingerprintTable::builtin();
        assert_eq!(
            table.lookup("cc95a80eef5ae01641621abdb670771d"),
            Some(InjectionPoint {
                line: 206,
                indentation: 4
            })
        );
        assert_eq!(table.lookup("d41d8cd98f00b204e9800998ecf8427e"), None);
    }

    #[test]
    fn test_builtin_fingerprints_are_unique() {
        let table = FingerprintTable::builtin();
        let unique: HashSet<_> = table.entries.iter().map(|(fp, _)| *fp).collect();
        assert_eq!(unique.len(), table.len());
    }

    #[test]
    fn test_insert_shifts_original_line_down() {
        let content = numbered(300);
        let point = InjectionPoint {
            line: 206,
            indentation: 4,
        };

        let patched = insert_start_code(&content, point).unwrap();
        let lines: Vec<&str> = patched.lines().collect();

        assert_eq!(lines.len(), 301);
        assert_eq!(lines[204], "line 205");
        assert_eq!(lines[205], "    initSteamodded()");
        assert_eq!(lines[206], "line 206");
        assert_eq!(lines[300], "line 300");
    }

    #[test]
    fn test_insert_at_first_and_past_last_line() {
        let content = "a\nb\n";
        let first = insert_start_code(content, InjectionPoint { line: 1, indentation: 0 }).unwrap();
        assert_eq!(first, "initSteamodded()\na\nb\n");

        let end = insert_start_code(content, InjectionPoint { line: 3, indentation: 2 }).unwrap();
        assert_eq!(end, "a\nb\n  initSteamodded()\n");
    }

    #[test]
    fn test_insert_keeps_crlf_endings() {
        let point = InjectionPoint { line: 2, indentation: 4 };
        let patched = insert_start_code("a\r\nb\r\nc", point).unwrap();
        assert_eq!(patched, "a\r\n    initSteamodded()\r\nb\r\nc");

        let end = insert_start_code("a\r\nb\r\n", InjectionPoint { line: 3, indentation: 0 }).unwrap();
        assert_eq!(end, "a\r\nb\r\ninitSteamodded()\r\n");
    }

    #[test]
    fn test_insert_keeps_missing_final_newline() {
        let before_last = insert_start_code("a\nb", InjectionPoint { line: 2, indentation: 0 }).unwrap();
        assert_eq!(before_last, "a\ninitSteamodded()\nb");

        let after_last = insert_start_code("a\r\nb", InjectionPoint { line: 3, indentation: 0 }).unwrap();
        assert_eq!(after_last, "a\r\nb\r\ninitSteamodded()");
    }

    #[test]
    fn test_insert_into_empty_script() {
        let patched = insert_start_code("", InjectionPoint { line: 1, indentation: 0 }).unwrap();
        assert_eq!(patched, "initSteamodded()\n");
    }

    #[test]
    fn test_out_of_range_lines_are_rejected() {
        let content = "a\nb\n";
        assert!(insert_start_code(content, InjectionPoint { line: 0, indentation: 0 }).is_none());
        assert!(insert_start_code(content, InjectionPoint { line: 4, indentation: 0 }).is_none());
    }
}
