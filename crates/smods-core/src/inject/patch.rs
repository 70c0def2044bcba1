//! Unified diff parsing and strict application.
//!
//! Only what the bundled patches need is supported: `diff --git` / `---` /
//! `+++` file headers, `@@` hunks, and `\ No newline at end of file` markers.
//! Application is strict. Every context and removed line must match the
//! target byte-for-byte at the position the hunk header states; there is no
//! fuzz and no offset search. A mismatch is a [`PatchError::Conflict`].

use std::str::FromStr;

use thiserror::Error;

/// Failure to parse or apply a patch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatchError {
    /// The patch text is not a well-formed unified diff.
    #[error("line {line}: {reason}")]
    Malformed {
        /// 1-based line in the patch text.
        line: usize,
        /// What was wrong.
        reason: String,
    },

    /// The target does not contain the hunk's expected lines.
    #[error("hunk {hunk} does not match the target at line {line}")]
    Conflict {
        /// 1-based hunk index within the file patch.
        hunk: usize,
        /// 1-based line in the target where matching failed.
        line: usize,
    },
}

/// One line of a hunk body. The text keeps its line terminator unless the
/// patch marks it as having none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HunkLine {
    /// Present in both old and new content.
    Context(String),
    /// Present only in the old content.
    Remove(String),
    /// Present only in the new content.
    Add(String),
}

impl HunkLine {
    fn text_mut(&mut self) -> &mut String {
        match self {
            Self::Context(t) | Self::Remove(t) | Self::Add(t) => t,
        }
    }
}

/// A contiguous edit anchored at a line range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    /// 1-based first old line (or the line after which to insert when
    /// `old_len` is 0).
    pub old_start: usize,
    /// Number of old lines covered.
    pub old_len: usize,
    /// 1-based first new line.
    pub new_start: usize,
    /// Number of new lines produced.
    pub new_len: usize,
    /// Body lines in order.
    pub lines: Vec<HunkLine>,
}

/// All hunks for a single file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilePatch {
    /// Path from the `---` header with any `a/` prefix removed.
    pub old_path: Option<String>,
    /// Path from the `+++` header with any `b/` prefix removed.
    pub new_path: Option<String>,
    /// Hunks in file order.
    pub hunks: Vec<Hunk>,
}

impl FilePatch {
    /// `true` if either header names `file`.
    pub fn targets(&self, file: &str) -> bool {
        self.old_path.as_deref() == Some(file) || self.new_path.as_deref() == Some(file)
    }

    /// Apply every hunk to `content`.
    ///
    /// # Errors
    ///
    /// Returns [`PatchError::Conflict`] at the first line that does not match.
    pub fn apply(&self, content: &str) -> Result<String, PatchError> {
        let source: Vec<&str> = content.split_inclusive('\n').collect();
        let mut out = String::with_capacity(content.len());
        let mut cursor = 0;

        for (index, hunk) in self.hunks.iter().enumerate() {
            let conflict = |line: usize| PatchError::Conflict {
                hunk: index + 1,
                line,
            };

            // A pure insertion names the line it follows; anything else names
            // its own first line.
            let start = if hunk.old_len == 0 {
                hunk.old_start
            } else {
                hunk.old_start.saturating_sub(1)
            };
            if start < cursor || start > source.len() {
                return Err(conflict(hunk.old_start));
            }

            source[cursor..start].iter().for_each(|l| out.push_str(l));
            let mut pos = start;

            for line in &hunk.lines {
                match line {
                    HunkLine::Context(text) | HunkLine::Remove(text) => {
                        if source.get(pos).copied() != Some(text.as_str()) {
                            return Err(conflict(pos + 1));
                        }
                        if let HunkLine::Context(_) = line {
                            out.push_str(text);
                        }
                        pos += 1;
                    }
                    HunkLine::Add(text) => out.push_str(text),
                }
            }
            cursor = pos;
        }

        source[cursor..].iter().for_each(|l| out.push_str(l));
        Ok(out)
    }
}

/// A parsed unified diff, possibly touching several files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchSet {
    files: Vec<FilePatch>,
}

impl PatchSet {
    /// Parse unified diff text.
    ///
    /// # Errors
    ///
    /// Returns [`PatchError::Malformed`] for bad hunk headers, hunk bodies
    /// that do not match their header counts, or a patch with no hunks.
    pub fn parse(text: &str) -> Result<Self, PatchError> {
        Parser::new(text).parse()
    }

    /// File patches in document order.
    pub fn files(&self) -> &[FilePatch] {
        &self.files
    }

    /// The file patch for `file`, or the only file patch if there is exactly
    /// one.
    pub fn for_file(&self, file: &str) -> Option<&FilePatch> {
        self.files
            .iter()
            .find(|f| f.targets(file))
            .or(match self.files.as_slice() {
                [only] => Some(only),
                _ => None,
            })
    }
}

impl FromStr for PatchSet {
    type Err = PatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

struct Parser<'a> {
    lines: std::iter::Peekable<std::iter::Enumerate<std::str::SplitInclusive<'a, char>>>,
    files: Vec<FilePatch>,
    current: Option<FilePatch>,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            lines: text.split_inclusive('\n').enumerate().peekable(),
            files: Vec::new(),
            current: None,
        }
    }

    fn parse(mut self) -> Result<PatchSet, PatchError> {
        while let Some((index, raw)) = self.lines.next() {
            let line = raw.trim_end_matches(['\n', '\r']);

            if line.starts_with("diff ") {
                self.finish_file();
                self.current = Some(FilePatch::default());
            } else if let Some(path) = line.strip_prefix("--- ") {
                let file = self.file_for_header();
                file.old_path = header_path(path, "a/");
            } else if let Some(path) = line.strip_prefix("+++ ") {
                let file = self.current.get_or_insert_with(FilePatch::default);
                file.new_path = header_path(path, "b/");
            } else if line.starts_with("@@") {
                let hunk = self.parse_hunk(index + 1, line)?;
                self.current
                    .get_or_insert_with(FilePatch::default)
                    .hunks
                    .push(hunk);
            }
            // Anything else outside a hunk (index lines, modes, commit text)
            // carries nothing we apply.
        }
        self.finish_file();

        if self.files.iter().all(|f| f.hunks.is_empty()) {
            return Err(PatchError::Malformed {
                line: 1,
                reason: "patch contains no hunks".to_string(),
            });
        }
        Ok(PatchSet { files: self.files })
    }

    /// A `---` header starts a new file unless it follows a `diff` line that
    /// has not collected any hunks yet.
    fn file_for_header(&mut self) -> &mut FilePatch {
        let reuse = self
            .current
            .as_ref()
            .is_some_and(|f| f.hunks.is_empty() && f.old_path.is_none());
        if !reuse {
            self.finish_file();
        }
        self.current.get_or_insert_with(FilePatch::default)
    }

    fn finish_file(&mut self) {
        if let Some(file) = self.current.take() {
            self.files.push(file);
        }
    }

    fn parse_hunk(&mut self, line_no: usize, header: &str) -> Result<Hunk, PatchError> {
        let malformed = |line: usize, reason: &str| PatchError::Malformed {
            line,
            reason: reason.to_string(),
        };

        let (old_start, old_len, new_start, new_len) =
            parse_hunk_header(header).ok_or_else(|| malformed(line_no, "invalid hunk header"))?;

        let mut hunk = Hunk {
            old_start,
            old_len,
            new_start,
            new_len,
            lines: Vec::new(),
        };
        let (mut old_left, mut new_left) = (old_len, new_len);

        while old_left > 0 || new_left > 0 {
            let Some((index, raw)) = self.lines.next() else {
                return Err(malformed(line_no, "hunk ends before its line counts are met"));
            };
            let line_no = index + 1;
            let body = match raw.chars().next() {
                Some(' ') => {
                    consume(&mut old_left, line_no, "old")?;
                    consume(&mut new_left, line_no, "new")?;
                    HunkLine::Context(raw[1..].to_string())
                }
                // Some editors strip the space from empty context lines.
                Some('\n' | '\r') => {
                    consume(&mut old_left, line_no, "old")?;
                    consume(&mut new_left, line_no, "new")?;
                    HunkLine::Context(raw.to_string())
                }
                Some('-') => {
                    consume(&mut old_left, line_no, "old")?;
                    HunkLine::Remove(raw[1..].to_string())
                }
                Some('+') => {
                    consume(&mut new_left, line_no, "new")?;
                    HunkLine::Add(raw[1..].to_string())
                }
                Some('\\') => {
                    strip_terminator(&mut hunk);
                    continue;
                }
                _ => return Err(malformed(line_no, "unexpected line inside hunk")),
            };
            hunk.lines.push(body);
        }

        // The marker for the hunk's last line comes after the counts are met.
        if self.lines.peek().is_some_and(|(_, raw)| raw.starts_with('\\')) {
            self.lines.next();
            strip_terminator(&mut hunk);
        }

        Ok(hunk)
    }
}

/// Count one body line against a hunk side.
fn consume(left: &mut usize, line: usize, side: &str) -> Result<(), PatchError> {
    *left = left.checked_sub(1).ok_or_else(|| PatchError::Malformed {
        line,
        reason: format!("hunk has more {side} lines than its header states"),
    })?;
    Ok(())
}

/// Apply a `\ No newline at end of file` marker to the preceding line.
fn strip_terminator(hunk: &mut Hunk) {
    if let Some(last) = hunk.lines.last_mut() {
        let text = last.text_mut();
        if text.ends_with('\n') {
            text.pop();
            if text.ends_with('\r') {
                text.pop();
            }
        }
    }
}

/// Parse `@@ -l[,s] +l[,s] @@ ...` into `(old_start, old_len, new_start, new_len)`.
fn parse_hunk_header(header: &str) -> Option<(usize, usize, usize, usize)> {
    let rest = header.strip_prefix("@@ ")?;
    let end = rest.find(" @@")?;
    let mut ranges = rest[..end].split_whitespace();
    let (old_start, old_len) = parse_range(ranges.next()?.strip_prefix('-')?)?;
    let (new_start, new_len) = parse_range(ranges.next()?.strip_prefix('+')?)?;
    if ranges.next().is_some() {
        return None;
    }
    Some((old_start, old_len, new_start, new_len))
}

fn parse_range(range: &str) -> Option<(usize, usize)> {
    match range.split_once(',') {
        Some((start, len)) => Some((start.parse().ok()?, len.parse().ok()?)),
        None => Some((range.parse().ok()?, 1)),
    }
}

/// Path from a `---`/`+++` header: drops a trailing tab-separated timestamp,
/// the `a/`/`b/` prefix, and maps `/dev/null` to `None`.
fn header_path(raw: &str, prefix: &str) -> Option<String> {
    let path = raw.split('\t').next().unwrap_or(raw).trim();
    if path == "/dev/null" || path.is_empty() {
        return None;
    }
    Some(path.strip_prefix(prefix).unwrap_or(path).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const GAME: &str = "\
function Game:start_up()
    self.SETTINGS = {}
    self.SPEEDFACTOR = 1
    set_profile_progress()
    self:load_profile()
end
";

    const PATCH: &str = "\
diff --git a/game.lua b/game.lua
index 3b18e51..a4c3f1d 100644
--- a/game.lua
+++ b/game.lua
@@ -2,3 +2,4 @@ function Game:start_up()
     self.SETTINGS = {}
     self.SPEEDFACTOR = 1
+    initSteamodded()
     set_profile_progress()
";

    #[test]
    fn test_parse_headers_and_hunk() {
        let set = PatchSet::parse(PATCH).unwrap();
        assert_eq!(set.files().len(), 1);

        let file = &set.files()[0];
        assert_eq!(file.old_path.as_deref(), Some("game.lua"));
        assert_eq!(file.new_path.as_deref(), Some("game.lua"));
        assert_eq!(file.hunks.len(), 1);

        let hunk = &file.hunks[0];
        assert_eq!((hunk.old_start, hunk.old_len, hunk.new_start, hunk.new_len), (2, 3, 2, 4));
        assert_eq!(hunk.lines[2], HunkLine::Add("    initSteamodded()\n".to_string()));
    }

    #[test]
    fn test_apply_inserts_after_anchor() {
        let set: PatchSet = PATCH.parse().unwrap();
        let patched = set.for_file("game.lua").unwrap().apply(GAME).unwrap();

        let lines: Vec<&str> = patched.lines().collect();
        assert_eq!(lines[2], "    self.SPEEDFACTOR = 1");
        assert_eq!(lines[3], "    initSteamodded()");
        assert_eq!(lines[4], "    set_profile_progress()");
        assert_eq!(patched.len(), GAME.len() + "    initSteamodded()\n".len());
    }

    #[test]
    fn test_second_application_conflicts() {
        let file = PatchSet::parse(PATCH).unwrap().files()[0].clone();
        let once = file.apply(GAME).unwrap();

        let err = file.apply(&once).unwrap_err();
        assert_eq!(err, PatchError::Conflict { hunk: 1, line: 4 });
    }

    #[test]
    fn test_drifted_content_conflicts() {
        let drifted = GAME.replace("self.SPEEDFACTOR = 1", "self.SPEEDFACTOR = 2");
        let set = PatchSet::parse(PATCH).unwrap();
        let file = &set.files()[0];
        assert!(matches!(file.apply(&drifted), Err(PatchError::Conflict { .. })));
    }

    #[test]
    fn test_removal_and_replacement() {
        let patch = "\
--- a/conf.lua
+++ b/conf.lua
@@ -1,3 +1,3 @@
 function love.conf(t)
-    t.console = false
+    t.console = true
 end
";
        let set = PatchSet::parse(patch).unwrap();
        let file = &set.files()[0];
        let out = file
            .apply("function love.conf(t)\n    t.console = false\nend\n")
            .unwrap();
        assert_eq!(out, "function love.conf(t)\n    t.console = true\nend\n");
    }

    #[test]
    fn test_pure_insertion_hunk() {
        let patch = "\
--- a/main.lua
+++ b/main.lua
@@ -1,0 +2,1 @@
+-- patched
";
        let set = PatchSet::parse(patch).unwrap();
        let file = &set.files()[0];
        assert_eq!(file.apply("a\nb\n").unwrap(), "a\n-- patched\nb\n");
    }

    #[test]
    fn test_no_newline_marker() {
        let patch = "\
--- a/version.jkr
+++ b/version.jkr
@@ -1 +1 @@
-1.0.0
\\ No newline at end of file
+1.0.1
\\ No newline at end of file
";
        let set = PatchSet::parse(patch).unwrap();
        let file = &set.files()[0];
        assert_eq!(file.apply("1.0.0").unwrap(), "1.0.1");
        // With a trailing newline the old line no longer matches byte-for-byte.
        assert!(file.apply("1.0.0\n").is_err());
    }

    #[test]
    fn test_multiple_files() {
        let patch = "\
--- a/main.lua
+++ b/main.lua
@@ -1 +1 @@
-a
+b
--- a/game.lua
+++ b/game.lua
@@ -1 +1 @@
-c
+d
";
        let set = PatchSet::parse(patch).unwrap();
        assert_eq!(set.files().len(), 2);
        assert_eq!(set.for_file("game.lua").unwrap().apply("c\n").unwrap(), "d\n");
        assert!(set.for_file("conf.lua").is_none());
    }

    #[test]
    fn test_malformed_patches() {
        assert!(matches!(
            PatchSet::parse("just some text\n"),
            Err(PatchError::Malformed { .. })
        ));
        assert!(matches!(
            PatchSet::parse("--- a/x\n+++ b/x\n@@ -1,2 +1,2 @@\n a\n"),
            Err(PatchError::Malformed { .. })
        ));
        assert!(matches!(
            PatchSet::parse("--- a/x\n+++ b/x\n@@ -one +1 @@\n"),
            Err(PatchError::Malformed { line: 3, .. })
        ));
    }

    #[test]
    fn test_header_path_variants() {
        assert_eq!(header_path("a/game.lua\t2024-02-20 10:00:00", "a/"), Some("game.lua".into()));
        assert_eq!(header_path("game.lua", "a/"), Some("game.lua".into()));
        assert_eq!(header_path("/dev/null", "a/"), None);
    }
}
