//! Gitignore-style exclusion rules.
//!
//! Patterns come from four places, lowest precedence first: built-in
//! defaults, the root `.gitignore` and `.mdignore`, `.gitignore`/`.mdignore`
//! files in subdirectories (scoped to that subtree), and run-time overrides.
//! A path is ignored when any positive pattern matches it and no negation
//! (`!pattern`) does. Negations are checked after every positive pattern, so
//! a negation anywhere can resurrect a path excluded anywhere else.

use globset::{GlobBuilder, GlobMatcher};

use crate::error::Error;
use crate::fs::FileSystem;
use crate::paths;
use crate::types::Warning;

/// Patterns applied to every tree before any file is consulted.
const DEFAULT_PATTERNS: &[&str] = &[
    ".git/",
    ".github/",
    ".obsidian/",
    ".trash/",
    ".vscode/",
    ".idea/",
    "node_modules/",
    "__pycache__/",
    "*.pyc",
    "**/.DS_Store",
    "**/Thumbs.db",
];

/// Convention files read at the root and in every non-ignored subdirectory,
/// in load order: the generic one first, then the tool-specific one.
const IGNORE_FILES: &[&str] = &[".gitignore", ".mdignore"];

/// Where a pattern came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreScope {
    /// Built into mdref.
    Default,
    /// `.gitignore` or `.mdignore` in a subdirectory.
    NestedFile,
    /// Supplied by the caller (config file or `--ignore`).
    Override,
    /// `.gitignore` or `.mdignore` at the root.
    RootFile,
}

/// How a single compiled pattern tests a path.
#[derive(Debug, Clone)]
enum PatternKind {
    /// Trailing `/`: the directory itself and everything below it.
    Directory {
        /// Single segment without a leading `/`: matches at any depth.
        anywhere: bool,
        /// The directory path.
        path: String,
    },
    /// Trailing `/` with a wildcard: any matching directory and everything
    /// below it.
    DirectoryGlob {
        /// Single segment without a leading `/`: matches at any depth.
        anywhere: bool,
        /// Compiled directory glob.
        glob: GlobMatcher,
    },
    /// Wildcard spanning several segments: full-path glob.
    FullPath(GlobMatcher),
    /// No wildcard: exact path, or a directory prefix if the path named an
    /// existing directory when the pattern was compiled.
    Literal {
        /// Whether the literal named a directory on disk.
        is_directory: bool,
        /// The literal path.
        path: String,
    },
    /// Wildcard within one segment: tested against every segment.
    Segment(GlobMatcher),
}

/// One compiled exclusion rule.
#[derive(Debug, Clone)]
pub struct IgnorePattern {
    /// Directory the pattern applies below; `""` for the whole tree.
    base: String,
    /// Compiled matcher.
    kind: PatternKind,
    /// `true` for `!pattern`.
    negated: bool,
    /// Origin of the pattern.
    scope: IgnoreScope,
    /// Pattern text as written, `!` included.
    text: String,
}

impl IgnorePattern {
    /// Compile one pattern line. Returns `Ok(None)` for blank lines and comments.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidPattern` if a wildcard pattern is not a valid glob.
    pub fn compile(
        line: &str,
        scope: IgnoreScope,
        base: &str,
        fs: &dyn FileSystem,
    ) -> Result<Option<Self>, Error> {
        let text = line.trim();
        if text.is_empty() || text.starts_with('#') {
            return Ok(None);
        }

        let (negated, body) = match text.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, text),
        };
        let body = body.strip_prefix("./").unwrap_or(body);
        let anchored = body.starts_with('/');
        let body = body.trim_start_matches('/');
        if body.is_empty() {
            return Ok(None);
        }

        let kind = if let Some(dir) = body.strip_suffix('/') {
            let anywhere = !anchored && !dir.contains('/');
            if dir.contains(['*', '?', '[']) {
                PatternKind::DirectoryGlob {
                    anywhere,
                    glob: compile_glob(text, dir)?,
                }
            } else {
                PatternKind::Directory {
                    anywhere,
                    path: paths::normalize(dir),
                }
            }
        } else if body.contains(['*', '?', '[']) {
            let glob = compile_glob(text, body)?;
            if anchored || body.contains('/') {
                PatternKind::FullPath(glob)
            } else {
                PatternKind::Segment(glob)
            }
        } else {
            let path = paths::normalize(body);
            let is_directory = fs.is_directory(&paths::join(base, &path));
            PatternKind::Literal { is_directory, path }
        };

        return Ok(Some(Self {
            base: base.to_string(),
            kind,
            negated,
            scope,
            text: text.to_string(),
        }));
    }

    /// Test the pattern without regard to negation.
    fn matches(&self, path: &str) -> bool {
        let relative = if self.base.is_empty() {
            path
        } else {
            let Some(rest) = path.strip_prefix(self.base.as_str()).and_then(|r| return r.strip_prefix('/')) else {
                return false;
            };
            rest
        };

        return match &self.kind {
            PatternKind::Directory { anywhere: true, path } => {
                relative.split('/').any(|segment| return segment == path.as_str())
            },
            PatternKind::Directory { anywhere: false, path } => is_same_or_below(relative, path),
            PatternKind::DirectoryGlob { anywhere: true, glob } => {
                relative.split('/').any(|segment| return glob.is_match(segment))
            },
            PatternKind::DirectoryGlob { anywhere: false, glob } => {
                self_and_ancestors(relative).any(|prefix| return glob.is_match(prefix))
            },
            PatternKind::FullPath(glob) => glob.is_match(relative),
            PatternKind::Literal { is_directory, path } => {
                relative == path || (*is_directory && is_same_or_below(relative, path))
            },
            PatternKind::Segment(glob) => relative.split('/').any(|segment| return glob.is_match(segment)),
        };
    }

    /// Origin of the pattern.
    pub const fn scope(&self) -> IgnoreScope {
        return self.scope;
    }

    /// Pattern text as written.
    pub fn text(&self) -> &str {
        return &self.text;
    }
}

/// Compiled predicate over normalized root-relative paths.
#[derive(Debug, Clone, Default)]
pub struct IgnoreMatcher {
    /// All patterns, lowest precedence first.
    patterns: Vec<IgnorePattern>,
    /// Problems met while loading convention files.
    warnings: Vec<Warning>,
}

impl IgnoreMatcher {
    /// Walk the tree for nested convention files, pruning directories that
    /// `active` already ignores. Returns patterns in walk order.
    fn discover_nested(fs: &dyn FileSystem, active: &Self) -> Self {
        let mut nested = Self::default();
        let mut pending: Vec<String> = vec![String::new()];

        while let Some(dir) = pending.pop() {
            let entries = match fs.list_files(&dir) {
                Ok(entries) => entries,
                Err(e) => {
                    nested.warnings.push(Warning::new(&dir, format!("directory skipped: {e}")));
                    continue;
                },
            };

            if !dir.is_empty() {
                for file in IGNORE_FILES {
                    nested.load_file(fs, &dir, file, IgnoreScope::NestedFile);
                }
            }

            // Reverse so the stack pops subdirectories in sorted order.
            for entry in entries.iter().rev().filter(|e| return e.is_directory) {
                let child = paths::join(&dir, &entry.name);
                if !active.should_ignore(&child) && !nested.should_ignore(&child) {
                    pending.push(child);
                }
            }
        }

        return nested;
    }

    /// Build the matcher for a tree: defaults, root convention files, nested
    /// convention files, then `overrides` appended last.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidPattern` if an override is not a valid glob.
    /// Problems in convention files are recorded as warnings instead.
    pub fn load(fs: &dyn FileSystem, overrides: &[String]) -> Result<Self, Error> {
        let mut matcher = Self::default();
        for line in DEFAULT_PATTERNS {
            if let Some(pattern) = IgnorePattern::compile(line, IgnoreScope::Default, "", fs)? {
                matcher.patterns.push(pattern);
            }
        }
        for file in IGNORE_FILES {
            matcher.load_file(fs, "", file, IgnoreScope::RootFile);
        }

        let mut override_patterns = Vec::new();
        for line in overrides {
            if let Some(pattern) = IgnorePattern::compile(line, IgnoreScope::Override, "", fs)? {
                override_patterns.push(pattern);
            }
        }

        let mut active = matcher.clone();
        active.patterns.extend(override_patterns.iter().cloned());
        let nested = Self::discover_nested(fs, &active);

        matcher.patterns.extend(nested.patterns);
        matcher.warnings.extend(nested.warnings);
        matcher.patterns.extend(override_patterns);

        for pattern in matcher.patterns() {
            tracing::trace!(scope = ?pattern.scope(), pattern = pattern.text(), "ignore pattern");
        }
        tracing::debug!(patterns = matcher.patterns.len(), "ignore rules ready");
        return Ok(matcher);
    }

    /// Append every pattern line of one convention file. An unreadable file or
    /// a line that is not a valid glob becomes a single warning, never an
    /// error, and none of that file's patterns are kept.
    fn load_file(&mut self, fs: &dyn FileSystem, dir: &str, file: &str, scope: IgnoreScope) {
        let relative = paths::join(dir, file);
        if !fs.file_exists(&relative) {
            return;
        }

        let content = match fs.read_file(&relative) {
            Ok(content) => content,
            Err(e) => {
                self.warnings.push(Warning::new(&relative, format!("ignore file skipped: {e}")));
                return;
            },
        };

        let mut compiled = Vec::new();
        for line in content.lines() {
            match IgnorePattern::compile(line, scope, dir, fs) {
                Ok(Some(pattern)) => compiled.push(pattern),
                Ok(None) => {},
                Err(e) => {
                    self.warnings.push(Warning::new(&relative, format!("ignore file skipped: {e}")));
                    return;
                },
            }
        }
        tracing::debug!(file = %relative, loaded = compiled.len(), "loaded ignore file");
        self.patterns.extend(compiled);
        return;
    }

    /// All compiled patterns, lowest precedence first.
    pub fn patterns(&self) -> &[IgnorePattern] {
        return &self.patterns;
    }

    /// Whether a normalized root-relative path is excluded. The root itself
    /// (`""`) is never ignored.
    pub fn should_ignore(&self, path: &str) -> bool {
        if path.is_empty() {
            return false;
        }

        let excluded = self
            .patterns
            .iter()
            .filter(|p| return !p.negated)
            .any(|p| return p.matches(path));
        if !excluded {
            return false;
        }

        return !self
            .patterns
            .iter()
            .filter(|p| return p.negated)
            .any(|p| return p.matches(path));
    }

    /// Problems met while loading convention files.
    pub fn warnings(&self) -> &[Warning] {
        return &self.warnings;
    }
}

/// Compile a glob where `*` and `?` never cross a `/`.
///
/// # Errors
///
/// Returns `Error::InvalidPattern` if globset rejects the pattern.
fn compile_glob(text: &str, body: &str) -> Result<GlobMatcher, Error> {
    let glob = GlobBuilder::new(body).literal_separator(true).build().map_err(|e| {
        return Error::InvalidPattern {
            pattern: text.to_string(),
            reason: e.to_string(),
        };
    })?;
    return Ok(glob.compile_matcher());
}

/// Each ancestor directory of `path`, shortest first, then `path` itself.
fn self_and_ancestors(path: &str) -> impl Iterator<Item = &str> {
    return path
        .match_indices('/')
        .filter_map(|(at, _)| return path.get(..at))
        .chain(std::iter::once(path));
}

/// `path == dir` or `path` lies below `dir`.
fn is_same_or_below(path: &str, dir: &str) -> bool {
    return path == dir
        || path
            .strip_prefix(dir)
            .is_some_and(|rest| return rest.starts_with('/'));
}
