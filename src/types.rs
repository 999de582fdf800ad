//! Core value types shared by the parser, resolver, and checker.

use serde::Serialize;

/// Classification of an indexed file by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    /// A markdown note that is parsed for references.
    Document,
    /// An image asset (png, jpg, jpeg, gif, svg, webp, bmp).
    Image,
    /// Anything else. Still resolvable, never parsed.
    Other,
}

/// One indexed file. `path` is normalized and unique within a `FileIndex`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Document, image, or other.
    pub kind: FileKind,
    /// Root-relative normalized path.
    pub path: String,
    /// File name without its final extension.
    pub stem: String,
}

/// A single link or embed occurrence found in a document.
/// Equality is structural over all fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Reference {
    /// One-based column of the first character of the match in the original line.
    pub column: u32,
    /// `true` for `![[...]]` and `![...](...)`.
    pub is_embed: bool,
    /// One-based line number.
    pub line: u32,
    /// Full text of the source line, for diagnostics.
    pub line_text: String,
    /// Document containing the reference.
    pub source: String,
    /// Target as written, alias removed, anchor kept.
    pub target: String,
}

/// Outcome of resolving one reference. `resolved_path`, when present, is a
/// member of the index's known files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedReference {
    /// The reference that was resolved.
    pub reference: Reference,
    /// Concrete target, if any strategy succeeded.
    pub resolved_path: Option<String>,
}

impl ResolvedReference {
    /// A reference is valid exactly when it resolved to a known file.
    pub const fn is_valid(&self) -> bool {
        return self.resolved_path.is_some();
    }
}

/// A reference that did not resolve, kept for the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BrokenReference {
    /// One-based column in the original line.
    pub column: u32,
    /// `true` if the reference was an embed.
    pub is_embed: bool,
    /// One-based line number.
    pub line: u32,
    /// Full text of the source line.
    pub line_text: String,
    /// Document containing the reference.
    pub source: String,
    /// Raw target string as written (never the resolved form).
    pub target: String,
}

impl From<Reference> for BrokenReference {
    fn from(reference: Reference) -> Self {
        return Self {
            column: reference.column,
            is_embed: reference.is_embed,
            line: reference.line,
            line_text: reference.line_text,
            source: reference.source,
            target: reference.target,
        };
    }
}

/// A recoverable problem recorded during a scan or check cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    /// What went wrong.
    pub message: String,
    /// Root-relative path the warning concerns.
    pub path: String,
}

impl Warning {
    /// Build a warning and emit it to the log at the same time.
    pub fn new(path: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        tracing::warn!(path, "{message}");
        return Self {
            message,
            path: path.to_string(),
        };
    }
}
