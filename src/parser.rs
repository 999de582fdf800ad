//! Reference extraction from document text.
//!
//! Lines go through a two-state machine (normal / inside a fenced block).
//! Each normal line is then masked: inline code spans and HTML comment
//! contents are overwritten with spaces of the same byte length, so the regex
//! pass never sees them and every match offset is already an offset into the
//! original line.

use std::collections::VecDeque;
use std::ops::Range;
use std::str::Lines;

use regex::{Captures, Regex};

use crate::types::Reference;

/// Prefixes of targets that point outside the tree.
const EXTERNAL_SCHEMES: &[&str] = &["http://", "https://", "ftp://", "mailto:"];

/// Minimum run of backticks or tildes that opens a fenced block.
const MIN_FENCE_LEN: usize = 3;

/// Whether the current line sits inside a fenced code block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineState {
    /// Inside a fence opened by `len` repetitions of `marker`.
    InFence {
        /// Fence length; a closing fence must be at least this long.
        len: usize,
        /// `` ` `` or `~`.
        marker: u8,
    },
    /// Ordinary text.
    Normal,
}

/// Compiled reference patterns. Build once, parse many documents.
pub struct ReferenceParser {
    /// `[text](target)` and `![alt](target)`.
    inline: Regex,
    /// `[[target]]`, `[[target|alias]]`, and the `!` embed forms.
    wiki: Regex,
}

impl ReferenceParser {
    /// Compile the reference patterns.
    ///
    /// # Panics
    ///
    /// Panics if the hardcoded reference regexes are invalid (compile-time invariant).
    #[allow(clippy::expect_used, reason = "hardcoded patterns")]
    pub fn new() -> Self {
        return Self {
            inline: Regex::new(r"(!?)\[((?:[^\[\]]|!?\[[^\[\]]*\]\([^()]*\))*)\]\(([^()]*)\)")
                .expect("valid inline regex"),
            wiki: Regex::new(r"(!?)\[\[([^\[\]]+?)\]\]").expect("valid wiki regex"),
        };
    }

    /// Lazily extract every reference in `content`, top to bottom and left
    /// to right. The returned iterator is single-pass.
    pub fn parse<'a>(&'a self, document: &'a str, content: &'a str) -> References<'a> {
        return References {
            document,
            in_comment: false,
            line_number: 0,
            lines: content.lines(),
            parser: self,
            pending: VecDeque::new(),
            state: LineState::Normal,
        };
    }

    /// All references on one masked line, sorted by start offset.
    fn scan_masked_line(&self, masked: &str) -> Vec<(usize, bool, String)> {
        let mut found: Vec<(usize, bool, String)> = Vec::new();
        let mut wiki_spans: Vec<Range<usize>> = Vec::new();

        for cap in self.wiki.captures_iter(masked) {
            let (Some(whole), Some(bang), Some(inner)) = (cap.get(0), cap.get(1), cap.get(2)) else {
                continue;
            };
            wiki_spans.push(whole.range());
            let target = strip_alias(inner.as_str());
            if target.is_empty() || target.starts_with('#') {
                continue;
            }
            found.push((whole.start(), !bang.is_empty(), target.to_string()));
        }

        for cap in self.inline.captures_iter(masked) {
            let (Some(whole), Some(text)) = (cap.get(0), cap.get(2)) else {
                continue;
            };
            if wiki_spans.iter().any(|span| return span.start < whole.end() && whole.start() < span.end) {
                continue;
            }
            found.extend(inline_reference(&cap, 0));
            // An image nested in the link text, as in `[![alt](img.png)](page.md)`.
            for inner in self.inline.captures_iter(text.as_str()) {
                found.extend(inline_reference(&inner, text.start()));
            }
        }

        found.sort_by_key(|&(start, _, _)| return start);
        return found;
    }
}

impl Default for ReferenceParser {
    fn default() -> Self {
        return Self::new();
    }
}

/// Single-pass iterator over the references of one document.
pub struct References<'a> {
    /// Path of the document being parsed.
    document: &'a str,
    /// An HTML comment opened on an earlier line is still open.
    in_comment: bool,
    /// One-based number of the last line consumed.
    line_number: u32,
    /// Remaining lines.
    lines: Lines<'a>,
    /// Compiled patterns.
    parser: &'a ReferenceParser,
    /// References found on the current line, not yet yielded.
    pending: VecDeque<Reference>,
    /// Fence state carried between lines.
    state: LineState,
}

impl References<'_> {
    /// Advance the state machine over one line and queue its references.
    fn consume_line(&mut self, line: &str) {
        self.line_number = self.line_number.saturating_add(1);

        if let LineState::InFence { len, marker } = self.state {
            if fence_opening(line).is_some_and(|(m, l)| return m == marker && l >= len) {
                self.state = LineState::Normal;
            }
            return;
        }

        if !self.in_comment
            && let Some((marker, len)) = fence_opening(line)
        {
            self.state = LineState::InFence { len, marker };
            return;
        }

        let masked = mask_line(line, &mut self.in_comment);
        for (start, is_embed, target) in self.parser.scan_masked_line(&masked) {
            self.pending.push_back(Reference {
                column: column_of(line, start),
                is_embed,
                line: self.line_number,
                line_text: line.to_string(),
                source: self.document.to_string(),
                target,
            });
        }
        return;
    }
}

impl Iterator for References<'_> {
    type Item = Reference;

    fn next(&mut self) -> Option<Reference> {
        loop {
            if let Some(reference) = self.pending.pop_front() {
                return Some(reference);
            }
            let line = self.lines.next()?;
            self.consume_line(line);
        }
    }
}

/// Overwrite bytes `range` of `out` with spaces. Ranges always start and end
/// on ASCII delimiters, so whole characters are replaced.
fn blank(out: &mut [u8], range: Range<usize>) {
    for byte in out.iter_mut().take(range.end).skip(range.start) {
        *byte = b' ';
    }
    return;
}

/// Turn one inline match into `(start, is_embed, target)`, or `None` for
/// empty, same-document and external targets. `offset` shifts the start when
/// the match came from a slice of the line.
fn inline_reference(cap: &Captures<'_>, offset: usize) -> Option<(usize, bool, String)> {
    let (whole, bang, raw) = (cap.get(0)?, cap.get(1)?, cap.get(3)?);
    let target = clean_inline_target(raw.as_str());
    if target.is_empty() || target.starts_with('#') || is_external(target) {
        return None;
    }
    return Some((offset.saturating_add(whole.start()), !bang.is_empty(), target.to_string()));
}

/// Strip a `"title"` and `<...>` wrapping from an inline link target.
fn clean_inline_target(raw: &str) -> &str {
    let raw = raw.trim();
    if let Some(rest) = raw.strip_prefix('<') {
        return rest.split('>').next().unwrap_or(rest).trim();
    }
    return raw.split_whitespace().next().unwrap_or("");
}

/// One-based character column of byte offset `start` in `line`.
fn column_of(line: &str, start: usize) -> u32 {
    let chars = line.get(..start).map_or(0, |prefix| return prefix.chars().count());
    return u32::try_from(chars.saturating_add(1)).unwrap_or(u32::MAX);
}

/// `Some((marker, len))` if the trimmed line starts with a fence of at least
/// three backticks or tildes.
fn fence_opening(line: &str) -> Option<(u8, usize)> {
    let trimmed = line.trim_start().as_bytes();
    let marker = *trimmed.first()?;
    if marker != b'`' && marker != b'~' {
        return None;
    }
    let len = trimmed.iter().take_while(|&&b| return b == marker).count();
    return (len >= MIN_FENCE_LEN).then_some((marker, len));
}

/// Whether a target names an external resource.
fn is_external(target: &str) -> bool {
    let lower = target.to_ascii_lowercase();
    return EXTERNAL_SCHEMES.iter().any(|scheme| return lower.starts_with(scheme));
}

/// Mask inline code spans and HTML comment contents with spaces, keeping the
/// byte length. `in_comment` carries an unterminated comment across lines.
fn mask_line(line: &str, in_comment: &mut bool) -> String {
    let bytes = line.as_bytes();
    let mut out = bytes.to_vec();
    let mut i = 0_usize;

    while i < bytes.len() {
        let rest = bytes.get(i..).unwrap_or_default();

        if *in_comment {
            let Some(offset) = find(rest, b"-->") else {
                blank(&mut out, i..bytes.len());
                break;
            };
            let end = i.saturating_add(offset).saturating_add(3);
            blank(&mut out, i..end);
            *in_comment = false;
            i = end;
            continue;
        }

        if rest.starts_with(b"<!--") {
            *in_comment = true;
            let end = i.saturating_add(4);
            blank(&mut out, i..end);
            i = end;
            continue;
        }

        if rest.first() == Some(&b'`') {
            let run = rest.iter().take_while(|&&b| return b == b'`').count();
            let body_start = i.saturating_add(run);
            match find_backtick_run(bytes, body_start, run) {
                Some(close) => {
                    let end = close.saturating_add(run);
                    blank(&mut out, i..end);
                    i = end;
                },
                None => i = body_start,
            }
            continue;
        }

        i = i.saturating_add(1);
    }

    return String::from_utf8(out).unwrap_or_else(|_| return line.to_string());
}

/// Byte offset of the first occurrence of `needle` in `haystack`.
fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    return haystack.windows(needle.len()).position(|window| return window == needle);
}

/// Start of the next run of exactly `run` backticks at or after `from`.
fn find_backtick_run(bytes: &[u8], from: usize, run: usize) -> Option<usize> {
    let mut i = from;
    while i < bytes.len() {
        if bytes.get(i) == Some(&b'`') {
            let len = bytes.get(i..).unwrap_or_default().iter().take_while(|&&b| return b == b'`').count();
            if len == run {
                return Some(i);
            }
            i = i.saturating_add(len);
        } else {
            i = i.saturating_add(1);
        }
    }
    return None;
}

/// Drop a `|alias` suffix.
fn strip_alias(inner: &str) -> &str {
    return inner.split('|').next().unwrap_or(inner).trim();
}
