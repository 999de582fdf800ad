//! Human and machine renderings of a `CheckReport`.

use std::fmt::Write as _;

use crate::checker::CheckReport;
use crate::error::Error;
use crate::types::BrokenReference;

const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";
const YELLOW: &str = "\x1b[33m";

/// What the text report includes and how it looks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Emit ANSI escapes.
    pub color: bool,
    /// Leave out the unused image section.
    pub hide_unused: bool,
    /// 0: broken and unused. 1: adds one-way links. 2: adds per-document stats.
    pub verbosity: u8,
}

impl RenderOptions {
    /// Wrap `text` in `code` when color is on.
    fn paint(&self, code: &str, text: &str) -> String {
        if self.color {
            return format!("{code}{text}{RESET}");
        }
        return text.to_string();
    }
}

/// Pretty JSON of the whole report.
///
/// # Errors
///
/// Returns `Error::Json` if serialization fails.
pub fn render_json(report: &CheckReport) -> Result<String, Error> {
    let mut out = serde_json::to_string_pretty(report)?;
    out.push('\n');
    return Ok(out);
}

/// Plain-text report, compiler-diagnostic style.
pub fn render_text(report: &CheckReport, options: &RenderOptions) -> String {
    let mut out = String::new();

    for broken in &report.broken {
        render_broken(&mut out, broken, options);
    }

    if !options.hide_unused && !report.unused_images.is_empty() {
        let _ = writeln!(out, "{}", options.paint(BOLD, "Unused images"));
        for image in &report.unused_images {
            let _ = writeln!(out, "  {image}");
        }
        out.push('\n');
    }

    if options.verbosity >= 1 && !report.unidirectional.is_empty() {
        let _ = writeln!(out, "{}", options.paint(BOLD, "Unidirectional links"));
        for link in &report.unidirectional {
            let _ = writeln!(out, "  {} -> {}", link.source, link.target);
        }
        out.push('\n');
    }

    if options.verbosity >= 2 && !report.documents.is_empty() {
        let _ = writeln!(out, "{}", options.paint(BOLD, "Documents"));
        let width = report.documents.iter().map(|d| return d.path.chars().count()).max().unwrap_or(0);
        for document in &report.documents {
            let _ = writeln!(
                out,
                "  {:<width$}  {} in, {} out",
                document.path, document.incoming, document.outgoing
            );
        }
        out.push('\n');
    }

    render_summary(&mut out, report, options);
    return out;
}

/// One broken reference: location line, source line, caret.
fn render_broken(out: &mut String, broken: &BrokenReference, options: &RenderOptions) {
    let location = format!("{}:{}:{}", broken.source, broken.line, broken.column);
    let kind = if broken.is_embed { "embed" } else { "reference" };
    let _ = writeln!(
        out,
        "{}  {}  broken {kind} '{}'",
        options.paint(BOLD, &location),
        options.paint(RED, "error"),
        broken.target
    );

    let indent: String = broken
        .line_text
        .chars()
        .take(usize::try_from(broken.column.saturating_sub(1)).unwrap_or(0))
        .map(|c| return if c == '\t' { '\t' } else { ' ' })
        .collect();
    let _ = writeln!(out, "    {}", broken.line_text);
    let _ = writeln!(out, "    {indent}{}", options.paint(RED, "^"));
    out.push('\n');
    return;
}

/// Final count line.
fn render_summary(out: &mut String, report: &CheckReport, options: &RenderOptions) {
    let summary = &report.summary;
    let unused = if options.hide_unused { 0 } else { summary.unused_images };

    if summary.broken_references == 0 && unused == 0 {
        let _ = writeln!(
            out,
            "{}",
            options.paint(
                DIM,
                &format!("All references valid ({} documents, {} images)", summary.total_documents, summary.total_images)
            )
        );
        return;
    }

    let mut parts = vec![format!("{} broken", summary.broken_references)];
    if !options.hide_unused {
        parts.push(format!("{} unused images", summary.unused_images));
    }
    if options.verbosity >= 1 {
        parts.push(format!("{} unidirectional", summary.unidirectional_links));
    }
    let color = if summary.broken_references > 0 { RED } else { YELLOW };
    let _ = writeln!(
        out,
        "{} ({} files scanned)",
        options.paint(color, &parts.join(", ")),
        summary.total_files
    );
    return;
}
