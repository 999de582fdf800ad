use crate::config::CONFIG_FILE;
use crate::error::Error;

const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Render a fatal error as markdown and print it to stderr, headings bold
/// when `color` is set.
pub fn print_error(e: &Error, color: bool) {
    let md = render_error(e);
    for line in md.lines() {
        if color && line.starts_with('#') {
            eprintln!("{BOLD}{line}{RESET}");
        } else {
            eprintln!("{line}");
        }
    }
    return;
}

/// Render a fatal error as a structured markdown diagnostic: what happened,
/// and how to fix it where there is a fix.
pub fn render_error(e: &Error) -> String {
    return match e {
        Error::ConfigInvalid { path, reason } => render_config_invalid(&path.display().to_string(), reason),
        Error::InvalidPattern { pattern, reason } => render_invalid_pattern(pattern, reason),
        Error::RootNotDirectory { path } => format!(
            "\
# Error: Not A Directory

`{}` is a file. mdref checks a directory tree.

## Fix

Pass the directory containing your notes:

    mdref path/to/notes
",
            path.display()
        ),
        Error::RootNotFound { path } => format!(
            "\
# Error: Root Not Found

`{}` does not exist.
",
            path.display()
        ),
        Error::TomlDe(err) => format!(
            "\
# Error: Invalid TOML

`{CONFIG_FILE}` could not be parsed:

{err}
"
        ),
        Error::Json(_) | Error::ReadFailed { .. } => format!(
            "\
# Error

{e}
"
        ),
    };
}

fn render_config_invalid(path: &str, reason: &str) -> String {
    return format!(
        "\
# Error: Invalid Config

`{path}`: {reason}

## Fix

Valid keys are `ignore` (list of patterns), `asset_dir` (a single
directory name) and `strict_image_refs` (boolean).
"
    );
}

fn render_invalid_pattern(pattern: &str, reason: &str) -> String {
    return format!(
        "\
# Error: Invalid Ignore Pattern

`{pattern}` is not a valid glob: {reason}

## Fix

Patterns use gitignore syntax. Escape literal `[`, `]`, `*` and `?` with `\\`.
"
    );
}
