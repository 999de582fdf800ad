mod checker;
mod config;
mod diagnostics;
mod error;
mod fs;
mod ignore;
mod index;
mod logging;
mod parser;
mod paths;
mod report;
mod resolver;
mod types;

use std::io::IsTerminal as _;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, ValueEnum};

use crate::checker::{CheckReport, Checker};
use crate::config::Config;
use crate::error::Error;
use crate::fs::DiskFileSystem;
use crate::report::RenderOptions;

/// Exit code when at least one reference is broken.
const EXIT_BROKEN: u8 = 2;

/// Exit code for fatal errors (bad root, bad config, bad pattern).
const EXIT_FATAL: u8 = 3;

/// Exit code when the only findings are unused images.
const EXIT_UNUSED: u8 = 1;

#[derive(Parser)]
#[command(
    name = "mdref",
    version,
    about = "Find broken links, unused images and one-way links in a tree of markdown notes"
)]
struct Cli {
    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Extra ignore pattern in gitignore syntax (repeatable)
    #[arg(short, long = "ignore", value_name = "PATTERN")]
    ignore: Vec<String>,

    /// Count plain links to images as usage, not only embeds
    #[arg(long)]
    loose_images: bool,

    /// Disable ANSI colors
    #[arg(long)]
    no_color: bool,

    /// Do not report unused images
    #[arg(long)]
    no_unused: bool,

    /// Root directory to check
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Raise verbosity: -v adds one-way links, -vv per-document stats and debug logs
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    /// Pretty-printed JSON of the full report.
    Json,
    /// Human-readable diagnostics.
    Text,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let color = !cli.no_color && std::env::var_os("NO_COLOR").is_none();
    logging::init(cli.verbose, color && std::io::stderr().is_terminal());

    return match run(&cli, color && std::io::stdout().is_terminal()) {
        Ok(code) => code,
        Err(e) => {
            diagnostics::print_error(&e, color && std::io::stderr().is_terminal());
            ExitCode::from(EXIT_FATAL)
        },
    };
}

/// Exit status for a finished check.
/// Priority: broken (2) > unused images (1) > clean (0).
fn exit_code(report: &CheckReport, report_unused: bool) -> ExitCode {
    if report.has_broken() {
        return ExitCode::from(EXIT_BROKEN);
    }
    if report_unused && report.has_unused_images() {
        return ExitCode::from(EXIT_UNUSED);
    }
    return ExitCode::SUCCESS;
}

/// Load config, run one check cycle, print the report.
///
/// # Errors
///
/// Returns fatal errors only: a bad root, a malformed `.mdref.toml`, an
/// invalid ignore pattern, or a JSON serialization failure.
fn run(cli: &Cli, color: bool) -> Result<ExitCode, Error> {
    let fs = DiskFileSystem::open(&cli.path)?;
    let config = Config::load(&fs)?.with_overrides(&cli.ignore, cli.loose_images);
    tracing::debug!(root = %fs.root().display(), ?config, "starting check");

    let report = Checker::new(&fs, &config).check_all()?;

    match cli.format {
        Format::Json => print!("{}", report::render_json(&report)?),
        Format::Text => {
            let options = RenderOptions {
                color,
                hide_unused: cli.no_unused,
                verbosity: cli.verbose,
            };
            print!("{}", report::render_text(&report, &options));
        },
    }

    return Ok(exit_code(&report, !cli.no_unused));
}
