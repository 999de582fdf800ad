//! Diagnostic logging to stderr.
//!
//! Quiet by default (`warn`). Each `-v` raises the level one step
//! (`info`, `debug`, `trace`). `RUST_LOG` takes precedence over both:
//!
//! ```bash
//! RUST_LOG=mdref::resolver=trace mdref notes/
//! ```

use std::sync::Once;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Guards subscriber installation.
static INIT: Once = Once::new();

/// Install the global subscriber. Only the first call takes effect.
pub fn init(verbosity: u8, color: bool) {
    INIT.call_once(|| {
        let filter = if std::env::var_os("RUST_LOG").is_some() {
            EnvFilter::from_default_env()
        } else {
            EnvFilter::new(level_for(verbosity))
        };

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(color)
            .with_target(verbosity >= 2)
            .without_time()
            .with_filter(filter);

        // Another subscriber may already be installed by an embedding test harness.
        let _ = tracing_subscriber::registry().with(fmt_layer).try_init();
    });
    return;
}

/// Filter directive for a `-v` count.
const fn level_for(verbosity: u8) -> &'static str {
    return match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
}
