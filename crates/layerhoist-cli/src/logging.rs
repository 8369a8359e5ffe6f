//! Diagnostics for `layerhoist`.
//!
//! stdout belongs to the hook protocol (manifest lines, sentinel lines, JSON
//! results), so every log record is written to stderr. The core crate never
//! logs; it hands back reports that the commands turn into events here.

use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Level for our own target from the `-v` count.
fn level_for(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// `RUST_LOG` (default `warn`) for other targets, `level` for `layerhoist`.
fn filter_for(level: Level) -> EnvFilter {
    let base = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    match format!("layerhoist={level}").parse() {
        Ok(directive) => base.add_directive(directive),
        Err(_) => base.add_directive(level.into()),
    }
}

/// Install the global subscriber. Call once, before any command runs.
///
/// With `json`, each record is one line such as
/// `{"timestamp":"..","level":"INFO","fields":{"message":"layer registry ready","layers":3},"span":{"name":"hook"}}`,
/// which keeps hook logs separable from the walker's own output.
pub fn init(verbosity: u8, json: bool) {
    let registry = tracing_subscriber::registry().with(filter_for(level_for(verbosity)));
    let stderr = fmt::layer().with_writer(std::io::stderr);

    if json {
        registry
            .with(stderr.json().with_current_span(true).with_span_list(false))
            .init();
    } else {
        registry.with(stderr.with_target(false)).init();
    }
}
