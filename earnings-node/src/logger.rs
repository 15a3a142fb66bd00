//! Logger configuration for the `earnings-node` binary.

use std::str::FromStr;

use tracing::Level;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};

/// Initializes the global `tracing` subscriber.
///
/// Logs INFO, WARN, and ERROR by default; set `RUST_LOG` to change the level
/// or filter by module/span.
///
/// Panics if a logger is already initialized.
pub fn init() {
    try_init().expect("failed to set up logger");
}

fn try_init() -> Result<(), TryInitError> {
    let rust_log_filter = std::env::var("RUST_LOG")
        .ok()
        .and_then(|rust_log| Targets::from_str(&rust_log).ok())
        .unwrap_or_else(|| Targets::new().with_default(Level::INFO));

    let stdout_log = tracing_subscriber::fmt::layer()
        .compact()
        .with_level(true)
        .with_target(true)
        .with_ansi(true)
        .with_filter(rust_log_filter);

    tracing_subscriber::registry().with(stdout_log).try_init()
}
