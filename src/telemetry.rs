//! telemetry
//!
//! Diagnostic logging setup.
//!
//! Library code emits `tracing` events and spans; the binary installs one
//! subscriber at startup. Logs go to stderr so stdout stays clean for
//! command output. `RUST_LOG` overrides the default filter.

use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Default filter when `RUST_LOG` is unset.
pub fn default_filter(debug: bool) -> &'static str {
    if debug {
        "gozer=debug"
    } else {
        "warn"
    }
}

/// Install the global subscriber.
///
/// # Errors
///
/// Returns an error if a subscriber is already installed.
pub fn init(debug: bool) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(debug)));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(debug)
        .with_level(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to init tracing: {}", e))
}
