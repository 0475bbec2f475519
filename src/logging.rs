//! Logging setup for the `fanout` binary.
//!
//! Logs go to stderr so `generate --json` and SVG output on stdout stay
//! clean. Default level is `query_fanout=info`; set `RUST_LOG` to override.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub const DEFAULT_FILTER: &str = "query_fanout=info";

/// Installs the global subscriber. Calling it twice is a no-op.
pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose {
            "query_fanout=debug"
        } else {
            DEFAULT_FILTER
        })
    });

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init();
}
