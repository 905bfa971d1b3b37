// logging.rs — Logging initialization.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Default directives when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info,interframe=debug,wgpu=warn,naga=warn";

/// Install the global `tracing` subscriber.
///
/// Filtering follows `RUST_LOG` when present, otherwise [`DEFAULT_FILTER`].
/// Calling this twice is harmless: the second registration is ignored.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .try_init();
}
