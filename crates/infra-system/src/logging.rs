//! Console logging setup for embedding applications.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global console subscriber.
///
/// The filter defaults to `docbatch=info`; set `RUST_LOG` to override
/// it. Returns `true` if this call installed the subscriber, `false`
/// when one is already in place (later calls are no-ops).
pub fn init_logging() -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("docbatch=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .try_init()
        .is_ok()
}
