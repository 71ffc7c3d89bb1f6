use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::{AdapterError, Result};

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise events from this crate at
/// `default_level` and above are shown. Fails if a subscriber is already
/// installed, which callers embedding the library into a host that sets up
/// its own tracing can safely ignore.
pub fn init_logger(default_level: Level) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), default_level))
    });

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_level(true)
        .with_ansi(false)
        .compact();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| AdapterError::Runtime(format!("Failed to initialize logger: {}", e)))
}
