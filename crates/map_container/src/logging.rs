//! Tracing bootstrap for hosts embedding the map.
//!
//! The filter comes from `RUST_LOG` when set, otherwise from the default
//! passed by the host.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};

pub const DEFAULT_LOG_FILTER: &str = "info";

/// Installs a global fmt subscriber. Fails if one is already installed.
pub fn init_logging(default_filter: &str) -> Result<(), TryInitError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .compact();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
}
