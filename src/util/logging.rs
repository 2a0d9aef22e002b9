//! Logging setup.
//!
//! The library itself only emits `tracing` events. Applications and tests
//! that want to see them call [`init_logging`] once.

use std::sync::Once;

use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable holding the filter directive (e.g. `cfd_dataset=debug`).
pub const LOG_ENV: &str = "CFD_DATASET_LOG";

static INIT: Once = Once::new();

/// Install a formatted subscriber filtered by [`LOG_ENV`], then `RUST_LOG`,
/// then `warn`. Calling it again, or after another global subscriber was
/// installed, does nothing.
pub fn init_logging() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV)
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new("warn"));

        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true));

        if tracing::subscriber::set_global_default(subscriber).is_err() {
            tracing::debug!("global tracing subscriber already installed");
        }
    });
}
