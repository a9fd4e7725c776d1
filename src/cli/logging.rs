//! Tracing subscriber set-up.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

const DEFAULT_FILTER: &str = "vigil=info,warn";

/// Installs a stderr subscriber filtered by `RUST_LOG`.
///
/// Falls back to `vigil=info,warn` when `RUST_LOG` is unset or invalid.
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    // A subscriber may already be installed when embedded; keep it.
    let _already_set = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}
