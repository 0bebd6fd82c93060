//! Tracing subscriber setup.

use std::io::IsTerminal;
use std::sync::Once;

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset or unparseable.
const DEFAULT_FILTER: &str = "info";

/// Installs a `fmt` subscriber writing to stderr, filtered by `RUST_LOG`.
///
/// Safe to call more than once (tests do); only the first call installs
/// anything. If another subscriber is already set globally, that one is
/// kept.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

        let installed = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_ansi(std::io::stderr().is_terminal())
            .try_init()
            .is_ok();

        if installed {
            tracing::debug!("tracing initialized");
        }
    });
}
