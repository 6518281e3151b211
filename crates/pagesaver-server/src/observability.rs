//! Log output for the backend.
//!
//! The subscriber starts at `info` so config loading is visible, then
//! switches to `logging.level` once the config is known. An explicit
//! `RUST_LOG` pins the filter for the whole run.

use std::sync::OnceLock;

use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*, reload};

type FilterHandle = reload::Handle<EnvFilter, Registry>;

static FILTER: OnceLock<FilterHandle> = OnceLock::new();

const STARTUP_LEVEL: &str = "info";

fn rust_log_set() -> bool {
    std::env::var_os("RUST_LOG").is_some()
}

/// `RUST_LOG` when set and parseable, otherwise `level`.
fn initial_filter(level: &str) -> EnvFilter {
    if rust_log_set()
        && let Ok(filter) = EnvFilter::try_from_default_env()
    {
        return filter;
    }
    EnvFilter::new(level)
}

/// Installs the global subscriber at the startup level.
pub fn init_tracing() {
    init_tracing_with_level(STARTUP_LEVEL);
}

/// Installs the global subscriber. A second call leaves the first one
/// in place.
pub fn init_tracing_with_level(level: &str) {
    let (filter, handle) = reload::Layer::new(initial_filter(level));
    if tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .try_init()
        .is_ok()
    {
        let _ = FILTER.set(handle);
    }
}

/// Switches to the configured level. Returns `false` when nothing
/// changed: `RUST_LOG` is set or no subscriber was installed here.
pub fn apply_logging_level(level: &str) -> bool {
    if rust_log_set() {
        return false;
    }
    FILTER
        .get()
        .is_some_and(|handle| handle.modify(|f| *f = EnvFilter::new(level)).is_ok())
}
