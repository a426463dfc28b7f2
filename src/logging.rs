//! Logging setup for hosts embedding the timer.
//!
//! Filter directives come from `STEPTIMER_LOG` (same syntax as `RUST_LOG`),
//! defaulting to `info`. Set `STEPTIMER_LOG=steptimer=trace` to see every tick.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const LOG_ENV: &str = "STEPTIMER_LOG";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Installs a stdout subscriber. Returns `false` when a global subscriber was
/// already set, which is not an error for an embedded library.
pub fn init() -> bool {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().with_target(true))
        .try_init()
        .is_ok()
}
