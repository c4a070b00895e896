//! Logging infrastructure for Orbit.
//!
//! Installs a tracing subscriber writing to stderr so stdout stays clean for
//! answers and JSON output.

use std::io::IsTerminal;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{AppError, AppResult};

/// Default filter when neither the caller nor `RUST_LOG` sets one.
///
/// HTTP internals are noisy at info; keep them at warn.
const DEFAULT_FILTER: &str = "info,hyper=warn,reqwest=warn,h2=warn";

/// Initialize the tracing subscriber with stderr output.
///
/// # Arguments
/// * `log_level` - Optional filter directive (e.g., "debug", "orbit_knowledge=trace")
/// * `no_color` - Disable ANSI colors
///
/// # Example
/// ```no_run
/// use orbit_core::logging::init_logging;
///
/// init_logging(None, false).expect("Failed to initialize logging");
/// ```
pub fn init_logging(log_level: Option<&str>, no_color: bool) -> AppResult<()> {
    let env_filter = build_filter(log_level)?;

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_ansi(!no_color && supports_color());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| AppError::Config(format!("Failed to init logging: {}", e)))?;

    Ok(())
}

fn build_filter(log_level: Option<&str>) -> AppResult<EnvFilter> {
    let directive = match log_level {
        Some(level) => level.to_string(),
        None => std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_FILTER.to_string()),
    };

    EnvFilter::try_new(&directive)
        .map_err(|e| AppError::Config(format!("Invalid log filter '{}': {}", directive, e)))
}

fn supports_color() -> bool {
    std::env::var_os("NO_COLOR").is_none() && std::io::stderr().is_terminal()
}
