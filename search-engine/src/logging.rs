//! Tracing subscriber setup.

use std::env;

use tracing_subscriber::EnvFilter;

use crate::AppError;

/// Install the global subscriber.
///
/// `RUST_LOG` selects filters (default `info`). `LOG_FORMAT=json` switches to
/// JSON lines.
pub fn init() -> Result<(), AppError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = env::var("LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    result.map_err(|e| AppError::config(format!("Failed to initialize logging: {}", e)))
}
