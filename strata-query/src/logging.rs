//! Logging setup for Strata.
//!
//! Logging is controlled by the `STRATA_DEBUG` environment variable.
//!
//! # Environment Variables
//!
//! - `STRATA_DEBUG=true` / `STRATA_DEBUG=1` - Enable debug logging
//! - `STRATA_LOG_LEVEL=debug|info|warn|error|trace` - Set specific log level
//! - `STRATA_LOG_FORMAT=json|pretty|compact` - Set output format (default: json)
//!
//! # Usage
//!
//! ```rust,no_run
//! use strata_query::logging;
//!
//! // Initialize logging (call once at startup)
//! logging::init();
//! ```
//!
//! Inside Strata the plain `tracing` macros are used. Relation resolution
//! logs at `debug`, memo hits at `trace`, and every executed statement at
//! `debug` with `sql` and `args` fields.

use std::env;
use std::sync::Once;

use strata_schema::config::DebugConfig;

static INIT: Once = Once::new();

/// Check if debug logging is enabled via `STRATA_DEBUG`.
///
/// Returns `true` if `STRATA_DEBUG` is set to "true", "1", or "yes" (case-insensitive).
#[inline]
pub fn is_debug_enabled() -> bool {
    env::var("STRATA_DEBUG")
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

fn normalize_level(level: &str) -> Option<&'static str> {
    match level.to_lowercase().as_str() {
        "trace" => Some("trace"),
        "debug" => Some("debug"),
        "info" => Some("info"),
        "warn" => Some("warn"),
        "error" => Some("error"),
        _ => None,
    }
}

/// Get the configured log level.
///
/// `STRATA_LOG_LEVEL` wins, then `STRATA_DEBUG` (debug), then `fallback`.
pub fn get_log_level_or(fallback: &str) -> &'static str {
    if let Some(level) = env::var("STRATA_LOG_LEVEL").ok().and_then(|l| normalize_level(&l)) {
        return level;
    }
    if is_debug_enabled() {
        return "debug";
    }
    normalize_level(fallback).unwrap_or("warn")
}

/// Get the configured log level, defaulting to "warn".
pub fn get_log_level() -> &'static str {
    get_log_level_or("warn")
}

/// Get the configured log format from `STRATA_LOG_FORMAT`.
///
/// Defaults to "json".
pub fn get_log_format() -> &'static str {
    env::var("STRATA_LOG_FORMAT")
        .map(|f| match f.to_lowercase().as_str() {
            "pretty" => "pretty",
            "compact" => "compact",
            _ => "json",
        })
        .unwrap_or("json")
}

/// Initialize the Strata logging system.
///
/// Subsequent calls are no-ops. Does nothing unless `STRATA_DEBUG` or
/// `STRATA_LOG_LEVEL` is set.
pub fn init() {
    if !is_debug_enabled() && env::var("STRATA_LOG_LEVEL").is_err() {
        return;
    }
    install(get_log_level());
}

/// Initialize logging from the `[debug]` section of `strata.toml`.
///
/// Environment variables still take precedence over the configured level.
pub fn init_from_config(config: &DebugConfig) {
    let level = get_log_level_or(&config.level);
    if config.log_queries || is_debug_enabled() || env::var("STRATA_LOG_LEVEL").is_ok() {
        install(if config.log_queries && level != "trace" { "debug" } else { level });
    }
}

#[allow(unused_variables)]
fn install(level: &'static str) {
    INIT.call_once(|| {
        #[cfg(feature = "tracing-subscriber")]
        {
            use tracing_subscriber::{EnvFilter, fmt, prelude::*};

            let filter = EnvFilter::try_new(format!(
                "strata={level},strata_query={level},strata_schema={level},strata_sqlite={level}"
            ))
            .unwrap_or_else(|_| EnvFilter::new("warn"));

            let registry = tracing_subscriber::registry().with(filter);
            let result = match get_log_format() {
                "json" => registry.with(fmt::layer().json()).try_init(),
                "compact" => registry.with(fmt::layer().compact()).try_init(),
                _ => registry.with(fmt::layer().pretty()).try_init(),
            };

            if result.is_ok() {
                tracing::info!(level = level, format = get_log_format(), "Strata logging initialized");
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_level() {
        assert_eq!(normalize_level("DEBUG"), Some("debug"));
        assert_eq!(normalize_level("verbose"), None);
    }

    #[test]
    fn test_log_level_default() {
        // SAFETY: Test runs in isolation
        unsafe {
            env::remove_var("STRATA_DEBUG");
            env::remove_var("STRATA_LOG_LEVEL");
        }
        assert!(!is_debug_enabled());
        assert_eq!(get_log_level(), "warn");
        assert_eq!(get_log_level_or("info"), "info");
        assert_eq!(get_log_level_or("nonsense"), "warn");
    }
}
