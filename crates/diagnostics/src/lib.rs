//! Logging setup shared by the APAS crates.
//!
//! Usage:
//! - Set APAS_LOG=off (default) - no logs
//! - Set APAS_LOG=info - protocol steps (pre-flight, conflict decisions, commit)
//! - Set APAS_LOG=debug - every SQL statement and object key touched

use std::sync::Once;

// Re-export emit so macros can use it
pub use emit;

static INIT: Once = Once::new();

/// Environment variable read by [`init_diagnostics`].
pub const LOG_ENV: &str = "APAS_LOG";

fn min_level(value: &str) -> Option<emit::Level> {
    match value {
        "debug" => Some(emit::Level::Debug),
        "info" => Some(emit::Level::Info),
        "warn" => Some(emit::Level::Warn),
        "error" => Some(emit::Level::Error),
        _ => None,
    }
}

/// Initialize diagnostics based on the APAS_LOG environment variable
///
/// Safe to call multiple times; only the first call has any effect.
pub fn init_diagnostics() {
    INIT.call_once(|| {
        let log_level = std::env::var(LOG_ENV).unwrap_or_else(|_| "off".to_string());
        if log_level == "off" {
            return;
        }

        let (level, known) = match min_level(&log_level) {
            Some(level) => (level, true),
            None => (emit::Level::Info, false),
        };

        let rt = emit::setup()
            .emit_to(emit_term::stderr())
            .emit_when(emit::level::min_filter(level))
            .init();

        if !known {
            emit::warn!("Unknown {env} value {value}, using info", env: LOG_ENV, value: log_level);
        }

        // The runtime must outlive every emitter in the process.
        std::mem::forget(rt);
    });
}

/// Log protocol steps a scheduler operator wants to see in normal runs.
///
/// Examples: "Resolved location", "Converted staging table to partition"
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::emit::info!($($arg)*)
    };
}

/// Log detailed diagnostics: SQL text, object keys, catalog payloads.
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        $crate::emit::debug!($($arg)*)
    };
}

/// Log conditions that do not stop the run but should be noted,
/// such as a cleanup failure shadowed by an earlier error.
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::emit::warn!($($arg)*)
    };
}

/// Log failures that end the run.
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::emit::error!($($arg)*)
    };
}

/// Re-export the init function for convenience
pub use init_diagnostics as init;
