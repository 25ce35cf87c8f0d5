//! Environment variable parsing utilities.
//!
//! The debugger reads its run configuration (output directory, cache directory,
//! feature toggles) from the environment. These helpers keep that parsing in
//! one place:
//!
//! ```
//! use debugger_types::env_utils::{env_bool_or, env_path};
//!
//! let output = env_path("EXECUTION_DEBUGGER_OUTPUT_DIR");
//! let cache_enabled = !env_bool_or("EXECUTION_DEBUGGER_NO_CACHE", false);
//! ```

use std::path::PathBuf;
use std::str::FromStr;

/// Parse an environment variable into a type that implements `FromStr`.
///
/// Returns `None` if the variable is not set or cannot be parsed.
pub fn env_var<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

/// Parse an environment variable with a default value.
pub fn env_var_or<T: FromStr>(key: &str, default: T) -> T {
    env_var(key).unwrap_or(default)
}

/// Check if an environment variable is set to a truthy value.
///
/// Returns `true` for "1", "true", "yes", or "on" (case-insensitive).
pub fn env_bool(key: &str) -> bool {
    env_bool_or(key, false)
}

/// Truthy check with an explicit default for unset variables.
pub fn env_bool_or(key: &str, default: bool) -> bool {
    match std::env::var(key).ok() {
        Some(v) => matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        None => default,
    }
}

/// Directory path from the environment; empty values count as unset.
pub fn env_path(key: &str) -> Option<PathBuf> {
    env_var::<String>(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}
