//! Environment variable utilities.
//!
//! Generic `env_get<T>` for parsing environment variables with defaults.
//!
//! # Usage
//!
//! ```ignore
//! use firmsched_core::env::{env_get, env_get_bool};
//!
//! let freq: u32 = env_get("FSIM_CLOCK_FREQ", 20_000_000);
//! let debug: bool = env_get_bool("FSIM_DEBUG", false);
//! ```

use std::str::FromStr;

/// Get environment variable parsed as type `T`, or return `default`.
///
/// Works with any type implementing `FromStr`.
#[inline]
pub fn env_get<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Get environment variable as a boolean.
///
/// Accepts "1", "true", "yes", "on" (case-insensitive) as true. Everything
/// else, including unset, returns `default`.
#[inline]
pub fn env_get_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(val) => matches!(val.to_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}

/// Get environment variable as an optional value.
#[inline]
pub fn env_get_opt<T>(key: &str) -> Option<T>
where
    T: FromStr,
{
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

/// Get environment variable as a string, or return `default`.
#[inline]
pub fn env_get_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Check whether an environment variable is set, regardless of value.
#[inline]
pub fn env_is_set(key: &str) -> bool {
    std::env::var(key).is_ok()
}
