//! Setup-time errors for the scheduler core.
//!
//! These are distinct from in-band scheduler faults (which go through the
//! shutdown controller in `firmsched-runtime`): `CoreError` covers mistakes
//! the caller can still recover from, like a bad configuration value or an
//! unknown timer handle.

use core::fmt;

/// Result type for fallible core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors returned directly to a caller rather than driving a shutdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A configuration value failed validation.
    InvalidConfig(&'static str),
    /// `TimerId` does not refer to a timer in this queue.
    UnknownTimer,
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreError::InvalidConfig(msg) => write!(f, "invalid configuration: {}", msg),
            CoreError::UnknownTimer => write!(f, "timer id not found in this queue"),
        }
    }
}

impl std::error::Error for CoreError {}
