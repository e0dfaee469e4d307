//! Scheduler configuration.
//!
//! Compile-time defaults with environment-variable overrides, same layering
//! the reference runtime's own `SchedulerConfig::from_env` uses.

use firmsched_core::env::{env_get, env_get_bool, env_get_str};

mod defaults {
    pub const CLOCK_FREQ: u32 = firmsched_core::constants::CLOCK_FREQ;
    pub const DEBUG: bool = false;
    pub const LOG_LEVEL: &str = "info";
    pub const LOG_TIME: bool = false;
    pub const IDLE_SLEEP_US: u64 = 1_000;
}

/// Process-start configuration for a [`crate::Scheduler`].
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Tick-clock frequency in Hz.
    pub clock_freq: u32,
    /// Enables debug-level logging regardless of `log_level`.
    pub debug: bool,
    /// Logging verbosity: off/error/warn/info/debug/trace.
    pub log_level: String,
    /// Prefix log lines with elapsed time.
    pub log_time: bool,
    /// Host-process sleep granularity for the task runner's idle cycle.
    pub idle_sleep_us: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl RuntimeConfig {
    /// Builds configuration from compile-time defaults with environment
    /// overrides.
    ///
    /// Environment variables (all optional):
    /// - `FSIM_CLOCK_FREQ` - tick-clock frequency in Hz
    /// - `FSIM_DEBUG` - enable debug-level logging (0/1)
    /// - `FSIM_LOG_LEVEL` - off/error/warn/info/debug/trace
    /// - `FSIM_LOG_TIME` - prefix log lines with elapsed time (0/1)
    /// - `FSIM_IDLE_SLEEP_US` - idle-sleep granularity in microseconds
    pub fn from_env() -> Self {
        Self {
            clock_freq: env_get("FSIM_CLOCK_FREQ", defaults::CLOCK_FREQ),
            debug: env_get_bool("FSIM_DEBUG", defaults::DEBUG),
            log_level: env_get_str("FSIM_LOG_LEVEL", defaults::LOG_LEVEL),
            log_time: env_get_bool("FSIM_LOG_TIME", defaults::LOG_TIME),
            idle_sleep_us: env_get("FSIM_IDLE_SLEEP_US", defaults::IDLE_SLEEP_US),
        }
    }

    /// Builds configuration from compile-time defaults only, ignoring the
    /// environment. Useful for tests that want reproducible values.
    pub fn new() -> Self {
        Self {
            clock_freq: defaults::CLOCK_FREQ,
            debug: defaults::DEBUG,
            log_level: defaults::LOG_LEVEL.to_string(),
            log_time: defaults::LOG_TIME,
            idle_sleep_us: defaults::IDLE_SLEEP_US,
        }
    }

    pub fn clock_freq(mut self, hz: u32) -> Self {
        self.clock_freq = hz;
        self
    }

    pub fn debug(mut self, enable: bool) -> Self {
        self.debug = enable;
        self
    }

    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    pub fn log_time(mut self, enable: bool) -> Self {
        self.log_time = enable;
        self
    }

    pub fn idle_sleep_us(mut self, us: u64) -> Self {
        self.idle_sleep_us = us;
        self
    }

    /// Validates configuration, returning the first violation found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.clock_freq == 0 {
            return Err(ConfigError::InvalidValue("clock_freq must be > 0"));
        }
        if self.idle_sleep_us == 0 {
            return Err(ConfigError::InvalidValue("idle_sleep_us must be > 0"));
        }
        match self.log_level.as_str() {
            "off" | "error" | "warn" | "info" | "debug" | "trace" => {}
            _ => return Err(ConfigError::InvalidValue("log_level must be a recognized level")),
        }
        Ok(())
    }

    /// Prints configuration to stderr (debugging aid).
    pub fn print(&self) {
        eprintln!("firmsched configuration:");
        eprintln!("  clock_freq:    {}", self.clock_freq);
        eprintln!("  debug:         {}", self.debug);
        eprintln!("  log_level:     {}", self.log_level);
        eprintln!("  log_time:      {}", self.log_time);
        eprintln!("  idle_sleep_us: {}", self.idle_sleep_us);
    }
}

/// Configuration validation error.
#[derive(Debug, Clone)]
pub enum ConfigError {
    InvalidValue(&'static str),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidValue(msg) => write!(f, "invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_env_defaults_are_valid() {
        let config = RuntimeConfig::new();
        assert!(config.validate().is_ok());
        assert_eq!(config.clock_freq, firmsched_core::constants::CLOCK_FREQ);
    }

    #[test]
    fn builder_overrides_fields() {
        let config = RuntimeConfig::new().clock_freq(1_000_000).debug(true).idle_sleep_us(50);
        assert_eq!(config.clock_freq, 1_000_000);
        assert!(config.debug);
        assert_eq!(config.idle_sleep_us, 50);
    }

    #[test]
    fn zero_clock_freq_is_invalid() {
        let config = RuntimeConfig::new().clock_freq(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn unrecognized_log_level_is_invalid() {
        let config = RuntimeConfig::new().log_level("verbose");
        assert!(config.validate().is_err());
    }

    #[test]
    fn env_override_is_applied() {
        std::env::set_var("__FSIM_TEST_CONFIG_CLOCK__", "5000000");
        let val: u32 = env_get("__FSIM_TEST_CONFIG_CLOCK__", 1u32);
        assert_eq!(val, 5_000_000);
        std::env::remove_var("__FSIM_TEST_CONFIG_CLOCK__");
    }
}
