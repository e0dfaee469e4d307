//! Compile-time tunables for the scheduler core.
//!
//! Mirrors the defaults-module pattern the runtime layer also uses for its
//! own environment-overridable configuration: these are the fallback values,
//! not necessarily the values in force for a given process.

/// Default clock frequency in Hz, overridable via `FSIM_CLOCK_FREQ`.
pub const CLOCK_FREQ: u32 = 20_000_000;

/// How many consecutive ready timers the dispatch loop will run before
/// re-sampling the clock, while tasks are not contending for CPU.
pub const TIMER_REPEAT_COUNT: u32 = 20;

/// Same budget, relaxed while the task loop is idle.
pub const TIMER_IDLE_REPEAT_COUNT: u32 = 100;

/// The periodic timer re-arms itself this many microseconds in the future
/// each time it fires.
pub const PERIODIC_INTERVAL_US: u32 = 100_000;

/// Offset of the sentinel timer ahead of the periodic timer: half the
/// counter's range, so every legitimate waketime compares "before" it.
pub const SENTINEL_OFFSET: u32 = 0x8000_0000;

/// A dispatch running this many microseconds behind its deadline is no
/// longer recoverable and triggers a fatal shutdown.
pub const FATAL_LATENESS_US: u32 = 100_000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budgets_are_sane() {
        assert!(TIMER_REPEAT_COUNT < TIMER_IDLE_REPEAT_COUNT);
    }

    #[test]
    fn sentinel_offset_is_half_range() {
        assert_eq!(SENTINEL_OFFSET, 1u32 << 31);
    }
}
