//! Wall-time-anchored tick clock.
//!
//! `start_sec` in the original design becomes a single fixed [`Instant`]
//! origin here: every tick read is `origin.elapsed()` converted to ticks at
//! `clock_freq` Hz, truncated to `u32` for the wrap-around the rest of the
//! core assumes.

use std::time::{Duration, Instant};

use firmsched_core::ticks::{from_us, is_before};

/// Converts monotonic wall time into the 32-bit tick domain the rest of the
/// core operates in, and caches the most recent reading.
pub struct TickClock {
    origin: Instant,
    clock_freq: u32,
    last_read_time: u32,
}

impl TickClock {
    /// Anchors the clock at the current instant; tick 0 corresponds to now.
    pub fn new(clock_freq: u32) -> Self {
        Self { origin: Instant::now(), clock_freq, last_read_time: 0 }
    }

    fn ticks_since_origin(&self) -> u32 {
        let elapsed = self.origin.elapsed();
        let whole = (elapsed.as_secs() as u64).wrapping_mul(self.clock_freq as u64);
        let frac = (elapsed.subsec_nanos() as u64 * self.clock_freq as u64) / 1_000_000_000;
        whole.wrapping_add(frac) as u32
    }

    /// Samples wall time, converts to ticks, and caches the result.
    pub fn read_time(&mut self) -> u32 {
        self.last_read_time = self.ticks_since_origin();
        self.last_read_time
    }

    /// The most recent value returned by [`read_time`](Self::read_time),
    /// without sampling the clock again.
    pub fn last_read_time(&self) -> u32 {
        self.last_read_time
    }

    /// Converts a microsecond duration into ticks at this clock's frequency.
    pub fn from_us(&self, us: u32) -> u32 {
        from_us(us, self.clock_freq)
    }

    pub fn clock_freq(&self) -> u32 {
        self.clock_freq
    }

    /// True iff `last_read_time` is at or past `*deadline`; on true, advances
    /// `*deadline` two seconds further out. Used by hooks that want a cheap
    /// periodic cadence (e.g. stats reporting) without tracking their own
    /// wall-clock state.
    pub fn check_periodic(&self, deadline: &mut u32) -> bool {
        if is_before(self.last_read_time, *deadline) {
            return false;
        }
        *deadline = self.last_read_time.wrapping_add(from_us(2_000_000, self.clock_freq));
        true
    }

    /// Real-time duration remaining until `tick`, or `Duration::ZERO` if
    /// `tick` is already at or before `last_read_time`. Used by the task
    /// runner to size its idle sleep.
    pub fn duration_until(&self, tick: u32) -> Duration {
        if !is_before(self.last_read_time, tick) {
            return Duration::ZERO;
        }
        let delta_ticks = tick.wrapping_sub(self.last_read_time) as u64;
        Duration::from_nanos(delta_ticks.saturating_mul(1_000_000_000) / self.clock_freq as u64)
    }
}
