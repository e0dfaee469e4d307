//! Wrap-aware tick arithmetic.
//!
//! The scheduler's clock is a 32-bit counter that wraps every `2^32` ticks.
//! Ordinary numeric comparison breaks the moment the counter wraps, so every
//! ordering decision in this crate goes through [`is_before`] instead of
//! `<`.

/// Returns true iff `a` is before `b` on the wrap-around tick counter.
///
/// Defined as `(b - a)` interpreted as a signed 32-bit value being positive,
/// i.e. `a` and `b` are within half the counter's range of each other. Two
/// equal ticks are not "before" one another.
#[inline]
pub const fn is_before(a: u32, b: u32) -> bool {
    (b.wrapping_sub(a) as i32) > 0
}

/// Converts a microsecond duration to ticks at the given clock frequency.
///
/// `clock_freq` is in Hz. Truncates toward zero; callers large enough to
/// overflow `u32` are a caller error, matching the firmware core this is
/// adapted from.
#[inline]
pub const fn from_us(us: u32, clock_freq: u32) -> u32 {
    // clock_freq is always a multiple of 1_000_000 in practice (the
    // reference default is 20_000_000), so this stays exact.
    us.wrapping_mul(clock_freq / 1_000_000)
}
