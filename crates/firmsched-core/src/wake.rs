//! The task-wake flag: a one-byte, test-and-clear signal subsystems use to
//! make themselves runnable from inside a timer callback.

use std::sync::atomic::{AtomicBool, Ordering};

/// A single wake flag.
///
/// Not a general-purpose synchronization primitive: it is only ever set from
/// the dispatch context and cleared by the task that owns it, both running
/// on the same cooperative thread, so `Relaxed` ordering is sufficient.
#[derive(Debug, Default)]
pub struct WakeFlag(AtomicBool);

impl WakeFlag {
    pub const fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    /// Marks this flag as woken.
    pub fn wake(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Tests and clears the flag, returning whether it was set.
    pub fn check(&self) -> bool {
        self.0.swap(false, Ordering::Relaxed)
    }
}
