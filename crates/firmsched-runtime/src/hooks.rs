//! The host-supplied behavior a [`crate::Scheduler`] drives.
//!
//! `run_initfuncs`/`run_taskfuncs`/`run_shutdownfuncs` stand in for the
//! opaque function registries of the system this core is adapted from.
//! `stats_update`/`sendf`/`stepper_event` have defaults so a minimal host
//! only needs to implement the three registries.

use firmsched_core::reason::ShutdownReason;

/// Behavior a host process plugs into the scheduler.
pub trait Hooks {
    /// Runs once before the task loop starts.
    fn run_initfuncs(&mut self);

    /// Runs once per task-runner iteration while not shut down.
    fn run_taskfuncs(&mut self);

    /// Runs once when entering `run_shutdown`, after the timer queue has
    /// been reset but before the shutdown message is emitted.
    fn run_shutdownfuncs(&mut self, reason: ShutdownReason);

    /// Called after every `run_taskfuncs` with the tick range it ran in.
    /// The default does nothing; a host that wants a stats histogram
    /// overrides this the way the reference runtime's timer-thread stats
    /// sink does.
    fn stats_update(&mut self, _start: u32, _cur: u32) {}

    /// Outbound message sink backing shutdown/diagnostic reporting.
    /// Defaults to the structured logger at info level.
    fn sendf(&mut self, message: &str) {
        crate::finfo!("{}", message);
    }

    /// Fast path for a timer whose `func` would otherwise be a no-op
    /// stepper-event dispatch. Defaults to `Done`, i.e. "no such fast path
    /// is in use" — see the null-func Open Question in the design ledger.
    fn stepper_event(&mut self, _waketime: u32) -> firmsched_core::outcome::DispatchOutcome {
        firmsched_core::outcome::DispatchOutcome::Done
    }
}
