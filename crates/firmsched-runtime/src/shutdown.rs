//! Two-phase shutdown state machine.
//!
//! `shutdown()` is the port of a non-local jump to a fixed handler: instead
//! of `setjmp`/`longjmp`, it panics with a private payload type that only
//! this module can construct, caught exactly once at [`crate::Scheduler::run`]'s
//! top level. Any other panic payload is not ours and is re-raised rather
//! than swallowed.

use firmsched_core::reason::ShutdownReason;
use firmsched_core::status::ShutdownStatus;

use crate::hooks::Hooks;
use crate::irq;
use crate::Scheduler;

/// The shutdown signal's panic payload. Not publicly constructible: the
/// only way to produce one is through [`Scheduler::shutdown`].
pub(crate) struct ShutdownSignal(pub(crate) ShutdownReason);

impl<H: Hooks> Scheduler<H> {
    /// Performs the non-local jump to the shutdown landing pad. Never
    /// returns to its caller; unwinds (via a private panic payload) up to
    /// [`Scheduler::run`], which drives [`Scheduler::run_shutdown`].
    pub fn shutdown(&mut self, reason: ShutdownReason) -> ! {
        if self.shutdown_reason == ShutdownReason::UNSET {
            self.shutdown_reason = reason;
        }
        std::panic::panic_any(ShutdownSignal(reason))
    }

    /// Invokes [`Scheduler::shutdown`] only if not already shutting down.
    pub fn try_shutdown(&mut self, reason: ShutdownReason) {
        if self.shutdown_status == ShutdownStatus::Normal {
            self.shutdown(reason);
        }
    }

    /// Transitions `Shutdown -> Normal`. A no-op during `InProgress`.
    /// Calling this while `Normal` is itself a shutdown-inducing error.
    pub fn clear_shutdown(&mut self) {
        match self.shutdown_status {
            ShutdownStatus::Shutdown => self.shutdown_status = ShutdownStatus::Normal,
            ShutdownStatus::InProgress => {}
            ShutdownStatus::Normal => self.shutdown(ShutdownReason::SHUTDOWN_NOT_PENDING),
        }
    }

    /// True iff the scheduler is not in the `Normal` state.
    pub fn is_shutdown(&self) -> bool {
        self.shutdown_status.is_shutdown()
    }

    pub fn shutdown_reason(&self) -> ShutdownReason {
        self.shutdown_reason
    }

    /// The shutdown landing pad. Disables the interrupt stub, latches the
    /// reason, resets the timer queue, runs the host's shutdown hook, then
    /// re-enables the stub and reports the transition. Leaves the scheduler
    /// in `Shutdown`, not the process: the caller's task loop resumes after
    /// this returns.
    pub(crate) fn run_shutdown(&mut self, reason: ShutdownReason) {
        let _guard = irq::IrqGuard::acquire();

        if self.shutdown_reason == ShutdownReason::UNSET {
            self.shutdown_reason = reason;
        }
        self.shutdown_status = ShutdownStatus::InProgress;

        let now = self.clock.last_read_time();
        self.timers.reset(now);
        self.hooks.run_shutdownfuncs(self.shutdown_reason);

        self.shutdown_status = ShutdownStatus::Shutdown;

        drop(_guard);

        self.hooks.sendf(&format!(
            "shutdown clock={} reason={}",
            now, self.shutdown_reason
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuntimeConfig;
    use std::panic::AssertUnwindSafe;

    struct RecordingHooks {
        shutdown_runs: u32,
        last_reason: Option<ShutdownReason>,
    }

    impl Hooks for RecordingHooks {
        fn run_initfuncs(&mut self) {}
        fn run_taskfuncs(&mut self) {}
        fn run_shutdownfuncs(&mut self, reason: ShutdownReason) {
            self.shutdown_runs += 1;
            self.last_reason = Some(reason);
        }
    }

    fn new_sched() -> Scheduler<RecordingHooks> {
        Scheduler::new(RuntimeConfig::new(), RecordingHooks { shutdown_runs: 0, last_reason: None })
    }

    #[test]
    fn shutdown_panics_with_private_signal() {
        let mut sched = new_sched();
        let result = std::panic::catch_unwind(AssertUnwindSafe(|| {
            sched.shutdown(ShutdownReason::HOST_REQUEST);
        }));
        assert!(result.is_err());
        assert_eq!(sched.shutdown_reason(), ShutdownReason::HOST_REQUEST);
    }

    #[test]
    fn run_shutdown_resets_queue_and_reports_reason() {
        let mut sched = new_sched();
        sched.timers.add(0, 1000, |_| firmsched_core::outcome::DispatchOutcome::Done).unwrap();
        assert_eq!(sched.timers.len(), 1);

        sched.run_shutdown(ShutdownReason::TIMER_TOO_CLOSE);

        assert_eq!(sched.timers.len(), 0);
        assert!(sched.is_shutdown());
        assert_eq!(sched.hooks.shutdown_runs, 1);
        assert_eq!(sched.hooks.last_reason, Some(ShutdownReason::TIMER_TOO_CLOSE));
    }

    #[test]
    fn try_shutdown_is_noop_once_already_shutting_down() {
        let mut sched = new_sched();
        sched.run_shutdown(ShutdownReason::HOST_REQUEST);
        // shutdown_status is now Shutdown, not Normal, so try_shutdown must not panic.
        sched.try_shutdown(ShutdownReason::TIMER_TOO_CLOSE);
        assert_eq!(sched.shutdown_reason(), ShutdownReason::HOST_REQUEST);
    }

    #[test]
    fn clear_shutdown_returns_to_normal() {
        let mut sched = new_sched();
        sched.run_shutdown(ShutdownReason::HOST_REQUEST);
        assert!(sched.is_shutdown());
        sched.clear_shutdown();
        assert_eq!(sched.shutdown_status, ShutdownStatus::Normal);
    }

    #[test]
    fn clear_shutdown_while_normal_is_itself_fatal() {
        let mut sched = new_sched();
        let result = std::panic::catch_unwind(AssertUnwindSafe(|| {
            sched.clear_shutdown();
        }));
        assert!(result.is_err());
    }
}
