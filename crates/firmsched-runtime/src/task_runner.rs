//! The cooperative task-runner main loop.

use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

use firmsched_core::status::TasksStatus;
use firmsched_core::wake::WakeFlag;

use crate::hooks::Hooks;
use crate::shutdown::ShutdownSignal;
use crate::Scheduler;

/// Marks `flag` as woken. The single function subsystems use to make
/// themselves runnable from a timer callback.
pub fn wake_task(flag: &WakeFlag) {
    flag.wake();
}

/// Tests and clears `flag`, returning whether it was set.
pub fn check_wake(flag: &WakeFlag) -> bool {
    flag.check()
}

impl<H: Hooks> Scheduler<H> {
    /// Makes the task loop runnable. The single function timers and
    /// subsystems use to signal `run_taskfuncs` should run again.
    pub fn wake_tasks(&mut self) {
        self.tasks_status = TasksStatus::Requested;
    }

    /// Returns true iff tasks never idled between the previous call and
    /// this one (`tasks_busy` was at or above `Requested` at entry), then
    /// latches `tasks_busy` to the current status. Gives the dispatch loop
    /// its fairness signal: true means tasks are contending for CPU and the
    /// dispatcher should yield rather than keep draining the timer queue.
    pub(crate) fn check_set_tasks_busy(&mut self) -> bool {
        let was_busy = self.tasks_busy >= TasksStatus::Requested;
        self.tasks_busy = self.tasks_status;
        was_busy
    }

    /// Polls for pending work: dispatches ready timers if
    /// `must_wake_timers` is set (directly, or because wall time has
    /// reached the deferred `next_wake`), then promotes `tasks_status` to
    /// `Requested` if anything called `wake_tasks` or woke the shared
    /// `tasks_wake` handle (the path a timer callback uses, since it only
    /// holds that handle, not `&mut Scheduler`).
    fn irq_poll(&mut self) {
        if !self.must_wake_timers && !firmsched_core::ticks::is_before(self.clock.read_time(), self.next_wake) {
            self.must_wake_timers = true;
        }
        if self.must_wake_timers {
            self.dispatch();
        }
        if self.tasks_wake.check() {
            self.tasks_status = TasksStatus::Requested;
        }
    }

    /// Sleeps a short, configurable slice and polls again. The only
    /// suspension point besides the dispatcher's busy-wait.
    fn irq_wait(&mut self) {
        std::thread::sleep(Duration::from_micros(self.config.idle_sleep_us));
        self.irq_poll();
    }

    /// One iteration of the task loop: poll, idle until requested, run the
    /// host's task functions once, report stats.
    fn step(&mut self) {
        self.irq_poll();

        if self.tasks_status != TasksStatus::Requested {
            self.tasks_status = TasksStatus::Idle;
            self.tasks_busy = TasksStatus::Idle;
            while self.tasks_status != TasksStatus::Requested {
                self.irq_wait();
            }
        }

        self.tasks_status = TasksStatus::Running;
        let start = self.clock.read_time();
        self.hooks.run_taskfuncs();
        let cur = self.clock.read_time();
        self.hooks.stats_update(start, cur);
    }

    /// Runs the task loop forever. Installs the shutdown landing pad: a
    /// caught panic carrying a [`ShutdownSignal`] drives `run_shutdown` and
    /// the loop resumes: a shutdown is a degraded-but-running state, not
    /// process termination. Any other panic is not ours to handle and is
    /// re-raised unchanged.
    pub fn run(&mut self) -> ! {
        self.hooks.run_initfuncs();
        loop {
            let result = panic::catch_unwind(AssertUnwindSafe(|| loop {
                self.step();
            }));
            match result {
                Ok(()) => unreachable!("the task loop above never returns Ok"),
                Err(payload) => match payload.downcast::<ShutdownSignal>() {
                    Ok(signal) => self.run_shutdown(signal.0),
                    Err(other) => panic::resume_unwind(other),
                },
            }
        }
    }
}
