//! # firmsched-runtime
//!
//! Process-level scheduler built on [`firmsched_core`]: a wall-clock-backed
//! tick clock, a dispatch loop, a cooperative task runner, and a two-phase
//! shutdown controller, assembled into a single [`Scheduler`].
//!
//! ## Modules
//!
//! - `clock` - wall-time-anchored tick clock
//! - `dispatch` - the per-wake timer dispatch loop
//! - `task_runner` - the cooperative main loop
//! - `shutdown` - the shutdown state machine and its non-local jump
//! - `hooks` - the trait a host implements to plug into the scheduler
//! - `config` - process-start configuration
//! - `log` - leveled structured logging
//! - `irq` - critical-section contract placeholders

#![allow(dead_code)]

pub mod clock;
pub mod config;
pub mod dispatch;
pub mod hooks;
pub mod irq;
pub mod log;
pub mod shutdown;
pub mod task_runner;

pub use clock::TickClock;
pub use config::{ConfigError, RuntimeConfig};
pub use hooks::Hooks;
pub use log::LogLevel;

use std::sync::Arc;

use firmsched_core::reason::ShutdownReason;
use firmsched_core::status::{ShutdownStatus, TasksStatus};
use firmsched_core::timer::TimerQueue;
use firmsched_core::wake::WakeFlag;

/// Ties the tick clock, timer queue, task-runner status, and shutdown state
/// together, driven by a host-supplied [`Hooks`] implementation.
pub struct Scheduler<H: Hooks> {
    pub(crate) clock: TickClock,
    pub(crate) timers: TimerQueue,
    pub(crate) tasks_status: TasksStatus,
    pub(crate) tasks_busy: TasksStatus,
    pub(crate) tasks_wake: Arc<WakeFlag>,
    pub(crate) shutdown_status: ShutdownStatus,
    pub(crate) shutdown_reason: ShutdownReason,
    pub(crate) must_wake_timers: bool,
    pub(crate) next_wake: u32,
    pub(crate) config: RuntimeConfig,
    pub(crate) hooks: H,
}

impl<H: Hooks> Scheduler<H> {
    /// Builds a scheduler anchored at the current instant, with the timer
    /// queue's periodic/sentinel pair already armed.
    pub fn new(config: RuntimeConfig, hooks: H) -> Self {
        let level = if config.debug { LogLevel::Debug } else { parse_log_level(&config.log_level) };
        log::set_log_level(level);
        let mut clock = TickClock::new(config.clock_freq);
        let now = clock.read_time();
        let timers = TimerQueue::new(config.clock_freq, now);
        Self {
            clock,
            timers,
            tasks_status: TasksStatus::Idle,
            tasks_busy: TasksStatus::Idle,
            tasks_wake: Arc::new(WakeFlag::new()),
            shutdown_status: ShutdownStatus::Normal,
            shutdown_reason: ShutdownReason::UNSET,
            must_wake_timers: true,
            next_wake: now,
            config,
            hooks,
        }
    }

    /// Returns a cloneable handle onto this scheduler's task-wake flag.
    ///
    /// A timer callback (or any other `'static` subsystem) captures this
    /// handle and calls [`WakeFlag::wake`] on it to make the task loop
    /// runnable again — the thing `wake_tasks` cannot do, since it takes
    /// `&mut Scheduler` and a boxed timer callback has no way back into the
    /// scheduler that owns it.
    pub fn tasks_wake_handle(&self) -> Arc<WakeFlag> {
        self.tasks_wake.clone()
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    pub fn hooks_mut(&mut self) -> &mut H {
        &mut self.hooks
    }

    pub fn timers(&self) -> &TimerQueue {
        &self.timers
    }

    pub fn timers_mut(&mut self) -> &mut TimerQueue {
        &mut self.timers
    }

    pub fn clock(&self) -> &TickClock {
        &self.clock
    }

    /// Registers a timer at `waketime`. If it becomes the new head,
    /// `must_wake_timers` is set so the next `irq_poll` dispatches it.
    /// Fails the same way [`TimerQueue::add`] does if the new head's
    /// waketime is already in the past.
    pub fn add_timer(
        &mut self,
        waketime: u32,
        callback: impl FnMut(u32) -> firmsched_core::outcome::DispatchOutcome + 'static,
    ) -> firmsched_core::CoreResult<firmsched_core::TimerId> {
        let now = self.clock.last_read_time();
        let (id, became_head) = self.timers.add(now, waketime, callback)?;
        if became_head {
            self.must_wake_timers = true;
        }
        Ok(id)
    }

    /// Removes a previously-registered timer.
    pub fn del_timer(&mut self, id: firmsched_core::TimerId) -> firmsched_core::CoreResult<()> {
        self.timers.del(id)
    }
}

fn parse_log_level(level: &str) -> LogLevel {
    match level {
        "off" => LogLevel::Off,
        "error" => LogLevel::Error,
        "warn" => LogLevel::Warn,
        "debug" => LogLevel::Debug,
        "trace" => LogLevel::Trace,
        _ => LogLevel::Info,
    }
}
