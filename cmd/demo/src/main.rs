//! Demo: a periodic status timer plus the basic-order and self-reschedule
//! scenarios, run long enough to watch them dispatch in waketime order.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use firmsched_core::outcome::DispatchOutcome;
use firmsched_core::reason::ShutdownReason;
use firmsched_runtime::{finfo, Hooks, RuntimeConfig, Scheduler};

struct DemoHooks {
    task_iterations: u32,
    basic_order_done: Arc<AtomicU32>,
    self_reschedule_done: Arc<AtomicU32>,
}

impl Hooks for DemoHooks {
    fn run_initfuncs(&mut self) {
        finfo!("demo: init complete");
    }

    fn run_taskfuncs(&mut self) {
        self.task_iterations += 1;
        let scenarios_done = self.basic_order_done.load(Ordering::Relaxed) >= 3
            && self.self_reschedule_done.load(Ordering::Relaxed) >= 1;
        if self.task_iterations >= 50 && scenarios_done {
            finfo!("demo: all scenarios complete, exiting");
            std::process::exit(0);
        }
    }

    fn run_shutdownfuncs(&mut self, reason: ShutdownReason) {
        finfo!("demo: shutdown hook ran, reason={}", reason);
    }

    fn stats_update(&mut self, start: u32, cur: u32) {
        let _ = (start, cur);
    }
}

fn main() {
    firmsched_runtime::log::init();

    let config = RuntimeConfig::from_env();
    config.print();

    let basic_order_done = Arc::new(AtomicU32::new(0));
    let self_reschedule_done = Arc::new(AtomicU32::new(0));

    let hooks = DemoHooks {
        task_iterations: 0,
        basic_order_done: basic_order_done.clone(),
        self_reschedule_done: self_reschedule_done.clone(),
    };
    let mut sched = Scheduler::new(config, hooks);

    let now = sched.clock().last_read_time();
    let clock_freq = sched.config().clock_freq;
    let from_us = |us: u32| firmsched_core::ticks::from_us(us, clock_freq);

    // Every timer below captures this handle instead of `&mut Scheduler`
    // (which a boxed 'static callback can never hold) and calls `.wake()`
    // on it to make the task loop runnable again once it fires.
    let tasks_wake = sched.tasks_wake_handle();

    // Periodic status timer: reschedules itself every 10ms, prints a
    // heartbeat, runs forever (the demo exits the process independently).
    {
        let tasks_wake = tasks_wake.clone();
        sched
            .add_timer(now.wrapping_add(from_us(10_000)), move |waketime| {
                finfo!("demo: status heartbeat at waketime={}", waketime);
                tasks_wake.wake();
                DispatchOutcome::Reschedule(waketime.wrapping_add(from_us(10_000)))
            })
            .expect("status timer must not already be due");
    }

    // Scenario 1, basic order: B, A, C by waketime despite insertion order A, B, C.
    for (label, delay_us) in [("A", 1_000), ("B", 500), ("C", 2_000)] {
        let basic_order_done = basic_order_done.clone();
        let tasks_wake = tasks_wake.clone();
        sched
            .add_timer(now.wrapping_add(from_us(delay_us)), move |_waketime| {
                finfo!("demo: basic-order timer {} fired", label);
                basic_order_done.fetch_add(1, Ordering::Relaxed);
                tasks_wake.wake();
                DispatchOutcome::Done
            })
            .expect("basic-order timers must not already be due");
    }

    // Scenario 2, self-reschedule: X pushes its own waketime out by 100us
    // each time it fires, five times, then completes.
    let reschedules_left = Arc::new(std::sync::atomic::AtomicU32::new(5));
    {
        let reschedules_left = reschedules_left.clone();
        let self_reschedule_done = self_reschedule_done.clone();
        let tasks_wake = tasks_wake.clone();
        sched
            .add_timer(now.wrapping_add(from_us(100)), move |waketime| {
                let remaining = reschedules_left.fetch_sub(1, Ordering::Relaxed);
                finfo!("demo: self-reschedule timer X fired, {} remaining", remaining - 1);
                tasks_wake.wake();
                if remaining > 1 {
                    DispatchOutcome::Reschedule(waketime.wrapping_add(from_us(100)))
                } else {
                    self_reschedule_done.fetch_add(1, Ordering::Relaxed);
                    DispatchOutcome::Done
                }
            })
            .expect("self-reschedule timer must not already be due");
    }

    sched.wake_tasks();
    sched.run();
}
