//! Stress test - many simultaneously-due timers.
//!
//! Registers a large batch of timers clustered around "now" so the dispatch
//! loop's budget (`TIMER_REPEAT_COUNT`) is exhausted many times over within
//! a single `dispatch()` call, exercising the busy-wait / yield-to-tasks
//! path instead of the common "next timer is far away" one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use firmsched_core::constants::TIMER_REPEAT_COUNT;
use firmsched_core::outcome::DispatchOutcome;
use firmsched_core::reason::ShutdownReason;
use firmsched_runtime::{Hooks, RuntimeConfig, Scheduler};

struct StressHooks {
    completed: Arc<AtomicU64>,
    total: u64,
    start: Instant,
    last_report: Instant,
}

impl Hooks for StressHooks {
    fn run_initfuncs(&mut self) {
        println!("stress: init complete");
    }

    fn run_taskfuncs(&mut self) {
        let done = self.completed.load(Ordering::Relaxed);

        if self.last_report.elapsed().as_millis() >= 200 {
            print!("\rCompleted: {}/{}", done, self.total);
            let _ = std::io::Write::flush(&mut std::io::stdout());
            self.last_report = Instant::now();
        }

        if done >= self.total {
            let elapsed = self.start.elapsed();
            println!("\n\n=== Results ===");
            println!("Total timers: {}", self.total);
            println!("Completed:    {}", done);
            println!("Total time:   {:?}", elapsed);
            println!(
                "Throughput:   {:.0} timers/sec",
                self.total as f64 / elapsed.as_secs_f64()
            );
            std::process::exit(0);
        }

        if elapsed_too_long(self.start) {
            println!("\nTimeout! Only {}/{} completed", done, self.total);
            std::process::exit(1);
        }
    }

    fn run_shutdownfuncs(&mut self, reason: ShutdownReason) {
        println!("stress: unexpected shutdown, reason={}", reason);
        std::process::exit(1);
    }
}

fn elapsed_too_long(start: Instant) -> bool {
    start.elapsed().as_secs() > 30
}

fn main() {
    println!("=== Firmsched Stress Test ===\n");

    let total: u64 = std::env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(u64::from(TIMER_REPEAT_COUNT) * 50);

    println!("Registering {} simultaneously-due timers...", total);

    let config = RuntimeConfig::from_env().debug(true);
    let completed = Arc::new(AtomicU64::new(0));
    let start = Instant::now();

    let hooks = StressHooks { completed: completed.clone(), total, start, last_report: Instant::now() };
    let mut sched = Scheduler::new(config, hooks);

    // Timer callbacks only hold this handle, never `&mut Scheduler`; each
    // one wakes the task loop itself after it fires so `run_taskfuncs` gets
    // to recheck completion instead of parking forever after the first run.
    let tasks_wake = sched.tasks_wake_handle();

    let now = sched.clock().last_read_time();
    for i in 0..total {
        let completed = completed.clone();
        let tasks_wake = tasks_wake.clone();
        // Spread a third of the timers a few ticks into the future so the
        // dispatch loop also has to requeue and revisit its own budget
        // check rather than draining one giant already-due batch.
        let waketime = now.wrapping_add((i % 3) as u32);
        sched
            .add_timer(waketime, move |_t| {
                completed.fetch_add(1, Ordering::Relaxed);
                tasks_wake.wake();
                DispatchOutcome::Done
            })
            .expect("stress timers must not already be due in the past");

        if (i + 1) % 1000 == 0 {
            print!("\rRegistered: {}/{}", i + 1, total);
        }
    }
    println!();

    sched.wake_tasks();
    println!("\nWaiting for completion...");
    sched.run();
}
