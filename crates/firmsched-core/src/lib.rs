//! # firmsched-core
//!
//! Platform-agnostic types for the firmsched timer-and-task scheduler core.
//!
//! This crate contains no wall-clock reads or process control: those live in
//! `firmsched-runtime`. Everything here is pure data and arithmetic, so it is
//! testable without a process to run it in.
//!
//! ## Modules
//!
//! - `ticks` - wrap-aware 32-bit tick comparison and unit conversion
//! - `constants` - compile-time scheduler tunables
//! - `timer` - the waketime-ordered timer queue
//! - `outcome` - what a timer callback can ask the queue to do next
//! - `status` - task/shutdown state enums
//! - `wake` - the one-byte task-wake flag
//! - `reason` - shutdown reason codes
//! - `error` - setup/configuration error type
//! - `env` - environment variable parsing helpers

#![allow(dead_code)]

pub mod constants;
pub mod env;
pub mod error;
pub mod outcome;
pub mod reason;
pub mod status;
pub mod ticks;
pub mod timer;
pub mod wake;

pub use error::{CoreError, CoreResult};
pub use outcome::DispatchOutcome;
pub use reason::ShutdownReason;
pub use status::{ShutdownStatus, TasksStatus};
pub use ticks::{from_us, is_before};
pub use timer::{TimerId, TimerQueue};
pub use wake::WakeFlag;
