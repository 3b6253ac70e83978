//! Cooperative single-OS-thread scheduler used by one worker process (§4.F, §5).
//!
//! All "concurrent" operations run as lightweight tasks multiplexed on one
//! OS thread; only process wait, pipe read, and timed close are true
//! suspension points. Built on a `tokio` current-thread runtime plus a
//! `LocalSet` so `!Send` step-local state (the context stack, the active-step
//! chain) never needs synchronization across tasks.

pub mod scheduler;
pub mod threadpool_budget;

pub use scheduler::{Scheduler, TaskHandle};
pub use threadpool_budget::ThreadpoolBudget;
