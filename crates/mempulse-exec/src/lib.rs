//! mempulse Scheduling
//!
//! Fixed-rate task execution for periodic samplers:
//! - `TimerExecutor`: one named timer thread running every scheduled task
//!   serially, so a task never overlaps itself or its neighbours
//! - `ManualExecutor`: virtual-clock executor for deterministic tests
//!
//! Both isolate panics: a task that panics is logged and stays scheduled.

mod executor;
mod manual;
mod rate;
mod timer;

pub use executor::{ExecutorError, ScheduledExecutor, ScheduledTask, Task};
pub use manual::ManualExecutor;
pub use timer::TimerExecutor;
