//! Virtual-clock executor for deterministic tests.

use crate::executor::{run_isolated, ExecutorError, ScheduledExecutor, ScheduledTask, Task};
use crate::rate::FixedRate;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

struct ManualEntry {
    seq: u64,
    handle: ScheduledTask,
    task: Task,
    rate: FixedRate<Duration>,
}

#[derive(Default)]
struct ManualState {
    now: Duration,
    next_seq: u64,
    entries: Vec<ManualEntry>,
    shutdown: bool,
}

/// Executor driven by an explicit virtual clock.
///
/// Nothing runs until `advance` is called; every period boundary crossed is
/// executed on the calling thread, in time order. Tasks may schedule more
/// work on the same executor from inside a run.
#[derive(Default)]
pub struct ManualExecutor {
    state: Mutex<ManualState>,
}

impl ManualExecutor {
    /// Create an executor with its clock at zero.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, ManualState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Virtual time elapsed since creation.
    pub fn elapsed(&self) -> Duration {
        self.state().now
    }

    /// Number of live (not cancelled) tasks.
    pub fn task_count(&self) -> usize {
        self.state()
            .entries
            .iter()
            .filter(|entry| !entry.handle.is_cancelled())
            .count()
    }

    /// Run everything due at the current virtual time.
    pub fn run_pending(&self) -> usize {
        self.advance(Duration::ZERO)
    }

    /// Move the clock forward by `by`, running every due execution.
    ///
    /// Returns the number of executions performed.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.state().now + by;
        let mut runs = 0;

        loop {
            let mut entry = {
                let mut state = self.state();
                if state.shutdown {
                    break;
                }
                state.entries.retain(|entry| !entry.handle.is_cancelled());

                let due = state
                    .entries
                    .iter()
                    .enumerate()
                    .filter(|(_, entry)| entry.rate.is_due(target))
                    .min_by_key(|(_, entry)| (entry.rate.next_run(), entry.seq))
                    .map(|(index, _)| index);

                match due {
                    Some(index) => {
                        let entry = state.entries.swap_remove(index);
                        state.now = entry.rate.next_run();
                        entry
                    }
                    None => break,
                }
            };

            // Run without holding the lock
            run_isolated(&entry.handle, &mut entry.task);
            runs += 1;

            let mut state = self.state();
            let now = state.now;
            entry.rate.advance(now);
            if !state.shutdown && !entry.handle.is_cancelled() {
                state.entries.push(entry);
            }
        }

        let mut state = self.state();
        if state.now < target {
            state.now = target;
        }
        runs
    }

    /// Drop every task; later scheduling fails.
    pub fn shutdown(&self) {
        let mut state = self.state();
        state.shutdown = true;
        state.entries.clear();
    }
}

impl ScheduledExecutor for ManualExecutor {
    fn schedule_at_fixed_rate(
        &self,
        name: &str,
        task: Task,
        initial_delay: Duration,
        period: Duration,
    ) -> Result<ScheduledTask, ExecutorError> {
        if period.is_zero() {
            return Err(ExecutorError::InvalidPeriod);
        }

        let mut state = self.state();
        if state.shutdown {
            return Err(ExecutorError::Shutdown);
        }

        let handle = ScheduledTask::new(name);
        let seq = state.next_seq;
        state.next_seq += 1;
        let first_run = state.now + initial_delay;
        state.entries.push(ManualEntry {
            seq,
            handle: handle.clone(),
            task,
            rate: FixedRate::new(first_run, period),
        });
        Ok(handle)
    }
}
