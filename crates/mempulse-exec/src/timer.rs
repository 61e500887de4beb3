//! Single-threaded fixed-rate timer.

use crate::executor::{run_isolated, ExecutorError, ScheduledExecutor, ScheduledTask, Task};
use crate::rate::FixedRate;
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Commands sent to the timer thread.
enum TimerCommand {
    Schedule(TimerEntry),
    Shutdown,
}

struct TimerEntry {
    handle: ScheduledTask,
    task: Task,
    rate: FixedRate<Instant>,
}

/// Runs scheduled tasks on one dedicated thread.
///
/// Tasks run one at a time, so at most one execution is in flight for the
/// whole executor. Shutting down lets the current run finish and drops
/// every future run.
pub struct TimerExecutor {
    name: String,
    commands: Sender<TimerCommand>,
    shutdown: AtomicBool,
    thread: Mutex<Option<thread::JoinHandle<()>>>,
}

impl TimerExecutor {
    /// Spawn the timer thread.
    pub fn new(name: &str) -> Result<Self, ExecutorError> {
        let (tx, rx) = unbounded();
        let thread_name = name.to_string();

        let handle = thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || {
                debug!("Timer {} started", thread_name);
                run_timer_loop(rx);
                debug!("Timer {} stopped", thread_name);
            })?;

        Ok(Self {
            name: name.to_string(),
            commands: tx,
            shutdown: AtomicBool::new(false),
            thread: Mutex::new(Some(handle)),
        })
    }

    /// Executor name (also the timer thread's name).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Check if the executor has been shut down.
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Stop the timer thread, waiting for an in-flight run to complete.
    pub fn shutdown(&self) {
        if self.shutdown.swap(true, Ordering::SeqCst) {
            return;
        }

        info!("Shutting down timer {}", self.name);
        let _ = self.commands.send(TimerCommand::Shutdown);

        let handle = self
            .thread
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            // A task shutting down its own executor cannot wait for itself
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }
    }
}

impl ScheduledExecutor for TimerExecutor {
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
        if self.is_shutdown() {
            return Err(ExecutorError::Shutdown);
        }

        let handle = ScheduledTask::new(name);
        let entry = TimerEntry {
            handle: handle.clone(),
            task,
            rate: FixedRate::new(Instant::now() + initial_delay, period),
        };

        self.commands
            .send(TimerCommand::Schedule(entry))
            .map_err(|_| ExecutorError::Shutdown)?;

        debug!(
            task = name,
            ?initial_delay,
            ?period,
            "Scheduled fixed-rate task on {}",
            self.name
        );
        Ok(handle)
    }
}

impl Drop for TimerExecutor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_timer_loop(rx: Receiver<TimerCommand>) {
    let mut entries: Vec<TimerEntry> = Vec::new();

    loop {
        entries.retain(|entry| !entry.handle.is_cancelled());

        // Wait for a command or for the earliest task to come due
        let command = match entries.iter().map(|entry| entry.rate.next_run()).min() {
            Some(deadline) => match rx.recv_deadline(deadline) {
                Ok(command) => Some(command),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => break,
            },
            None => match rx.recv() {
                Ok(command) => Some(command),
                Err(_) => break,
            },
        };

        match command {
            Some(TimerCommand::Schedule(entry)) => {
                entries.push(entry);
                continue;
            }
            Some(TimerCommand::Shutdown) => break,
            None => {}
        }

        let now = Instant::now();
        for entry in entries.iter_mut() {
            if entry.handle.is_cancelled() || !entry.rate.is_due(now) {
                continue;
            }

            run_isolated(&entry.handle, &mut entry.task);

            let missed = entry.rate.advance(Instant::now());
            if missed > 0 {
                warn!(
                    task = entry.handle.name(),
                    missed,
                    "Task overran its period, skipping missed runs"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    #[test]
    fn test_first_run_is_immediate() {
        let timer = TimerExecutor::new("test-timer").unwrap();
        let (tx, rx) = unbounded();
        let start = Instant::now();

        timer
            .schedule_at_fixed_rate(
                "probe",
                Box::new(move || {
                    let _ = tx.send(Instant::now());
                }),
                Duration::ZERO,
                Duration::from_secs(60),
            )
            .unwrap();

        let first = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert!(first.duration_since(start) < Duration::from_millis(500));
    }

    #[test]
    fn test_fixed_rate_cadence() {
        let timer = TimerExecutor::new("test-timer").unwrap();
        let (tx, rx) = unbounded();
        let period = Duration::from_millis(50);

        timer
            .schedule_at_fixed_rate(
                "cadence",
                Box::new(move || {
                    let _ = tx.send(Instant::now());
                }),
                Duration::ZERO,
                period,
            )
            .unwrap();

        let stamps: Vec<Instant> = (0..5)
            .map(|_| rx.recv_timeout(Duration::from_secs(2)).unwrap())
            .collect();

        // Runs land on boundaries measured from the first run
        for (i, stamp) in stamps.iter().enumerate() {
            let expected = period * i as u32;
            let actual = stamp.duration_since(stamps[0]);
            assert!(
                actual + Duration::from_millis(20) >= expected,
                "run {} came early: {:?} < {:?}",
                i,
                actual,
                expected
            );
            assert!(
                actual < expected + period,
                "run {} drifted: {:?} vs {:?}",
                i,
                actual,
                expected
            );
        }
    }

    #[test]
    fn test_panicking_task_stays_scheduled() {
        let timer = TimerExecutor::new("test-timer").unwrap();
        let (tx, rx) = unbounded();
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();

        timer
            .schedule_at_fixed_rate(
                "flaky",
                Box::new(move || {
                    let run = counter.fetch_add(1, Ordering::SeqCst);
                    let _ = tx.send(run);
                    if run == 0 {
                        panic!("first run fails");
                    }
                }),
                Duration::ZERO,
                Duration::from_millis(20),
            )
            .unwrap();

        assert_eq!(rx.recv_timeout(Duration::from_secs(1)).unwrap(), 0);
        assert_eq!(rx.recv_timeout(Duration::from_secs(1)).unwrap(), 1);
    }

    #[test]
    fn test_cancel_stops_future_runs() {
        let timer = TimerExecutor::new("test-timer").unwrap();
        let (tx, rx) = unbounded();

        let handle = timer
            .schedule_at_fixed_rate(
                "cancelled",
                Box::new(move || {
                    let _ = tx.send(());
                }),
                Duration::ZERO,
                Duration::from_millis(20),
            )
            .unwrap();

        rx.recv_timeout(Duration::from_secs(1)).unwrap();
        handle.cancel();
        // Allow one run that may already be in flight
        let _ = rx.recv_timeout(Duration::from_millis(30));
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
    }

    #[test]
    fn test_shutdown_rejects_new_tasks() {
        let timer = TimerExecutor::new("test-timer").unwrap();
        timer.shutdown();
        timer.shutdown();

        assert!(timer.is_shutdown());
        let result = timer.schedule_at_fixed_rate(
            "late",
            Box::new(|| {}),
            Duration::ZERO,
            Duration::from_secs(1),
        );
        assert!(matches!(result, Err(ExecutorError::Shutdown)));
    }

    #[test]
    fn test_zero_period_rejected() {
        let timer = TimerExecutor::new("test-timer").unwrap();
        let result = timer.schedule_at_fixed_rate("zero", Box::new(|| {}), Duration::ZERO, Duration::ZERO);
        assert!(matches!(result, Err(ExecutorError::InvalidPeriod)));
    }

    #[test]
    fn test_tasks_never_overlap() {
        let timer = TimerExecutor::new("test-timer").unwrap();
        let in_flight = Arc::new(AtomicUsize::new(0));
        let overlapped = Arc::new(AtomicBool::new(false));
        let (tx, rx) = unbounded();

        for name in ["a", "b"] {
            let in_flight = in_flight.clone();
            let overlapped = overlapped.clone();
            let tx = tx.clone();
            timer
                .schedule_at_fixed_rate(
                    name,
                    Box::new(move || {
                        if in_flight.fetch_add(1, Ordering::SeqCst) > 0 {
                            overlapped.store(true, Ordering::SeqCst);
                        }
                        thread::sleep(Duration::from_millis(15));
                        in_flight.fetch_sub(1, Ordering::SeqCst);
                        let _ = tx.send(());
                    }),
                    Duration::ZERO,
                    Duration::from_millis(10),
                )
                .unwrap();
        }

        for _ in 0..6 {
            rx.recv_timeout(Duration::from_secs(1)).unwrap();
        }
        assert!(!overlapped.load(Ordering::SeqCst));
    }
}
