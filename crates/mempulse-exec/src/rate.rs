//! Fixed-rate run arithmetic.

use std::ops::{Add, Sub};
use std::time::Duration;

/// Tracks when a fixed-rate task is next due.
///
/// Generic over the clock so the timer thread can use `Instant` and the
/// manual executor a virtual `Duration` clock.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FixedRate<T> {
    next_run: T,
    period: Duration,
}

impl<T> FixedRate<T>
where
    T: Copy + Ord + Add<Duration, Output = T> + Sub<T, Output = Duration>,
{
    pub(crate) fn new(first_run: T, period: Duration) -> Self {
        Self {
            next_run: first_run,
            period,
        }
    }

    pub(crate) fn next_run(&self) -> T {
        self.next_run
    }

    pub(crate) fn is_due(&self, now: T) -> bool {
        self.next_run <= now
    }

    /// Move to the next period boundary after a run finished at `now`.
    ///
    /// Boundaries that already passed while the run was in progress are
    /// skipped; the return value is how many were dropped.
    pub(crate) fn advance(&mut self, now: T) -> u64 {
        self.next_run = self.next_run + self.period;
        if self.next_run >= now {
            return 0;
        }

        let behind = now - self.next_run;
        let missed = (behind.as_nanos() / self.period.as_nanos()) as u64 + 1;
        let step = u32::try_from(missed).unwrap_or(u32::MAX);
        self.next_run = self.next_run + self.period.saturating_mul(step);
        missed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn test_on_time_run_advances_one_period() {
        let mut rate = FixedRate::new(ms(0), ms(100));
        assert!(rate.is_due(ms(0)));

        assert_eq!(rate.advance(ms(10)), 0);
        assert_eq!(rate.next_run(), ms(100));
        assert!(!rate.is_due(ms(99)));
        assert!(rate.is_due(ms(100)));
    }

    #[test]
    fn test_schedule_is_relative_to_start_not_completion() {
        let mut rate = FixedRate::new(ms(0), ms(100));

        // A slow run does not push the schedule back
        rate.advance(ms(90));
        assert_eq!(rate.next_run(), ms(100));
        rate.advance(ms(195));
        assert_eq!(rate.next_run(), ms(200));
    }

    #[test]
    fn test_overrun_skips_missed_boundaries() {
        let mut rate = FixedRate::new(ms(0), ms(100));

        // Run took 350ms: boundaries at 100, 200 and 300 are gone
        assert_eq!(rate.advance(ms(350)), 3);
        assert_eq!(rate.next_run(), ms(400));
    }

    #[test]
    fn test_finishing_on_boundary_is_not_a_miss() {
        let mut rate = FixedRate::new(ms(0), ms(100));
        assert_eq!(rate.advance(ms(100)), 0);
        assert_eq!(rate.next_run(), ms(100));
    }
}
