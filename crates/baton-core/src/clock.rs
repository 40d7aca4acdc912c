//! Stopwatch arithmetic for the shared timer.
//!
//! The clock never reads wall time itself: every operation takes the caller's
//! `now`, which keeps the session state machine deterministic under test.

use std::time::{Duration, Instant};

/// Run/pause stopwatch: accumulated time plus the start of the current run.
#[derive(Debug, Clone, Default)]
pub struct Clock {
    started_at: Option<Instant>,
    accumulated: Duration,
}

impl Clock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.started_at.is_some()
    }

    /// Elapsed time as observed at `now`.
    ///
    /// A `now` earlier than the start of the current run counts as zero, so
    /// the result never goes below `accumulated`.
    pub fn elapsed(&self, now: Instant) -> Duration {
        match self.started_at {
            Some(started_at) => self.accumulated + now.saturating_duration_since(started_at),
            None => self.accumulated,
        }
    }

    /// Begin running from `now`. No-op if already running.
    pub fn start(&mut self, now: Instant) -> bool {
        if self.started_at.is_some() {
            return false;
        }
        self.started_at = Some(now);
        true
    }

    /// Fold the current run into `accumulated` and stop. No-op if stopped.
    pub fn pause(&mut self, now: Instant) -> bool {
        match self.started_at.take() {
            Some(started_at) => {
                self.accumulated += now.saturating_duration_since(started_at);
                true
            }
            None => false,
        }
    }

    /// Zero and run from `now`, whatever the previous state.
    pub fn restart(&mut self, now: Instant) {
        self.accumulated = Duration::ZERO;
        self.started_at = Some(now);
    }

    /// Zero and stop.
    pub fn reset(&mut self) {
        self.accumulated = Duration::ZERO;
        self.started_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stopped_clock_is_frozen() {
        let clock = Clock::new();
        let now = Instant::now();
        assert!(!clock.is_running());
        assert_eq!(clock.elapsed(now), Duration::ZERO);
        assert_eq!(clock.elapsed(now + Duration::from_secs(5)), Duration::ZERO);
    }

    #[test]
    fn test_start_pause_accumulates() {
        let t0 = Instant::now();
        let mut clock = Clock::new();

        assert!(clock.start(t0));
        assert!(!clock.start(t0 + Duration::from_millis(10)));
        assert_eq!(clock.elapsed(t0 + Duration::from_millis(700)), Duration::from_millis(700));

        assert!(clock.pause(t0 + Duration::from_millis(1000)));
        assert!(!clock.pause(t0 + Duration::from_millis(1200)));
        assert_eq!(clock.elapsed(t0 + Duration::from_secs(9)), Duration::from_millis(1000));

        // Second run adds to the first
        clock.start(t0 + Duration::from_millis(2000));
        assert_eq!(
            clock.elapsed(t0 + Duration::from_millis(2500)),
            Duration::from_millis(1500)
        );
    }

    #[test]
    fn test_elapsed_never_negative() {
        let t0 = Instant::now() + Duration::from_secs(1);
        let mut clock = Clock::new();
        clock.start(t0);
        // Sampled before the run began
        assert_eq!(clock.elapsed(t0 - Duration::from_millis(500)), Duration::ZERO);
    }

    #[test]
    fn test_restart_and_reset() {
        let t0 = Instant::now();
        let mut clock = Clock::new();
        clock.start(t0);
        clock.pause(t0 + Duration::from_millis(300));

        clock.restart(t0 + Duration::from_millis(400));
        assert!(clock.is_running());
        assert_eq!(clock.elapsed(t0 + Duration::from_millis(450)), Duration::from_millis(50));

        clock.reset();
        assert!(!clock.is_running());
        assert_eq!(clock.elapsed(t0 + Duration::from_secs(1)), Duration::ZERO);
    }
}
