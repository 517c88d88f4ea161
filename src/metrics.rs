//! # Per-task performance metrics
//!
//! Each task carries two [`RunningStat`] accumulators — one for time
//! spent `Running`, one for time spent `Ready` ("waiting") — plus a
//! handful of timestamps used to compute the duration of the window
//! that just closed.
//!
//! `exec_sq_sum` can overflow a 64-bit accumulator on very long runs
//! (Design Notes), so variance is tracked with Welford's online
//! algorithm (mean + M2) rather than a running sum of squares. The
//! spec's `exec_total_us` sum is kept as an explicit separate field
//! since the testable property in §8 checks it directly against the
//! sample count, independent of the variance computation.

use std::time::Instant;

/// A running count/sum/min/max/variance accumulator over a stream of
/// microsecond durations, updated via Welford's online algorithm.
#[derive(Debug, Clone, Copy)]
pub struct RunningStat {
    total_us: u64,
    samples: u64,
    min_us: u64,
    max_us: u64,
    mean: f64,
    m2: f64,
}

impl RunningStat {
    const fn new() -> Self {
        RunningStat {
            total_us: 0,
            samples: 0,
            min_us: u64::MAX,
            max_us: 0,
            mean: 0.0,
            m2: 0.0,
        }
    }

    /// Fold one more sample (in microseconds) into the accumulator.
    fn record(&mut self, sample_us: u64) {
        self.total_us += sample_us;
        self.samples += 1;
        self.min_us = self.min_us.min(sample_us);
        self.max_us = self.max_us.max(sample_us);

        // Welford's online mean/variance update.
        let delta = sample_us as f64 - self.mean;
        self.mean += delta / self.samples as f64;
        let delta2 = sample_us as f64 - self.mean;
        self.m2 += delta * delta2;
    }

    /// Total microseconds accumulated across all samples.
    pub fn total_us(&self) -> u64 {
        self.total_us
    }

    /// Number of samples folded in.
    pub fn samples(&self) -> u64 {
        self.samples
    }

    /// Smallest sample seen, or `0` if none yet.
    pub fn min_us(&self) -> u64 {
        if self.samples == 0 {
            0
        } else {
            self.min_us
        }
    }

    /// Largest sample seen.
    pub fn max_us(&self) -> u64 {
        self.max_us
    }

    /// Population variance of the samples seen so far.
    pub fn variance(&self) -> f64 {
        if self.samples < 2 {
            0.0
        } else {
            self.m2 / self.samples as f64
        }
    }

    /// Arithmetic mean of the samples seen so far.
    pub fn mean(&self) -> f64 {
        self.mean
    }
}

/// Per-task metrics bookkeeping: execution-time and wait-time
/// statistics plus the timestamps needed to close out the current
/// window when the task's state next changes.
#[derive(Debug, Clone, Copy)]
pub struct Metrics {
    pub(crate) created_at: Instant,
    pub(crate) last_run_start: Instant,
    pub(crate) last_ready_start: Instant,
    pub(crate) exec: RunningStat,
    pub(crate) wait: RunningStat,
}

impl Metrics {
    /// Initialize fresh metrics, stamping all three timestamps to `now`.
    pub fn new(now: Instant) -> Self {
        Metrics {
            created_at: now,
            last_run_start: now,
            last_ready_start: now,
            exec: RunningStat::new(),
            wait: RunningStat::new(),
        }
    }

    /// Close out an execution window of `now - last_run_start`,
    /// folding it into the exec accumulator.
    pub fn record_exec(&mut self, now: Instant) {
        let elapsed_us = now.saturating_duration_since(self.last_run_start).as_micros() as u64;
        self.exec.record(elapsed_us);
    }

    /// Close out a wait (Ready) window of `now - last_ready_start`,
    /// folding it into the wait accumulator.
    pub fn record_wait(&mut self, now: Instant) {
        let elapsed_us = now.saturating_duration_since(self.last_ready_start).as_micros() as u64;
        self.wait.record(elapsed_us);
    }

    /// Execution-time statistics.
    pub fn exec(&self) -> &RunningStat {
        &self.exec
    }

    /// Wait-time (Ready) statistics.
    pub fn wait(&self) -> &RunningStat {
        &self.wait
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn running_stat_tracks_min_max_total() {
        let mut s = RunningStat::new();
        s.record(100);
        s.record(50);
        s.record(200);
        assert_eq!(s.total_us(), 350);
        assert_eq!(s.samples(), 3);
        assert_eq!(s.min_us(), 50);
        assert_eq!(s.max_us(), 200);
    }

    #[test]
    fn running_stat_variance_matches_hand_computation() {
        let mut s = RunningStat::new();
        for v in [10u64, 20, 30, 40] {
            s.record(v);
        }
        // mean = 25, population variance = ((15^2+5^2+5^2+15^2))/4 = 125
        assert!((s.mean() - 25.0).abs() < 1e-9);
        assert!((s.variance() - 125.0).abs() < 1e-6);
    }

    #[test]
    fn running_stat_empty_has_zero_min() {
        let s = RunningStat::new();
        assert_eq!(s.min_us(), 0);
        assert_eq!(s.variance(), 0.0);
    }

    #[test]
    fn metrics_record_exec_closes_window() {
        let t0 = Instant::now();
        let mut m = Metrics::new(t0);
        let t1 = t0 + Duration::from_micros(750);
        m.record_exec(t1);
        assert_eq!(m.exec().samples(), 1);
        assert!(m.exec().total_us() >= 750);
    }
}
