//! Process-wide fetch statistics.
//!
//! Monotonic counters shared by the orchestrator and dispatcher, read only
//! for reporting, never for control decisions. Increments are plain atomic
//! updates so workers never contend on a lock.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Shared counter set. Owned by the orchestrator/dispatcher and passed by
/// reference to components that report into it.
#[derive(Debug, Default)]
pub struct Stats {
    requests: AtomicU64,
    successes: AtomicU64,
    failures: AtomicU64,
    challenges_solved: AtomicU64,
    proxy_rotations: AtomicU64,
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_success(&self) {
        self.successes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_challenge_solved(&self) {
        self.challenges_solved.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_proxy_rotation(&self) {
        self.proxy_rotations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            successes: self.successes.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            challenges_solved: self.challenges_solved.load(Ordering::Relaxed),
            proxy_rotations: self.proxy_rotations.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StatsSnapshot {
    pub requests: u64,
    pub successes: u64,
    pub failures: u64,
    pub challenges_solved: u64,
    pub proxy_rotations: u64,
}

impl StatsSnapshot {
    pub fn success_rate(&self) -> f64 {
        if self.requests == 0 {
            0.0
        } else {
            self.successes as f64 / self.requests as f64 * 100.0
        }
    }
}

impl std::fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "requests:          {}", self.requests)?;
        writeln!(f, "successes:         {}", self.successes)?;
        writeln!(f, "failures:          {}", self.failures)?;
        writeln!(f, "success rate:      {:.1}%", self.success_rate())?;
        writeln!(f, "challenges solved: {}", self.challenges_solved)?;
        write!(f, "proxy rotations:   {}", self.proxy_rotations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let stats = Stats::new();
        stats.record_request();
        stats.record_request();
        stats.record_success();
        stats.record_failure();
        stats.record_challenge_solved();
        stats.record_proxy_rotation();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.requests, 2);
        assert_eq!(snapshot.successes, 1);
        assert_eq!(snapshot.failures, 1);
        assert_eq!(snapshot.challenges_solved, 1);
        assert_eq!(snapshot.proxy_rotations, 1);
        assert!((snapshot.success_rate() - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_snapshot_has_zero_rate() {
        assert_eq!(Stats::new().snapshot().success_rate(), 0.0);
    }
}
