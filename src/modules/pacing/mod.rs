//! Human-plausible request pacing.
//!
//! Produces randomized inter-request delays and simulated scroll/dwell
//! activity against a rendered session. Every sample is drawn fresh from the
//! process-wide generator; calls are independent of any prior state.

use std::time::Duration;

use chromiumoxide::Page;
use rand::Rng;
use tokio::time::sleep;

/// Delay envelopes used by the policy. All values are seconds.
#[derive(Debug, Clone, Copy)]
pub struct PacingConfig {
    /// Delay inserted between targets in sequential batch runs.
    pub between_targets: (f64, f64),
    /// Reading time applied after scrolling a rendered page.
    pub dwell: (f64, f64),
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            between_targets: (2.0, 5.0),
            dwell: (5.0, 15.0),
        }
    }
}

impl PacingConfig {
    /// Zeroed envelopes for tests and dry runs.
    pub fn instant() -> Self {
        Self {
            between_targets: (0.0, 0.0),
            dwell: (0.0, 0.0),
        }
    }
}

/// Stateless pacing policy shared across workers.
#[derive(Debug, Clone, Default)]
pub struct PacingPolicy {
    config: PacingConfig,
}

impl PacingPolicy {
    pub fn new(config: PacingConfig) -> Self {
        Self { config }
    }

    /// Suspend the caller for a uniformly sampled duration.
    pub async fn delay_before_next(&self, min_secs: f64, max_secs: f64) {
        sleep(sample(min_secs, max_secs)).await;
    }

    /// The configured inter-target pause for sequential batches.
    pub async fn pause_between_targets(&self) {
        let (min, max) = self.config.between_targets;
        self.delay_before_next(min, max).await;
    }

    /// Scroll, occasionally reverse, then dwell as if reading the page.
    /// Simulation failures are logged and swallowed; they never fail the
    /// owning attempt.
    pub async fn simulate_browsing(&self, page: &Page) {
        let distance: i64 = sample_int(300, 700);
        let reverse: Option<i64> = if chance(0.3) {
            Some(sample_int(50, 200))
        } else {
            None
        };

        if let Err(err) = page
            .evaluate(format!("window.scrollBy(0, {distance});"))
            .await
        {
            log::debug!("scroll simulation failed: {err}");
            return;
        }
        self.delay_before_next(0.5, 1.5).await;

        if let Some(back) = reverse {
            if let Err(err) = page.evaluate(format!("window.scrollBy(0, -{back});")).await {
                log::debug!("scroll reversal failed: {err}");
            }
            self.delay_before_next(0.3, 0.8).await;
        }

        let (min, max) = self.config.dwell;
        self.delay_before_next(min, max).await;
    }
}

fn sample(min_secs: f64, max_secs: f64) -> Duration {
    if max_secs <= min_secs {
        return Duration::from_secs_f64(min_secs.max(0.0));
    }
    let secs = rand::thread_rng().gen_range(min_secs..=max_secs);
    Duration::from_secs_f64(secs)
}

fn sample_int(min: i64, max: i64) -> i64 {
    rand::thread_rng().gen_range(min..=max)
}

fn chance(probability: f64) -> bool {
    rand::thread_rng().gen_range(0.0..1.0) < probability
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn samples_stay_in_range() {
        for _ in 0..100 {
            let d = sample(0.5, 1.5);
            assert!(d >= Duration::from_secs_f64(0.5));
            assert!(d <= Duration::from_secs_f64(1.5));
        }
    }

    #[test]
    fn degenerate_range_returns_minimum() {
        assert_eq!(sample(2.0, 2.0), Duration::from_secs_f64(2.0));
        assert_eq!(sample(0.0, 0.0), Duration::ZERO);
    }

    #[tokio::test]
    async fn instant_config_does_not_block() {
        let policy = PacingPolicy::new(PacingConfig::instant());
        let started = Instant::now();
        policy.pause_between_targets().await;
        assert!(started.elapsed() < Duration::from_millis(100));
    }
}
