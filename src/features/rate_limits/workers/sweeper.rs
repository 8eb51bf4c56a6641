use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};

use crate::features::rate_limits::SlidingWindowLimiter;

/// Background worker that evicts idle limiter entries
pub struct RateLimitSweeper {
    limiter: Arc<SlidingWindowLimiter>,
    every: Duration,
    idle_ttl: Duration,
}

impl RateLimitSweeper {
    pub fn new(limiter: Arc<SlidingWindowLimiter>, every: Duration, idle_ttl: Duration) -> Self {
        Self {
            limiter,
            every,
            idle_ttl,
        }
    }

    /// Run the sweeper in a background loop
    pub async fn run(&self) {
        tracing::info!(
            "Starting rate limit sweeper (every {}s, idle ttl {}s)",
            self.every.as_secs(),
            self.idle_ttl.as_secs()
        );

        let mut ticker = interval(self.every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            self.sweep_once();
        }
    }

    fn sweep_once(&self) -> usize {
        let evicted = self.limiter.sweep(self.idle_ttl);
        if evicted > 0 {
            tracing::debug!(
                "Evicted {} idle rate limit entries, {} still tracked",
                evicted,
                self.limiter.tracked_keys()
            );
        }
        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_background_sweep_evicts_idle_keys() {
        let limiter = Arc::new(SlidingWindowLimiter::new());
        limiter.allow("idle", 5, Duration::from_secs(60)).unwrap();

        let sweeper = RateLimitSweeper::new(
            Arc::clone(&limiter),
            Duration::from_secs(300),
            Duration::from_secs(600),
        );
        let handle = tokio::spawn(async move { sweeper.run().await });

        tokio::time::sleep(Duration::from_secs(301)).await;
        assert_eq!(limiter.tracked_keys(), 1);

        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(limiter.tracked_keys(), 0);

        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_once_keeps_recent_keys() {
        let limiter = Arc::new(SlidingWindowLimiter::new());
        let sweeper = RateLimitSweeper::new(
            Arc::clone(&limiter),
            Duration::from_secs(300),
            Duration::from_secs(600),
        );

        limiter.allow("recent", 5, Duration::from_secs(60)).unwrap();
        tokio::time::advance(Duration::from_secs(599)).await;

        assert_eq!(sweeper.sweep_once(), 0);
        assert_eq!(limiter.tracked_keys(), 1);
    }
}
