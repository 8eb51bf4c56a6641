//! In-process sliding-window rate limiter.
//!
//! Every key owns an ordered list of request instants. A request is evaluated by
//! dropping instants that fell out of the trailing window, then comparing the
//! remaining count with the limit. Denied requests are not recorded, so a
//! client hammering a closed window does not push its own reset further out.
//!
//! Locking is two-level: the sharded map is only held long enough to find or
//! create the per-key slot, and the per-key mutex serializes decisions for that
//! key. Keys never contend with each other beyond the shard lookup.

use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RateLimitError {
    #[error("Rate limit key must not be empty")]
    EmptyKey,

    #[error("Rate limit requires a positive request count and window")]
    InvalidLimit,
}

/// Outcome of a single rate-limited request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    /// Request recorded; `remaining` more fit in the current window
    Allowed { remaining: usize },
    /// Request rejected; the oldest counted request expires after `retry_after`
    Denied { retry_after: Duration },
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateDecision::Allowed { .. })
    }
}

/// Read-only usage snapshot for a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitStatus {
    pub used: usize,
    pub remaining: usize,
}

#[derive(Debug)]
struct RateLimitEntry {
    timestamps: VecDeque<Instant>,
    last_seen: Instant,
    /// Set by the sweeper when the slot is removed from the map
    evicted: bool,
}

impl RateLimitEntry {
    fn new(now: Instant) -> Self {
        Self {
            timestamps: VecDeque::new(),
            last_seen: now,
            evicted: false,
        }
    }

    /// Drop every instant at or before `now - window`
    fn prune(&mut self, now: Instant, window: Duration) {
        let Some(threshold) = now.checked_sub(window) else {
            return;
        };
        while self.timestamps.front().is_some_and(|t| *t <= threshold) {
            self.timestamps.pop_front();
        }
    }

    fn live_count(&self, now: Instant, window: Duration) -> usize {
        match now.checked_sub(window) {
            Some(threshold) => self.timestamps.iter().filter(|t| **t > threshold).count(),
            None => self.timestamps.len(),
        }
    }
}

#[derive(Debug, Default)]
pub struct SlidingWindowLimiter {
    entries: DashMap<String, Arc<Mutex<RateLimitEntry>>>,
}

impl SlidingWindowLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` and records the request when it fits in the window
    pub fn allow(
        &self,
        key: &str,
        max_requests: usize,
        window: Duration,
    ) -> Result<bool, RateLimitError> {
        self.check(key, max_requests, window)
            .map(|decision| decision.is_allowed())
    }

    pub fn check(
        &self,
        key: &str,
        max_requests: usize,
        window: Duration,
    ) -> Result<RateDecision, RateLimitError> {
        self.decide(key, max_requests, window, Instant::now)
    }

    pub(crate) fn check_at(
        &self,
        key: &str,
        max_requests: usize,
        window: Duration,
        now: Instant,
    ) -> Result<RateDecision, RateLimitError> {
        self.decide(key, max_requests, window, || now)
    }

    fn decide(
        &self,
        key: &str,
        max_requests: usize,
        window: Duration,
        clock: impl Fn() -> Instant,
    ) -> Result<RateDecision, RateLimitError> {
        validate(key, max_requests, window)?;

        loop {
            let slot = self.slot(key, clock());
            let mut entry = slot.lock();

            // Lost a race with the sweeper; this slot is no longer in the map
            if entry.evicted {
                continue;
            }

            // Read under the lock so instants are appended in order
            let now = clock();
            entry.prune(now, window);
            entry.last_seen = now;

            let used = entry.timestamps.len();
            if used >= max_requests {
                let retry_after = entry
                    .timestamps
                    .front()
                    .map(|oldest| (*oldest + window).saturating_duration_since(now))
                    .unwrap_or(window);
                return Ok(RateDecision::Denied { retry_after });
            }

            entry.timestamps.push_back(now);
            return Ok(RateDecision::Allowed {
                remaining: max_requests - used - 1,
            });
        }
    }

    /// Current usage for `key` without recording a request
    pub fn status(
        &self,
        key: &str,
        max_requests: usize,
        window: Duration,
    ) -> Result<RateLimitStatus, RateLimitError> {
        self.status_at(key, max_requests, window, Instant::now())
    }

    pub(crate) fn status_at(
        &self,
        key: &str,
        max_requests: usize,
        window: Duration,
        now: Instant,
    ) -> Result<RateLimitStatus, RateLimitError> {
        validate(key, max_requests, window)?;

        let used = match self.entries.get(key).map(|slot| Arc::clone(slot.value())) {
            Some(slot) => slot.lock().live_count(now, window),
            None => 0,
        };

        Ok(RateLimitStatus {
            used,
            remaining: max_requests.saturating_sub(used),
        })
    }

    /// Remove entries untouched for at least `idle_ttl`; returns how many were removed.
    ///
    /// `idle_ttl` must not be shorter than the longest window in use, otherwise
    /// live timestamps could be forgotten.
    pub fn sweep(&self, idle_ttl: Duration) -> usize {
        self.sweep_at(idle_ttl, Instant::now())
    }

    pub(crate) fn sweep_at(&self, idle_ttl: Duration, now: Instant) -> usize {
        let before = self.entries.len();

        self.entries.retain(|_, slot| {
            // A locked slot is being evaluated right now, so it is not idle
            let Some(mut entry) = slot.try_lock() else {
                return true;
            };
            if now.saturating_duration_since(entry.last_seen) < idle_ttl {
                return true;
            }
            entry.evicted = true;
            false
        });

        before.saturating_sub(self.entries.len())
    }

    pub fn tracked_keys(&self) -> usize {
        self.entries.len()
    }

    /// Find or create the slot for `key`. The map guard is released on return.
    fn slot(&self, key: &str, now: Instant) -> Arc<Mutex<RateLimitEntry>> {
        if let Some(slot) = self.entries.get(key) {
            return Arc::clone(slot.value());
        }
        Arc::clone(
            self.entries
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(RateLimitEntry::new(now))))
                .value(),
        )
    }
}

fn validate(key: &str, max_requests: usize, window: Duration) -> Result<(), RateLimitError> {
    if key.is_empty() {
        return Err(RateLimitError::EmptyKey);
    }
    if max_requests == 0 || window.is_zero() {
        return Err(RateLimitError::InvalidLimit);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    const WINDOW: Duration = Duration::from_secs(60);

    #[tokio::test(start_paused = true)]
    async fn test_denies_request_over_limit() {
        let limiter = SlidingWindowLimiter::new();

        for _ in 0..5 {
            assert!(limiter.allow("user-1", 5, WINDOW).unwrap());
        }
        assert!(!limiter.allow("user-1", 5, WINDOW).unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_allows_again_after_window_passes() {
        let limiter = SlidingWindowLimiter::new();

        for _ in 0..3 {
            assert!(limiter.allow("user-1", 3, WINDOW).unwrap());
        }
        assert!(!limiter.allow("user-1", 3, WINDOW).unwrap());

        tokio::time::advance(WINDOW + Duration::from_millis(1)).await;

        assert!(limiter.allow("user-1", 3, WINDOW).unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_denied_requests_are_not_recorded() {
        let limiter = SlidingWindowLimiter::new();

        assert!(limiter.allow("k", 1, WINDOW).unwrap());
        tokio::time::advance(Duration::from_secs(30)).await;
        // Denied; must not extend the window
        assert!(!limiter.allow("k", 1, WINDOW).unwrap());

        tokio::time::advance(Duration::from_secs(31)).await;
        assert!(limiter.allow("k", 1, WINDOW).unwrap());
    }

    #[test]
    fn test_timestamp_on_threshold_is_expired() {
        let limiter = SlidingWindowLimiter::new();
        let start = Instant::now();

        assert_eq!(
            limiter.check_at("k", 1, WINDOW, start).unwrap(),
            RateDecision::Allowed { remaining: 0 }
        );

        // One nanosecond short of the window: still counted
        let almost = start + WINDOW - Duration::from_nanos(1);
        assert!(!limiter.check_at("k", 1, WINDOW, almost).unwrap().is_allowed());

        // Exactly now - window == start: no longer counted
        assert!(limiter.check_at("k", 1, WINDOW, start + WINDOW).unwrap().is_allowed());
    }

    #[test]
    fn test_denied_decision_reports_retry_after() {
        let limiter = SlidingWindowLimiter::new();
        let start = Instant::now();

        limiter.check_at("k", 2, WINDOW, start).unwrap();
        limiter
            .check_at("k", 2, WINDOW, start + Duration::from_secs(10))
            .unwrap();

        let decision = limiter
            .check_at("k", 2, WINDOW, start + Duration::from_secs(15))
            .unwrap();
        assert_eq!(
            decision,
            RateDecision::Denied {
                retry_after: Duration::from_secs(45)
            }
        );
    }

    #[test]
    fn test_remaining_counts_down() {
        let limiter = SlidingWindowLimiter::new();
        let now = Instant::now();

        let remaining: Vec<_> = (0..3)
            .map(|_| limiter.check_at("k", 3, WINDOW, now).unwrap())
            .collect();

        assert_eq!(
            remaining,
            vec![
                RateDecision::Allowed { remaining: 2 },
                RateDecision::Allowed { remaining: 1 },
                RateDecision::Allowed { remaining: 0 },
            ]
        );
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = SlidingWindowLimiter::new();

        assert!(limiter.allow("a", 1, WINDOW).unwrap());
        assert!(!limiter.allow("a", 1, WINDOW).unwrap());
        assert!(limiter.allow("b", 1, WINDOW).unwrap());
    }

    #[test]
    fn test_rejects_empty_key_and_zero_limits() {
        let limiter = SlidingWindowLimiter::new();

        assert_eq!(
            assert_err!(limiter.allow("", 5, WINDOW)),
            RateLimitError::EmptyKey
        );
        assert_eq!(
            assert_err!(limiter.allow("k", 0, WINDOW)),
            RateLimitError::InvalidLimit
        );
        assert_eq!(
            assert_err!(limiter.allow("k", 5, Duration::ZERO)),
            RateLimitError::InvalidLimit
        );
        assert_eq!(limiter.tracked_keys(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_requests_never_exceed_limit() {
        const MAX: usize = 10;
        let limiter = Arc::new(SlidingWindowLimiter::new());

        let handles: Vec<_> = (0..MAX * 2)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                tokio::spawn(async move { limiter.allow("shared", MAX, WINDOW) })
            })
            .collect();

        let mut allowed = 0;
        for handle in handles {
            if assert_ok!(handle.await.unwrap()) {
                allowed += 1;
            }
        }

        assert_eq!(allowed, MAX);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_requests_keep_instants_in_order() {
        const REQUESTS: usize = 400;
        let limiter = Arc::new(SlidingWindowLimiter::new());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                tokio::spawn(async move {
                    for _ in 0..REQUESTS / 8 {
                        limiter.allow("ordered", REQUESTS, WINDOW).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        let slot = Arc::clone(limiter.entries.get("ordered").unwrap().value());
        let entry = slot.lock();
        assert_eq!(entry.timestamps.len(), REQUESTS);
        assert!(entry
            .timestamps
            .iter()
            .zip(entry.timestamps.iter().skip(1))
            .all(|(earlier, later)| earlier <= later));
    }

    #[test]
    fn test_status_does_not_record() {
        let limiter = SlidingWindowLimiter::new();
        let now = Instant::now();

        assert_eq!(
            limiter.status_at("k", 5, WINDOW, now).unwrap(),
            RateLimitStatus {
                used: 0,
                remaining: 5
            }
        );

        limiter.check_at("k", 5, WINDOW, now).unwrap();
        limiter.check_at("k", 5, WINDOW, now).unwrap();

        for _ in 0..3 {
            assert_eq!(
                limiter.status_at("k", 5, WINDOW, now).unwrap(),
                RateLimitStatus {
                    used: 2,
                    remaining: 3
                }
            );
        }

        let later = now + WINDOW;
        assert_eq!(limiter.status_at("k", 5, WINDOW, later).unwrap().used, 0);
    }

    #[test]
    fn test_sweep_removes_only_idle_entries() {
        let limiter = SlidingWindowLimiter::new();
        let start = Instant::now();
        let idle_ttl = Duration::from_secs(600);

        limiter.check_at("idle", 5, WINDOW, start).unwrap();
        limiter
            .check_at("busy", 5, WINDOW, start + Duration::from_secs(500))
            .unwrap();

        let removed = limiter.sweep_at(idle_ttl, start + idle_ttl);

        assert_eq!(removed, 1);
        assert_eq!(limiter.tracked_keys(), 1);
        assert!(limiter.entries.contains_key("busy"));
    }

    #[test]
    fn test_evicted_slot_is_not_reused() {
        let limiter = SlidingWindowLimiter::new();
        let start = Instant::now();

        limiter.check_at("k", 1, WINDOW, start).unwrap();
        let stale = limiter.slot("k", start);

        limiter.sweep_at(Duration::from_secs(60), start + Duration::from_secs(60));
        assert!(stale.lock().evicted);

        // A fresh slot is created and the request counts there
        let later = start + Duration::from_secs(61);
        assert!(limiter.check_at("k", 1, WINDOW, later).unwrap().is_allowed());
        assert_eq!(limiter.tracked_keys(), 1);
        assert!(stale.lock().timestamps.len() == 1);
    }
}
