//! In-memory sliding-window rate limiting.
//!
//! The gateway consults a `RateLimiter` before doing any upstream work. The
//! in-process implementation tracks per-key hit timestamps and prunes expired
//! entries before appending, so a multi-instance deployment can swap in a
//! shared-store implementation behind the same trait.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Outcome of a rate-limit check for one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    pub limit: usize,
    /// Requests left in the current window, floored at zero.
    pub remaining: usize,
    /// Seconds until the window resets, rounded up.
    pub retry_after_secs: u64,
}

/// Capability to admit or reject a request under a keyed quota.
pub trait RateLimiter: Send + Sync {
    fn check(&self, key: &str) -> Decision;
}

/// Sliding-window limiter backed by a per-key timestamp queue.
/// Best effort per process instance.
pub struct SlidingWindowLimiter {
    limit: usize,
    window: Duration,
    buckets: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl SlidingWindowLimiter {
    pub fn new(limit: usize, window: Duration) -> Self {
        Self {
            limit,
            window,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Prune expired hits for the key, append this one, then compare against
    /// the ceiling. The whole operation holds the bucket lock, so the count
    /// for a key cannot be undercut by interleaved checks.
    fn check_at(&self, key: &str, now: Instant) -> Decision {
        let mut buckets = self.buckets.lock().unwrap_or_else(|e| e.into_inner());
        let hits = buckets.entry(key.to_string()).or_default();

        if let Some(cutoff) = now.checked_sub(self.window) {
            while hits.front().is_some_and(|t| *t <= cutoff) {
                hits.pop_front();
            }
        }
        hits.push_back(now);

        let count = hits.len();
        let oldest = *hits.front().unwrap_or(&now);
        let reset = self.window.saturating_sub(now.duration_since(oldest));
        let retry_after_secs = reset.as_secs() + u64::from(reset.subsec_nanos() > 0);

        Decision {
            allowed: count <= self.limit,
            limit: self.limit,
            remaining: self.limit.saturating_sub(count),
            retry_after_secs,
        }
    }
}

impl RateLimiter for SlidingWindowLimiter {
    fn check(&self, key: &str) -> Decision {
        self.check_at(key, Instant::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allows_up_to_limit() {
        let limiter = SlidingWindowLimiter::new(3, Duration::from_secs(60));
        let t0 = Instant::now();
        for i in 0..3 {
            let decision = limiter.check_at("1.2.3.4", t0 + Duration::from_millis(i));
            assert!(decision.allowed, "request {i} should pass");
        }
        let decision = limiter.check_at("1.2.3.4", t0 + Duration::from_millis(10));
        assert!(!decision.allowed);
        assert_eq!(decision.remaining, 0);
        assert_eq!(decision.limit, 3);
    }

    #[test]
    fn test_remaining_floors_at_zero() {
        let limiter = SlidingWindowLimiter::new(1, Duration::from_secs(60));
        let t0 = Instant::now();
        for i in 0..5 {
            let decision = limiter.check_at("k", t0 + Duration::from_millis(i));
            assert!(decision.remaining <= 1);
        }
        let decision = limiter.check_at("k", t0 + Duration::from_millis(10));
        assert_eq!(decision.remaining, 0);
    }

    #[test]
    fn test_window_expiry_readmits() {
        let limiter = SlidingWindowLimiter::new(2, Duration::from_secs(60));
        let t0 = Instant::now();
        assert!(limiter.check_at("k", t0).allowed);
        assert!(limiter.check_at("k", t0 + Duration::from_secs(1)).allowed);
        assert!(!limiter.check_at("k", t0 + Duration::from_secs(2)).allowed);
        // Past the window, the old hits are pruned.
        assert!(limiter.check_at("k", t0 + Duration::from_secs(61)).allowed);
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = SlidingWindowLimiter::new(1, Duration::from_secs(60));
        let t0 = Instant::now();
        assert!(limiter.check_at("a", t0).allowed);
        assert!(!limiter.check_at("a", t0 + Duration::from_millis(1)).allowed);
        assert!(limiter.check_at("b", t0 + Duration::from_millis(2)).allowed);
    }

    #[test]
    fn test_retry_after_counts_down() {
        let limiter = SlidingWindowLimiter::new(1, Duration::from_secs(60));
        let t0 = Instant::now();
        limiter.check_at("k", t0);
        let decision = limiter.check_at("k", t0 + Duration::from_secs(20));
        assert!(!decision.allowed);
        assert_eq!(decision.retry_after_secs, 40);
    }
}
