//! Concurrent verification: the shared rate limiter and the scheduler.
//!
//! All in-flight checks share one token bucket, so the request budget holds
//! globally no matter how many candidates run at once. The scheduler fans
//! candidates out under bounded concurrency and always returns exactly one
//! result per candidate.

use crate::checker::AvailabilityChecker;
use crate::types::{Candidate, VerificationResult};
use futures::stream::{self, StreamExt};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

/// Longest single wait for a token; the bucket is re-checked afterwards.
const MAX_TOKEN_WAIT: Duration = Duration::from_secs(3600);

/// Absolute deadline `budget` from now.
///
/// A budget too large to represent as an instant means no deadline.
pub(crate) fn deadline_after(budget: Option<Duration>) -> Option<Instant> {
    budget.and_then(|d| Instant::now().checked_add(d))
}

/// Whether waiting `wait` from now would reach `deadline`.
pub(crate) fn would_pass(deadline: Instant, wait: Duration) -> bool {
    Instant::now()
        .checked_add(wait)
        .map_or(true, |end| end >= deadline)
}

/// Token bucket limiting outbound requests per second.
///
/// The lock is only held while refilling and taking a token, never across
/// an await.
#[derive(Debug)]
pub struct RateLimiter {
    /// Tokens per second; `None` disables limiting
    rate: Option<f64>,
    /// Maximum burst size
    capacity: f64,
    state: Mutex<Bucket>,
}

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

impl RateLimiter {
    /// Create a limiter allowing `rate` requests per second.
    ///
    /// The bucket starts full with room for one second of requests (at least
    /// one). Non-positive rates disable limiting.
    pub fn new(rate: Option<f64>) -> Self {
        let rate = rate.filter(|r| *r > 0.0 && r.is_finite());
        let capacity = rate.map(|r| r.max(1.0)).unwrap_or(1.0);

        Self {
            rate,
            capacity,
            state: Mutex::new(Bucket {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
        }
    }

    /// A limiter that never waits.
    pub fn unlimited() -> Self {
        Self::new(None)
    }

    pub fn rate(&self) -> Option<f64> {
        self.rate
    }

    fn bucket(&self) -> MutexGuard<'_, Bucket> {
        // A poisoned bucket only holds numbers; keep using it
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Take one token or report how long until one is available.
    fn try_take(&self, rate: f64) -> Result<(), Duration> {
        let mut bucket = self.bucket();
        let now = Instant::now();
        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * rate).min(self.capacity);
        bucket.last_refill = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            Ok(())
        } else {
            let wait = Duration::try_from_secs_f64((1.0 - bucket.tokens) / rate)
                .unwrap_or(MAX_TOKEN_WAIT);
            Err(wait.min(MAX_TOKEN_WAIT))
        }
    }

    /// Wait for a token.
    pub async fn acquire(&self) {
        self.acquire_before(None).await;
    }

    /// Wait for a token unless that would run past `deadline`.
    ///
    /// Returns `false`, without consuming a token, when the deadline would
    /// pass first.
    pub async fn acquire_before(&self, deadline: Option<Instant>) -> bool {
        let Some(rate) = self.rate else {
            return deadline.map_or(true, |d| Instant::now() < d);
        };

        loop {
            match self.try_take(rate) {
                Ok(()) => return true,
                Err(wait) => {
                    if let Some(deadline) = deadline {
                        if would_pass(deadline, wait) {
                            return false;
                        }
                    }
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }
}

/// Verify every candidate, returning exactly one result per candidate.
///
/// Runs at most `max_concurrency` checks at once. When the configured
/// deadline elapses, candidates that have not started are recorded as
/// indeterminate with reason `deadline-exceeded`; in-flight checks finish
/// their current attempt and stop. Results come back in completion order.
pub async fn verify_all(
    checker: &AvailabilityChecker,
    candidates: Vec<Candidate>,
) -> Vec<VerificationResult> {
    if candidates.is_empty() {
        return Vec::new();
    }

    let config = checker.config();
    let deadline = deadline_after(config.deadline);
    let total = candidates.len();

    info!(
        "Verifying {} candidates (concurrency {}, rate {:?}/s)",
        total, config.max_concurrency, config.max_requests_per_second
    );

    let results: Vec<VerificationResult> = stream::iter(candidates)
        .map(|candidate| async move {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                debug!("Deadline passed before {} started", candidate.domain);
                return VerificationResult::deadline_exceeded(candidate);
            }
            checker.check_until(candidate, deadline).await
        })
        .buffer_unordered(config.max_concurrency.max(1))
        .collect()
        .await;

    debug_assert_eq!(results.len(), total);
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_unlimited_never_waits() {
        let limiter = RateLimiter::unlimited();
        let start = Instant::now();
        for _ in 0..100 {
            limiter.acquire().await;
        }
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bucket_spends_burst_then_waits() {
        let limiter = RateLimiter::new(Some(2.0));
        let start = Instant::now();

        // two tokens of burst, then one every 500ms
        for _ in 0..4 {
            limiter.acquire().await;
        }

        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(1000), "{:?}", elapsed);
        assert!(elapsed < Duration::from_millis(1100), "{:?}", elapsed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_respects_deadline() {
        let limiter = RateLimiter::new(Some(1.0));
        assert!(limiter.acquire_before(None).await);

        let deadline = Instant::now() + Duration::from_millis(200);
        assert!(!limiter.acquire_before(Some(deadline)).await);
        assert!(Instant::now() < deadline);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unlimited_still_honors_passed_deadline() {
        let limiter = RateLimiter::unlimited();
        let deadline = Instant::now();
        assert!(!limiter.acquire_before(Some(deadline)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tiny_rate_waits_are_capped() {
        let limiter = RateLimiter::new(Some(1e-20));
        limiter.acquire().await;

        let deadline = Instant::now() + Duration::from_secs(60);
        assert!(!limiter.acquire_before(Some(deadline)).await);
        assert_eq!(limiter.try_take(1e-20), Err(MAX_TOKEN_WAIT));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unrepresentable_deadline_means_none() {
        assert!(deadline_after(Some(Duration::MAX)).is_none());
        assert!(deadline_after(None).is_none());
        assert!(deadline_after(Some(Duration::from_secs(5))).is_some());

        let deadline = Instant::now() + Duration::from_secs(1);
        assert!(would_pass(deadline, Duration::MAX));
        assert!(!would_pass(deadline, Duration::from_millis(10)));
    }

    #[test]
    fn test_invalid_rates_disable_limiting() {
        assert_eq!(RateLimiter::new(Some(0.0)).rate(), None);
        assert_eq!(RateLimiter::new(Some(-3.0)).rate(), None);
        assert_eq!(RateLimiter::new(Some(f64::NAN)).rate(), None);
        assert_eq!(RateLimiter::new(Some(5.0)).rate(), Some(5.0));
    }
}
