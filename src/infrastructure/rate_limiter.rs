use crate::domain::ports::{RateDecision, RateLimitError, RateLimiter};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

pub const DEFAULT_MAX_TRACKED_IDENTITIES: usize = 10_000;
pub const DEFAULT_CLEANUP_INTERVAL: u64 = 100;

type HitLog = HashMap<String, VecDeque<Instant>>;

/// Sliding-window log kept in process memory.
///
/// Counters live only as long as this process: they reset on restart and are
/// not shared between instances, so the effective quota grows with the number
/// of replicas. Use the Redis backend when running more than one instance.
///
/// Client identities come from a header the client controls, so memory is
/// bounded two ways: idle identities are swept every `cleanup_interval`
/// checks, and at most `max_tracked_identities` are held at once. A new
/// identity arriving at the cap forces a sweep and is limited if there is
/// still no room.
pub struct InMemoryRateLimiter {
    max_requests: u32,
    window: Duration,
    max_tracked_identities: usize,
    cleanup_interval: u64,
    // Timestamps of allowed requests per identity, oldest first
    hits: Mutex<HitLog>,
    checks: AtomicU64,
}

impl InMemoryRateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            max_tracked_identities: DEFAULT_MAX_TRACKED_IDENTITIES,
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
            hits: Mutex::new(HashMap::new()),
            checks: AtomicU64::new(0),
        }
    }

    pub fn with_max_tracked_identities(mut self, max: usize) -> Self {
        self.max_tracked_identities = max.max(1);
        self
    }

    /// Sweep idle identities every `interval` checks.
    pub fn with_cleanup_interval(mut self, interval: u64) -> Self {
        self.cleanup_interval = interval.max(1);
        self
    }

    /// Number of identities currently tracked.
    pub async fn tracked_identities(&self) -> usize {
        self.hits.lock().await.len()
    }

    /// Drop identities whose whole log has aged out of the window.
    fn sweep(&self, hits: &mut HitLog, now: Instant) {
        let before = hits.len();
        hits.retain(|_, log| {
            log.back()
                .is_some_and(|last| now.duration_since(*last) < self.window)
        });
        debug!(evicted = before - hits.len(), tracked = hits.len(), "Rate limiter sweep");
    }
}

#[async_trait]
impl RateLimiter for InMemoryRateLimiter {
    async fn check(&self, identity: &str) -> Result<RateDecision, RateLimitError> {
        let now = Instant::now();
        let mut hits = self.hits.lock().await;

        let checks = self.checks.fetch_add(1, Ordering::Relaxed) + 1;
        if checks % self.cleanup_interval == 0 {
            self.sweep(&mut hits, now);
        }

        if !hits.contains_key(identity) && hits.len() >= self.max_tracked_identities {
            self.sweep(&mut hits, now);
            if hits.len() >= self.max_tracked_identities {
                warn!(
                    identity = %identity,
                    tracked = hits.len(),
                    "Too many tracked identities, limiting new client"
                );
                return Ok(RateDecision::Limited {
                    retry_after: self.window,
                });
            }
        }

        let log = hits.entry(identity.to_string()).or_default();
        while log
            .front()
            .is_some_and(|first| now.duration_since(*first) >= self.window)
        {
            log.pop_front();
        }

        if log.len() as u32 >= self.max_requests {
            let retry_after = log
                .front()
                .map(|first| self.window.saturating_sub(now.duration_since(*first)))
                .unwrap_or(self.window);

            debug!(
                identity = %identity,
                retry_after_ms = retry_after.as_millis() as u64,
                "Rate limit exceeded"
            );
            return Ok(RateDecision::Limited { retry_after });
        }

        log.push_back(now);
        Ok(RateDecision::Allowed {
            remaining: self.max_requests - log.len() as u32,
        })
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter() -> InMemoryRateLimiter {
        InMemoryRateLimiter::new(10, Duration::from_secs(60))
    }

    #[tokio::test(start_paused = true)]
    async fn test_allows_up_to_quota() {
        let limiter = limiter();

        for expected_remaining in (0..10).rev() {
            let decision = limiter.check("1.2.3.4").await.unwrap();
            assert_eq!(
                decision,
                RateDecision::Allowed {
                    remaining: expected_remaining
                }
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_eleventh_request_is_limited() {
        let limiter = limiter();

        for _ in 0..10 {
            assert!(limiter.check("1.2.3.4").await.unwrap().is_allowed());
        }

        let decision = limiter.check("1.2.3.4").await.unwrap();
        assert_eq!(
            decision,
            RateDecision::Limited {
                retry_after: Duration::from_secs(60)
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_identities_are_independent() {
        let limiter = limiter();

        for _ in 0..10 {
            limiter.check("1.2.3.4").await.unwrap();
        }

        assert!(!limiter.check("1.2.3.4").await.unwrap().is_allowed());
        assert!(limiter.check("5.6.7.8").await.unwrap().is_allowed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_slides() {
        let limiter = limiter();

        for _ in 0..5 {
            limiter.check("unknown").await.unwrap();
        }
        tokio::time::advance(Duration::from_secs(30)).await;
        for _ in 0..5 {
            limiter.check("unknown").await.unwrap();
        }

        // 10 hits inside the window: the next one waits for the oldest batch to expire
        let decision = limiter.check("unknown").await.unwrap();
        assert_eq!(
            decision,
            RateDecision::Limited {
                retry_after: Duration::from_secs(30)
            }
        );

        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(
            limiter.check("unknown").await.unwrap(),
            RateDecision::Allowed { remaining: 4 }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_requests_do_not_extend_the_block() {
        let limiter = InMemoryRateLimiter::new(1, Duration::from_secs(10));

        assert!(limiter.check("a").await.unwrap().is_allowed());
        for _ in 0..5 {
            assert!(!limiter.check("a").await.unwrap().is_allowed());
        }

        tokio::time::advance(Duration::from_secs(10)).await;
        assert!(limiter.check("a").await.unwrap().is_allowed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_identities_are_swept_periodically() {
        let limiter = limiter().with_cleanup_interval(3);

        limiter.check("a").await.unwrap();
        limiter.check("b").await.unwrap();
        assert_eq!(limiter.tracked_identities().await, 2);

        // Third check runs the sweep before recording "c"
        tokio::time::advance(Duration::from_secs(61)).await;
        limiter.check("c").await.unwrap();
        assert_eq!(limiter.tracked_identities().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spoofed_identities_are_capped() {
        let limiter = limiter().with_max_tracked_identities(100);

        for i in 0..1_000 {
            limiter.check(&format!("10.0.{}.{}", i / 256, i % 256)).await.unwrap();
        }
        assert_eq!(limiter.tracked_identities().await, 100);

        // New clients are turned away while the table is full
        assert_eq!(
            limiter.check("203.0.113.7").await.unwrap(),
            RateDecision::Limited {
                retry_after: Duration::from_secs(60)
            }
        );
        // Already tracked clients keep their own quota
        assert!(limiter.check("10.0.0.0").await.unwrap().is_allowed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_table_makes_room_once_entries_expire() {
        let limiter = limiter().with_max_tracked_identities(2);

        limiter.check("a").await.unwrap();
        limiter.check("b").await.unwrap();
        assert!(!limiter.check("c").await.unwrap().is_allowed());

        tokio::time::advance(Duration::from_secs(60)).await;
        assert!(limiter.check("c").await.unwrap().is_allowed());
        assert_eq!(limiter.tracked_identities().await, 1);
    }
}
