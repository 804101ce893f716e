use crate::domain::ports::{RateDecision, RateLimitError, RateLimiter};
use async_trait::async_trait;
use redis::Script;
use redis::aio::ConnectionManager;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

// Sliding-window log in a sorted set scored by request time (ms).
// Returns {1, remaining} when the request is admitted, {0, retry_after_ms} otherwise.
const SLIDING_WINDOW_SCRIPT: &str = r"
local key = KEYS[1]
local now = tonumber(ARGV[1])
local window = tonumber(ARGV[2])
local limit = tonumber(ARGV[3])
redis.call('ZREMRANGEBYSCORE', key, '-inf', now - window)
local count = redis.call('ZCARD', key)
if count < limit then
  redis.call('ZADD', key, now, ARGV[4])
  redis.call('PEXPIRE', key, window)
  return {1, limit - count - 1}
end
local oldest = redis.call('ZRANGE', key, 0, 0, 'WITHSCORES')
return {0, tonumber(oldest[2]) + window - now}
";

/// Sliding-window limiter backed by Redis, shared by every instance that
/// points at the same server.
pub struct RedisRateLimiter {
    connection: ConnectionManager,
    script: Script,
    max_requests: u32,
    window: Duration,
    key_prefix: String,
    instance_tag: String,
    sequence: AtomicU64,
}

impl RedisRateLimiter {
    /// Connect to Redis and prepare the limiter.
    pub async fn connect(
        redis_url: &str,
        max_requests: u32,
        window: Duration,
    ) -> Result<Self, RateLimitError> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| RateLimitError::StoreUnavailable(e.to_string()))?;
        let connection = client
            .get_connection_manager()
            .await
            .map_err(|e| RateLimitError::StoreUnavailable(e.to_string()))?;

        info!(max_requests, window_secs = window.as_secs(), "Connected Redis rate limiter");

        Ok(Self {
            connection,
            script: Script::new(SLIDING_WINDOW_SCRIPT),
            max_requests,
            window,
            key_prefix: "vercord:rate_limit".to_string(),
            instance_tag: format!("{}-{}", std::process::id(), now_millis()),
            sequence: AtomicU64::new(0),
        })
    }

    fn key(&self, identity: &str) -> String {
        format!("{}:{}", self.key_prefix, identity)
    }

    // Sorted-set members must be unique or concurrent hits in the same
    // millisecond collapse into one.
    fn member(&self, now_ms: u64) -> String {
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        format!("{now_ms}-{}-{seq}", self.instance_tag)
    }
}

#[async_trait]
impl RateLimiter for RedisRateLimiter {
    async fn check(&self, identity: &str) -> Result<RateDecision, RateLimitError> {
        let now_ms = now_millis();
        let window_ms = self.window.as_millis() as u64;
        let mut connection = self.connection.clone();

        let reply: Vec<i64> = self
            .script
            .key(self.key(identity))
            .arg(now_ms)
            .arg(window_ms)
            .arg(self.max_requests)
            .arg(self.member(now_ms))
            .invoke_async(&mut connection)
            .await
            .map_err(|e| RateLimitError::StoreUnavailable(e.to_string()))?;

        decode_reply(&reply).inspect(|decision| {
            debug!(identity = %identity, decision = ?decision, "Redis rate limit check");
        })
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}

fn decode_reply(reply: &[i64]) -> Result<RateDecision, RateLimitError> {
    match reply {
        [1, remaining] => Ok(RateDecision::Allowed {
            remaining: (*remaining).max(0) as u32,
        }),
        [0, retry_after_ms] => Ok(RateDecision::Limited {
            retry_after: Duration::from_millis((*retry_after_ms).max(0) as u64),
        }),
        other => Err(RateLimitError::UnexpectedReply(format!("{other:?}"))),
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
