pub mod rate_limiter;
pub mod redis_rate_limiter;

pub use rate_limiter::InMemoryRateLimiter;
pub use redis_rate_limiter::RedisRateLimiter;

use std::sync::Arc;

use crate::config::{RateLimitBackend, RateLimitConfig, Secret};
use crate::domain::ports::{RateLimitError, RateLimiter};

/// Build the rate limiter selected in configuration.
pub async fn build_rate_limiter(
    config: &RateLimitConfig,
) -> Result<Arc<dyn RateLimiter>, RateLimitError> {
    match config.backend {
        RateLimitBackend::Memory => Ok(Arc::new(
            InMemoryRateLimiter::new(config.max_requests, config.window())
                .with_max_tracked_identities(config.max_tracked_identities),
        )),
        RateLimitBackend::Redis => {
            let url = config.redis_url.as_ref().map(Secret::expose).ok_or_else(|| {
                RateLimitError::StoreUnavailable("rate_limit.redis_url is not set".to_string())
            })?;
            let limiter =
                RedisRateLimiter::connect(url, config.max_requests, config.window()).await?;
            Ok(Arc::new(limiter))
        }
    }
}
