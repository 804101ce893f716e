/*
   Seams between the request pipeline and the pieces that hold state.
*/

use async_trait::async_trait;
use std::time::Duration;

/// Error type for rate limiter backends
#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    #[error("Rate limit store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Rate limit store returned an unexpected reply: {0}")]
    UnexpectedReply(String),
}

/// Outcome of a rate limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed { remaining: u32 },
    Limited { retry_after: Duration },
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateDecision::Allowed { .. })
    }
}

/// Sliding-window quota keyed by client identity.
///
/// Allowed requests count against the quota; rejected ones do not.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    async fn check(&self, identity: &str) -> Result<RateDecision, RateLimitError>;

    /// Short backend name used in logs.
    fn backend(&self) -> &'static str;
}
