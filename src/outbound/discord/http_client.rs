use reqwest::header::RETRY_AFTER;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::retry_strategy::RetryStrategy;
use crate::domain::message::{OutboundMessage, WebhookBody};

/// Wait used when a 429 carries no usable hint.
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(5);

/// Error type for a single HTTP attempt
#[derive(Debug, Error)]
pub enum HttpClientError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Request timeout after {0:?}")]
    Timeout(Duration),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Response error: status={status}, body={body}")]
    ResponseError { status: StatusCode, body: String },

    #[error("Rate limited by receiver, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },
}

impl HttpClientError {
    pub fn status_code(&self) -> Option<u16> {
        match self {
            HttpClientError::ResponseError { status, .. } => Some(status.as_u16()),
            HttpClientError::RateLimited { .. } => Some(StatusCode::TOO_MANY_REQUESTS.as_u16()),
            _ => None,
        }
    }
}

/// Delivery gave up. Carries what the last attempt saw.
#[derive(Debug, Error)]
#[error("Delivery failed after {attempts} attempt(s): {last_error}")]
pub struct DeliveryError {
    pub attempts: u32,
    pub last_status: Option<u16>,
    pub last_error: String,
}

impl DeliveryError {
    fn from_last(attempts: u32, last: &HttpClientError) -> Self {
        Self {
            attempts,
            last_status: last.status_code(),
            last_error: last.to_string(),
        }
    }
}

/// Outcome of a successful delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryReceipt {
    pub attempts: u32,
    pub status: u16,
}

/// Body Discord sends along with a 429
#[derive(Debug, Deserialize)]
struct RateLimitBody {
    retry_after: f64,
}

/// HTTP client posting messages to a Discord webhook
pub struct DiscordClient {
    client: Client,
    webhook_url: String,
    timeout: Duration,
    retry_strategy: RetryStrategy,
}

impl DiscordClient {
    /// Create a client with default timeout (10 seconds) and retry strategy
    pub fn new(webhook_url: impl Into<String>) -> Result<Self, HttpClientError> {
        Self::with_timeout(webhook_url, Duration::from_secs(10))
    }

    /// Create a client with custom timeout
    pub fn with_timeout(
        webhook_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, HttpClientError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(format!("Vercord/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| HttpClientError::RequestFailed(e.to_string()))?;

        Ok(Self {
            client,
            webhook_url: webhook_url.into(),
            timeout,
            retry_strategy: RetryStrategy::default_strategy(),
        })
    }

    /// Override the retry strategy.
    pub fn with_retry_strategy(mut self, strategy: RetryStrategy) -> Self {
        self.retry_strategy = strategy;
        self
    }

    /// Deliver one message, retrying until it is accepted or the budget runs out.
    ///
    /// Attempts run one after another; all waiting happens inside this call.
    pub async fn deliver(
        &self,
        message: &OutboundMessage,
    ) -> Result<DeliveryReceipt, DeliveryError> {
        let body = message.to_webhook_body();
        let mut rate_limit_waited = Duration::ZERO;
        let mut attempt = 0;

        loop {
            attempt += 1;

            let err = match self.send_once(&body).await {
                Ok(status) => {
                    info!(
                        attempt,
                        status,
                        title = %message.title,
                        "Discord notification delivered"
                    );
                    return Ok(DeliveryReceipt { attempts: attempt, status });
                }
                Err(e) => e,
            };

            if !self.retry_strategy.should_retry(attempt) {
                error!(attempt, error = %err, "Discord delivery permanently failed");
                return Err(DeliveryError::from_last(attempt, &err));
            }

            let delay = match &err {
                HttpClientError::RateLimited { retry_after } => {
                    let delay = self.retry_strategy.rate_limit_delay(*retry_after);
                    let total = rate_limit_waited.saturating_add(delay);
                    if total > self.retry_strategy.max_rate_limit_wait() {
                        error!(
                            attempt,
                            wait_ms = delay.as_millis() as u64,
                            "Discord rate limit wait exceeds budget, giving up"
                        );
                        return Err(DeliveryError::from_last(attempt, &err));
                    }
                    rate_limit_waited = total;
                    delay
                }
                _ => self
                    .retry_strategy
                    .backoff_delay(attempt)
                    .unwrap_or_default(),
            };

            warn!(
                attempt,
                max_attempts = self.retry_strategy.max_attempts(),
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Discord delivery failed, will retry"
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// One POST to the webhook. Returns the HTTP status on success.
    async fn send_once(&self, body: &WebhookBody<'_>) -> Result<u16, HttpClientError> {
        let start = Instant::now();

        let response = self
            .client
            .post(&self.webhook_url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        debug!(
            status = status.as_u16(),
            response_time_ms = start.elapsed().as_millis() as u64,
            "Discord response received"
        );

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = retry_after_hint(response).await;
            return Err(HttpClientError::RateLimited { retry_after });
        }

        if !status.is_success() {
            let body = read_response_body(response).await?;
            return Err(HttpClientError::ResponseError { status, body });
        }

        Ok(status.as_u16())
    }

    fn classify(&self, err: reqwest::Error) -> HttpClientError {
        if err.is_timeout() {
            HttpClientError::Timeout(self.timeout)
        } else if err.is_connect() {
            HttpClientError::NetworkError(err.to_string())
        } else {
            HttpClientError::RequestFailed(err.to_string())
        }
    }
}

/// Retry hint from the `Retry-After` header (seconds), then from Discord's
/// JSON body, then [`DEFAULT_RETRY_AFTER`].
async fn retry_after_hint(response: Response) -> Duration {
    let from_header = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<f64>().ok())
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok());

    if let Some(hint) = from_header {
        return hint;
    }

    response
        .json::<RateLimitBody>()
        .await
        .ok()
        .and_then(|body| Duration::try_from_secs_f64(body.retry_after).ok())
        .unwrap_or(DEFAULT_RETRY_AFTER)
}

/// Read response body with size limit
async fn read_response_body(response: Response) -> Result<String, HttpClientError> {
    // Error bodies only end up in logs
    const MAX_BODY_SIZE: usize = 64 * 1024;

    let bytes = response.bytes().await.map_err(|e| {
        HttpClientError::RequestFailed(format!("Failed to read response body: {e}"))
    })?;

    Ok(String::from_utf8_lossy(&bytes[..bytes.len().min(MAX_BODY_SIZE)]).to_string())
}
