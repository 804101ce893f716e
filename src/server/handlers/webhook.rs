use axum::Json;
use axum::body::{Bytes, to_bytes};
use axum::extract::{Request, State};
use axum::http::{HeaderMap, StatusCode};
use tracing::{debug, info, warn};

use crate::domain::ports::RateDecision;
use crate::domain::schema::{SchemaError, parse_webhook};
use crate::inbound::SIGNATURE_HEADER;
use crate::server::AppState;
use crate::server::error::ApiError;
use crate::server::responses::MessageBody;

const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";
const UNKNOWN_CLIENT: &str = "unknown";
/// Vercel payloads are a few kilobytes.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// `POST /webhook`: rate limit, verify, validate, build, deliver.
pub async fn receive_webhook(
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<MessageBody>, ApiError> {
    let (parts, body) = request.into_parts();
    let client = client_identity(&parts.headers);

    match state.rate_limiter.check(&client).await {
        Ok(RateDecision::Allowed { remaining }) => {
            debug!(client = %client, remaining, "Rate limit check passed")
        }
        Ok(RateDecision::Limited { retry_after }) => {
            return Err(ApiError::RateLimited { retry_after });
        }
        Err(e) => warn!(
            client = %client,
            backend = state.rate_limiter.backend(),
            error = %e,
            "Rate limiter unavailable, letting request through"
        ),
    }

    let raw: Bytes = to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|e| ApiError::Unexpected(format!("Failed to read request body: {e}")))?;

    let signature = parts
        .headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());
    if !state.verifier.verify(&raw, signature) {
        return Err(ApiError::InvalidSignature);
    }

    let event = parse_webhook(&raw).map_err(|e| match e {
        SchemaError::Invalid(invalid) => ApiError::Validation(invalid),
        SchemaError::Malformed(err) => ApiError::Unexpected(format!("Malformed JSON body: {err}")),
    })?;

    info!(event_id = %event.id, event_type = %event.kind, "Webhook received");
    if !event.kind.is_known() {
        debug!(event_type = %event.kind, "Unrecognised event type, sending generic message");
    }

    let message = state.builder.build(&event);
    let receipt = state.discord.deliver(&message).await?;

    info!(
        event_id = %event.id,
        attempts = receipt.attempts,
        "Webhook processed"
    );
    Ok(Json(MessageBody::processed()))
}

/// `GET /webhook`
pub async fn method_not_allowed() -> (StatusCode, Json<MessageBody>) {
    (StatusCode::METHOD_NOT_ALLOWED, Json(MessageBody::post_only()))
}

/// First `x-forwarded-for` entry, or `"unknown"`.
fn client_identity(headers: &HeaderMap) -> String {
    headers
        .get(FORWARDED_FOR_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .unwrap_or(UNKNOWN_CLIENT)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{HeaderValue, Method};
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::domain::message::BotIdentity;
    use crate::domain::ports::{RateLimitError, RateLimiter};
    use crate::inbound::SignatureVerifier;
    use crate::infrastructure::InMemoryRateLimiter;
    use crate::outbound::discord::{DiscordClient, MessageBuilder, RetryStrategy};
    use crate::server::router;

    const SECRET: &str = "test-secret";

    struct BrokenLimiter;

    #[async_trait]
    impl RateLimiter for BrokenLimiter {
        async fn check(&self, _identity: &str) -> Result<RateDecision, RateLimitError> {
            Err(RateLimitError::StoreUnavailable("connection refused".to_string()))
        }

        fn backend(&self) -> &'static str {
            "broken"
        }
    }

    fn state(discord_url: String, rate_limiter: Arc<dyn RateLimiter>) -> AppState {
        let discord = DiscordClient::new(discord_url)
            .unwrap()
            .with_retry_strategy(RetryStrategy::new(2, 1));

        AppState {
            verifier: Arc::new(SignatureVerifier::new(SECRET)),
            rate_limiter,
            builder: Arc::new(MessageBuilder::new(BotIdentity {
                username: "Vercord".to_string(),
                avatar_url: "https://example.com/avatar.png".to_string(),
            })),
            discord: Arc::new(discord),
        }
    }

    fn signed_post(body: &str) -> Request {
        let signature = SignatureVerifier::new(SECRET).sign(body.as_bytes());
        Request::builder()
            .method(Method::POST)
            .uri("/webhook")
            .header(SIGNATURE_HEADER, signature)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn project_created() -> String {
        json!({
            "id": "evt_1",
            "type": "project.created",
            "createdAt": 1_700_000_000_000_i64,
            "payload": { "project": { "id": "prj_1" } }
        })
        .to_string()
    }

    #[test]
    fn test_client_identity_uses_first_forwarded_entry() {
        let mut headers = HeaderMap::new();
        headers.insert(
            FORWARDED_FOR_HEADER,
            HeaderValue::from_static(" 203.0.113.7 , 10.0.0.1"),
        );
        assert_eq!(client_identity(&headers), "203.0.113.7");
    }

    #[test]
    fn test_client_identity_defaults_to_unknown() {
        assert_eq!(client_identity(&HeaderMap::new()), "unknown");

        let mut headers = HeaderMap::new();
        headers.insert(FORWARDED_FOR_HEADER, HeaderValue::from_static(""));
        assert_eq!(client_identity(&headers), "unknown");
    }

    #[tokio::test]
    async fn test_rate_limiter_failure_fails_open() {
        let discord = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&discord)
            .await;

        let app = router(state(discord.uri(), Arc::new(BrokenLimiter)));
        let response = app.oneshot(signed_post(&project_created())).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            json!({ "success": true, "message": "Webhook processed" })
        );
    }

    #[tokio::test]
    async fn test_malformed_json_is_an_internal_error() {
        let discord = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(204))
            .expect(0)
            .mount(&discord)
            .await;

        let limiter = Arc::new(InMemoryRateLimiter::new(10, Duration::from_secs(60)));
        let app = router(state(discord.uri(), limiter));
        let response = app.oneshot(signed_post("{not json")).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            json_body(response).await,
            json!({ "success": false, "error": "Internal server error" })
        );
    }

    #[tokio::test]
    async fn test_signature_checked_before_parsing() {
        let discord = MockServer::start().await;
        let limiter = Arc::new(InMemoryRateLimiter::new(10, Duration::from_secs(60)));
        let app = router(state(discord.uri(), limiter));

        let request = Request::builder()
            .method(Method::POST)
            .uri("/webhook")
            .body(Body::from("{not json"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["code"], "invalid_signature");
    }

    #[tokio::test]
    async fn test_get_is_rejected() {
        let response = method_not_allowed().await;
        assert_eq!(response.0, StatusCode::METHOD_NOT_ALLOWED);
    }
}
