use axum::http::StatusCode;

/// Liveness check. Touches neither Discord nor the rate limit store.
pub async fn health_check() -> StatusCode {
    StatusCode::OK
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_check() {
        assert_eq!(health_check().await, StatusCode::OK);
    }
}
