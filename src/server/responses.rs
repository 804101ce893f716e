use serde::Serialize;

/// Body of every response that carries a human readable message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageBody {
    success: bool,
    message: &'static str,
}

impl MessageBody {
    pub fn processed() -> Self {
        Self {
            success: true,
            message: "Webhook processed",
        }
    }

    pub fn post_only() -> Self {
        Self {
            success: false,
            message: "This endpoint only accepts POST requests from verified Vercel webhooks",
        }
    }
}

/// Body of every error response. Never carries internal detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    success: bool,
    error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'static str>,
}

impl ErrorBody {
    pub fn new(error: &'static str) -> Self {
        Self {
            success: false,
            error,
            code: None,
        }
    }

    pub fn with_code(error: &'static str, code: &'static str) -> Self {
        Self {
            success: false,
            error,
            code: Some(code),
        }
    }
}
