pub mod events;
pub mod message;
pub mod ports;
pub mod schema;

pub use events::{EventKind, WebhookEvent};
pub use message::{BotIdentity, EmbedField, OutboundMessage};
pub use ports::{RateDecision, RateLimitError, RateLimiter};
pub use schema::{SchemaError, ValidationError, parse_webhook, validate_webhook};
