// Discord delivery
//
//   palette       : emoji/colour per event type
//   builders      : event → embed
//   retry_strategy: attempt budget and waits
//   http_client   : POSTs to the webhook URL with retries

pub mod builders;
pub mod http_client;
pub mod palette;
pub mod retry_strategy;

pub use builders::MessageBuilder;
pub use http_client::{DeliveryError, DeliveryReceipt, DiscordClient, HttpClientError};
pub use retry_strategy::RetryStrategy;
