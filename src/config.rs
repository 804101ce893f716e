use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use config::{Config as ConfigLib, ConfigBuilder, ConfigError, Environment, builder::DefaultState};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::domain::message::BotIdentity;
use crate::outbound::discord::RetryStrategy;

pub const DEFAULT_BOT_USERNAME: &str = "Vercord";
pub const DEFAULT_BOT_AVATAR_URL: &str =
    "https://assets.vercel.com/image/upload/front/favicon/vercel/180x180.png";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub vercel: VercelConfig,
    pub discord: DiscordConfig,
    pub delivery: DeliveryConfig,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VercelConfig {
    /// Integration secret used to sign `x-vercel-signature`.
    pub webhook_secret: Secret,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscordConfig {
    /// Carries the webhook token, so it is redacted like a secret.
    pub webhook_url: Secret,
    pub username: String,
    pub avatar_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeliveryConfig {
    pub max_attempts: u32,
    pub backoff_base_ms: u64,
    pub rate_limit_margin_ms: u64,
    pub max_rate_limit_wait_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window_secs: u64,
    /// Upper bound on identities the memory backend tracks at once.
    pub max_tracked_identities: usize,
    pub backend: RateLimitBackend,
    /// May carry a password, so it is redacted like a secret.
    pub redis_url: Option<Secret>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateLimitBackend {
    /// Per-process counters. Only accurate for a single instance.
    Memory,
    /// Counters shared through Redis.
    Redis,
}

/// A string that never shows up in `Debug` output.
#[derive(Clone, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret([REDACTED])")
    }
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_sources(None)
    }

    pub fn load_with_sources(
        env_vars: Option<HashMap<String, String>>,
    ) -> Result<Self, ConfigError> {
        let mut builder = Self::set_defaults()?;
        // If env_vars is provided, we use it instead of system environment
        // This is to avoid systems variables pollution across tests
        if let Some(vars) = env_vars {
            for (key, value) in vars {
                builder = builder.set_override(&key, value)?;
            }
        } else {
            // Should be in the format APP_VERCEL__WEBHOOK_SECRET or APP_DISCORD__WEBHOOK_URL
            builder = builder.add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__"),
            );
        }

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Set default values for the configuration.
    /// Secrets and the Discord webhook URL have no default and must be provided.
    fn set_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        ConfigLib::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("discord.username", DEFAULT_BOT_USERNAME)?
            .set_default("discord.avatar_url", DEFAULT_BOT_AVATAR_URL)?
            .set_default("discord.timeout_secs", 10)?
            .set_default("delivery.max_attempts", 3)?
            .set_default("delivery.backoff_base_ms", 1000)?
            .set_default("delivery.rate_limit_margin_ms", 1000)?
            .set_default("delivery.max_rate_limit_wait_ms", 30_000)?
            .set_default("rate_limit.max_requests", 10)?
            .set_default("rate_limit.window_secs", 60)?
            .set_default("rate_limit.max_tracked_identities", 10_000)?
            .set_default("rate_limit.backend", "memory")
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.vercel.webhook_secret.expose().is_empty() {
            return Err(ConfigError::Message(
                "vercel.webhook_secret must not be empty".to_string(),
            ));
        }

        Url::parse(self.discord.webhook_url.expose()).map_err(|e| {
            ConfigError::Message(format!("discord.webhook_url is not a valid URL: {e}"))
        })?;

        if self.delivery.max_attempts == 0 {
            return Err(ConfigError::Message(
                "delivery.max_attempts must be at least 1".to_string(),
            ));
        }

        let limits = &self.rate_limit;
        if limits.max_requests == 0 || limits.window_secs == 0 || limits.max_tracked_identities == 0
        {
            return Err(ConfigError::Message(
                "rate_limit.max_requests, window_secs and max_tracked_identities must be positive"
                    .to_string(),
            ));
        }

        if limits.backend == RateLimitBackend::Redis && limits.redis_url.is_none() {
            return Err(ConfigError::Message(
                "rate_limit.redis_url is required for the redis backend".to_string(),
            ));
        }

        Ok(())
    }
}

impl DiscordConfig {
    pub fn bot_identity(&self) -> BotIdentity {
        BotIdentity {
            username: self.username.clone(),
            avatar_url: self.avatar_url.clone(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl DeliveryConfig {
    pub fn retry_strategy(&self) -> RetryStrategy {
        RetryStrategy::new(self.max_attempts, self.backoff_base_ms)
            .with_rate_limit_margin(Duration::from_millis(self.rate_limit_margin_ms))
            .with_max_rate_limit_wait(Duration::from_millis(self.max_rate_limit_wait_ms))
    }
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}
