mod error;
mod handlers;
mod responses;

pub use error::ApiError;

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::config::Config;
use crate::domain::ports::RateLimiter;
use crate::inbound::SignatureVerifier;
use crate::infrastructure::build_rate_limiter;
use crate::outbound::discord::{DiscordClient, MessageBuilder};
use crate::server::handlers::{health::health_check, root::home, webhook};
use axum::http::Method;
use axum::{Router, routing::get};
use color_eyre::eyre::{Context, Result};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// The global application state shared between all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub verifier: Arc<SignatureVerifier>,
    pub rate_limiter: Arc<dyn RateLimiter>,
    pub builder: Arc<MessageBuilder>,
    pub discord: Arc<DiscordClient>,
}

impl AppState {
    /// Wire every pipeline stage from configuration.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let rate_limiter = build_rate_limiter(&config.rate_limit)
            .await
            .wrap_err("Failed to set up the rate limiter")?;

        let discord = DiscordClient::with_timeout(
            config.discord.webhook_url.expose(),
            config.discord.timeout(),
        )
        .wrap_err("Failed to build the Discord HTTP client")?
        .with_retry_strategy(config.delivery.retry_strategy());

        tracing::info!(
            backend = rate_limiter.backend(),
            max_requests = config.rate_limit.max_requests,
            window_secs = config.rate_limit.window_secs,
            max_attempts = config.delivery.max_attempts,
            "Webhook pipeline ready"
        );

        Ok(Self {
            verifier: Arc::new(SignatureVerifier::new(config.vercel.webhook_secret.expose())),
            rate_limiter,
            builder: Arc::new(MessageBuilder::new(config.discord.bot_identity())),
            discord: Arc::new(discord),
        })
    }
}

/// Routes and layers, without a listener.
pub fn router(state: AppState) -> Router {
    let trace_layer =
        TraceLayer::new_for_http().make_span_with(|request: &'_ axum::extract::Request<_>| {
            let uri = request.uri().to_string();
            tracing::info_span!("request", method = %request.method(), uri)
        });

    let cors_layer = CorsLayer::new()
        .allow_origin(Any)
        .allow_headers(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS]);

    Router::new()
        .route("/", get(home))
        .route("/health", get(health_check))
        .route(
            "/webhook",
            get(webhook::method_not_allowed).post(webhook::receive_webhook),
        )
        .layer(cors_layer)
        .layer(trace_layer)
        .with_state(state)
}

pub struct Server {
    router: Router,
    listener: TcpListener,
    addr: SocketAddr,
}

impl Server {
    /// Creates a new HTTP server.
    pub async fn new(config: &Config) -> Result<Self> {
        let state = AppState::from_config(config).await?;
        let router = router(state);

        let listener = TcpListener::bind(format!("{}:{}", config.server.host, config.server.port))
            .await
            .wrap_err_with(|| format!("Failed to bind to port {}", config.server.port))?;
        let addr = listener
            .local_addr()
            .wrap_err("Failed to read the bound address")?;

        Ok(Self {
            router,
            listener,
            addr,
        })
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Runs the HTTP server until Ctrl-C.
    pub async fn run(self) -> Result<()> {
        tracing::info!("Server listening on {}", self.addr);
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        tracing::info!("Server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for the shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
