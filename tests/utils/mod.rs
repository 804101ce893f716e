#![allow(dead_code)]

use std::collections::HashMap;

use vercord::inbound::{SIGNATURE_HEADER, SignatureVerifier};
use vercord::{config::Config, server::Server};

pub const SECRET: &str = "integration-secret";

/// Start the server on a random port, delivering to `discord_url`.
pub async fn spawn_server(discord_url: &str) -> String {
    spawn_server_with(discord_url, HashMap::new()).await
}

/// Same as [`spawn_server`] with extra configuration overrides.
pub async fn spawn_server_with(discord_url: &str, overrides: HashMap<&str, &str>) -> String {
    let mut env_vars = HashMap::from([
        ("server.host".to_string(), "localhost".to_string()),
        ("server.port".to_string(), "0".to_string()),
        ("vercel.webhook_secret".to_string(), SECRET.to_string()),
        ("discord.webhook_url".to_string(), discord_url.to_string()),
        ("delivery.backoff_base_ms".to_string(), "1".to_string()),
        ("delivery.rate_limit_margin_ms".to_string(), "0".to_string()),
    ]);
    for (key, value) in overrides {
        env_vars.insert(key.to_string(), value.to_string());
    }

    let config = Config::load_with_sources(Some(env_vars)).unwrap();
    let server = Server::new(&config).await.unwrap();

    let port = server.port();
    tokio::spawn(server.run());

    format!("http://{}:{}", config.server.host, port)
}

/// A POST to `/webhook` signed with [`SECRET`].
pub fn signed_webhook(client: &reqwest::Client, addr: &str, body: &str) -> reqwest::RequestBuilder {
    let signature = SignatureVerifier::new(SECRET).sign(body.as_bytes());
    client
        .post(format!("{addr}/webhook"))
        .header(SIGNATURE_HEADER, signature)
        .header("content-type", "application/json")
        .body(body.to_string())
}
