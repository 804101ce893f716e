use vercord::config::Config;
use vercord::server::Server;
use vercord::telemetry;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static ALLOC: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    telemetry::init_tracing();

    // Secrets are redacted in Debug output
    let config = Config::load()?;
    tracing::info!("Loaded configuration: {:?}", config);

    let server = Server::new(&config).await?;
    server.run().await
}
