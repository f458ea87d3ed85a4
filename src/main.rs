use svc_discovery::config::Config;
use svc_discovery::server;
use tracing_subscriber::EnvFilter;

#[global_allocator]
static GLOBAL: jemallocator::Jemalloc = jemallocator::Jemalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::load()?;
    tracing::info!(
        bind_address = %config.server.bind_address(),
        lease_secs = config.registry.lease_duration_secs,
        "Starting discovery server..."
    );

    server::start(config).await?;
    Ok(())
}
