use anyhow::Context;
use relay_core::{EndpointConfig, ResourceClient};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = EndpointConfig::from_env().context("loading upstream configuration")?;
    tracing::info!(
        base_url = config.base_url(),
        read_timeout_ms = config.read_timeout.as_millis() as u64,
        "upstream configured"
    );

    let port = std::env::var("PORT").unwrap_or_else(|_| "8080".to_string());
    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, prefix = relay_gateway::API_PREFIX, "gateway listening");

    relay_gateway::run(listener, ResourceClient::new(config)).await?;
    Ok(())
}
