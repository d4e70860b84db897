//! buy-01 mock API - in-memory backend for storefront development

use anyhow::Result;
use buy01_storefront::mock::{self, MockState};
use buy01_storefront::MockServerConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = MockServerConfig::from_env()?;
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    tracing::info!(port = config.port, seeded = config.seed, "buy-01 mock API starting");
    mock::serve(listener, MockState::new(config.seed)).await?;
    Ok(())
}
