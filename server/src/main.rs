//! # Sandbox Issuer Server
//!
//! Runs the sandbox issuer with in-memory state, the demo signing key, and
//! the VC service and CMS named in the environment.

use std::sync::Arc;

use sandbox_server::config::Config;
use sandbox_server::provider::Provider;
use sandbox_server::{router, AppState};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::from_env();
    let addr = config.validate()?;
    let config = Arc::new(config);

    let state = AppState::new(Provider::new(Arc::clone(&config)), config);

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, router(state)).await?;

    Ok(())
}
