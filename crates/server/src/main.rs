//! Agora forum backend entry point.
//!
//! Loads configuration from the environment, initializes the auth core and
//! serves the REST API. Resource routers (posts, communities, ...) nest
//! alongside the auth routes and reuse its principal extractors.

use std::sync::Arc;

use agora_auth_core::{api, AuthConfig};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "agora=info,agora_auth_core=info,tower_http=info".into()),
        )
        .init();

    let config = AuthConfig::from_env()?;
    let bind_address = config.bind_address.clone();

    // Fatal on a missing or undersized JWT secret, before binding.
    let auth = Arc::new(agora_auth_core::init(config).await?);

    let app = api::create_router(auth);

    let listener = TcpListener::bind(&bind_address).await?;
    info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
