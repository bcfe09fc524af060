//! quickpoll server binary.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use quickpoll::clock::SystemClock;
use quickpoll::config::Config;
use quickpoll::{db, routes, telemetry, AppState};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok(); // Load environment variables from .env file
    telemetry::init();

    let config = Config::from_env()?;
    let store = db::open_store(&config).await?;
    let state = AppState::new(store, Arc::new(SystemClock), config.trusted_proxy_hops);

    let cors = routes::cors_layer(config.cors_allow_origin.as_deref())
        .context("CORS_ALLOW_ORIGIN is not a valid header value")?;
    let app = routes::create_routes(state, cors);

    let handle = axum_server::Handle::new();
    tokio::spawn(shutdown_on_ctrl_c(handle.clone()));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!(%addr, "quickpoll listening");
    axum_server::bind(addr)
        .handle(handle)
        .serve(app.into_make_service_with_connect_info::<SocketAddr>())
        .await?;

    info!("quickpoll shutdown complete");
    Ok(())
}

async fn shutdown_on_ctrl_c(handle: axum_server::Handle) {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutting down");
        handle.graceful_shutdown(Some(Duration::from_secs(10)));
    }
}
