mod alerts;
mod api;
mod config;
mod db;
mod directions;
mod error;
mod geo;
mod guardian;
mod models;
mod monitor;
mod relay;
mod session;

use std::sync::Arc;

use config::AppConfig;
use tracing::info;

use alerts::RelayClient;
use directions::MapsClient;
use monitor::MonitorRegistry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load config
    let config = AppConfig::load()?;

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(&config.log_level)
        .init();

    info!("Starting AlertMate trip-safety service...");

    // Init DB
    let pool = db::init_pool(&config.database_url).await?;
    info!("Connected to database");

    // SMS/voice relay on its own listener
    let relay_router = relay::router(config.telephony.clone());
    let relay_listener = tokio::net::TcpListener::bind(&config.relay_bind_addr).await?;
    info!("Relay listening on {}", config.relay_bind_addr);
    tokio::spawn(async move {
        if let Err(e) = axum::serve(relay_listener, relay_router).await {
            tracing::error!("relay server exited: {e}");
        }
    });

    // Main API
    let state = api::AppState {
        pool,
        registry: MonitorRegistry::new(),
        provider: Arc::new(MapsClient::new(
            &config.maps_base_url,
            &config.maps_api_key,
            config.maps_timeout_secs,
        )),
        dispatcher: Arc::new(RelayClient::new(&config.relay_url, config.relay_timeout_secs)),
    };

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("API listening on {}", config.bind_addr);
    axum::serve(listener, api::router(state)).await?;

    Ok(())
}
