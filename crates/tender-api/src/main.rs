//! Tender Ingest API server.

use std::net::SocketAddr;

use tender_api::bootstrap::initialize_app_state;
use tender_api::routes;
use tender_config::{ApplicationConfig, Profile};
use tracing::info;

type MainResult = Result<(), Box<dyn std::error::Error>>;

#[tokio::main]
async fn main() -> MainResult {
    tender_common::initialize_environment();
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    info!("starting tender ingest API server");
    let config = ApplicationConfig::with_profile(Profile::Production);
    let state = initialize_app_state(&config).await?;

    let app = routes::create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.api.host, config.api.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("listening on http://{addr}");
    axum::serve(listener, app).await?;

    Ok(())
}
