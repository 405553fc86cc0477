use anyhow::Result;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

mod error;
mod forward;
mod middleware;
mod routes;

use crate::forward::{ServiceClient, ServiceEndpoints};
use crate::middleware::TokenVerifier;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub services: ServiceEndpoints,
    pub client: ServiceClient,
    pub verifier: TokenVerifier,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("setting default subscriber failed");

    info!("Starting API gateway");

    let services = ServiceEndpoints::from_env();
    info!(
        "Backends: auth={} users={} orders={}",
        services.auth, services.users, services.orders
    );

    // Shared-secret misconfiguration is fatal at startup
    let verifier = TokenVerifier::from_env()?;
    let client = ServiceClient::new()?;

    let app_state = AppState {
        services,
        client,
        verifier,
    };

    // Start the web server
    let app = routes::create_router(app_state);

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".to_string());
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("API gateway listening on {}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
