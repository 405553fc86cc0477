use anyhow::Result;
use sqlx::SqlitePool;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

mod database;
mod models;
mod repository;
mod routes;

use common::database::DatabaseConfig;

use crate::repository::ProfileRepository;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub profiles: ProfileRepository,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("setting default subscriber failed");

    info!("Starting user service");

    // Initialize database connection pool and schema
    let db_config = DatabaseConfig::from_env(database::DEFAULT_DATABASE_URL)?;
    let pool = common::database::init_pool(&db_config).await?;
    database::init_schema(&pool).await?;
    database::seed_admin(&pool).await?;

    if common::database::health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    let app_state = AppState {
        db_pool: pool.clone(),
        profiles: ProfileRepository::new(pool),
    };

    // Start the web server
    let app = routes::create_router(app_state);

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8002".to_string());
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("User service listening on {}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
