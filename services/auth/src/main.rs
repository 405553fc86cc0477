use anyhow::Result;
use sqlx::SqlitePool;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

mod database;
mod jwt;
mod models;
mod repositories;
mod routes;
mod session;
mod tokens;
mod validation;

use common::cache::{RedisConfig, RedisPool};
use common::database::DatabaseConfig;

use crate::jwt::{JwtConfig, TokenService};
use crate::repositories::UserRepository;
use crate::session::SessionManager;
use crate::tokens::RefreshTokenRepository;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub user_repository: UserRepository,
    pub token_repository: RefreshTokenRepository,
    pub jwt_service: TokenService,
    pub sessions: SessionManager,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("setting default subscriber failed");

    info!("Starting authentication service");

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

    // JWT signing-key misconfiguration is fatal at startup
    let jwt_config = JwtConfig::from_env()?;
    let jwt_service = TokenService::new(&jwt_config);

    // Session cache is optional
    let cache = match RedisConfig::from_env() {
        Some(config) => Some(RedisPool::new(&config)?),
        None => None,
    };

    let token_repository = RefreshTokenRepository::new(pool.clone());

    // One-off sweep of tokens that expired while the service was down
    token_repository.delete_expired().await?;

    let app_state = AppState {
        db_pool: pool.clone(),
        user_repository: UserRepository::new(pool),
        token_repository,
        jwt_service,
        sessions: SessionManager::new(cache),
    };

    // Start the web server
    let app = routes::create_router(app_state);

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8001".to_string());
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Authentication service listening on {}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
