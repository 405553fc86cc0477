//! Schema setup for the user service database

use anyhow::Result;
use sqlx::SqlitePool;
use tracing::info;

/// Default database URL when `DATABASE_URL` is not set
pub const DEFAULT_DATABASE_URL: &str = "sqlite://user_service.db";

/// Create the user service tables if they do not exist
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT UNIQUE NOT NULL,
            email TEXT,
            first_name TEXT,
            last_name TEXT,
            phone TEXT,
            address TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Seed the default admin profile on first run
pub async fn seed_admin(pool: &SqlitePool) -> Result<()> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE username = ?")
        .bind("admin")
        .fetch_one(pool)
        .await?;

    if count == 0 {
        sqlx::query(
            "INSERT INTO users (username, email, first_name, last_name) VALUES (?, ?, ?, ?)",
        )
        .bind("admin")
        .bind("admin@example.com")
        .bind("Admin")
        .bind("User")
        .execute(pool)
        .await?;
        info!("Default 'admin' profile created");
    }

    Ok(())
}

/// In-memory database pool with the full schema, for tests
#[cfg(test)]
pub async fn test_pool() -> SqlitePool {
    use common::database::{DatabaseConfig, init_pool};

    let config = DatabaseConfig {
        database_url: "sqlite::memory:".to_string(),
        max_connections: 1,
    };

    let pool = init_pool(&config).await.expect("in-memory pool");
    init_schema(&pool).await.expect("schema");
    pool
}
