//! Schema setup for the auth service database
//!
//! The auth service owns two tables: `users` (credentials) and
//! `refresh_tokens`. The schema is created at startup; a default `admin`
//! account is seeded on first run.

use anyhow::Result;
use sqlx::SqlitePool;
use tracing::info;

/// Default database URL when `DATABASE_URL` is not set
pub const DEFAULT_DATABASE_URL: &str = "sqlite://auth_service.db";

/// Create the auth service tables if they do not exist
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT UNIQUE NOT NULL,
            password_hash TEXT NOT NULL,
            email TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS refresh_tokens (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            token TEXT UNIQUE NOT NULL,
            username TEXT NOT NULL,
            expires_at INTEGER NOT NULL,
            created_at INTEGER NOT NULL,
            revoked BOOLEAN NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_token ON refresh_tokens(token)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_username ON refresh_tokens(username)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Seed the default admin account on first run
pub async fn seed_admin(pool: &SqlitePool) -> Result<()> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE username = ?")
        .bind("admin")
        .fetch_one(pool)
        .await?;

    if count == 0 {
        let password_hash = crate::repositories::user::hash_password("admin")?;
        sqlx::query("INSERT INTO users (username, password_hash, email) VALUES (?, ?, ?)")
            .bind("admin")
            .bind(&password_hash)
            .bind("admin@example.com")
            .execute(pool)
            .await?;
        info!("Default 'admin' user created");
    }

    Ok(())
}

/// In-memory database pool with the full schema, for tests
#[cfg(test)]
pub async fn test_pool() -> SqlitePool {
    use common::database::{DatabaseConfig, init_pool};

    let config = DatabaseConfig {
        database_url: "sqlite::memory:".to_string(),
        // A single connection keeps every statement on the same in-memory db.
        max_connections: 1,
    };

    let pool = init_pool(&config).await.expect("in-memory pool");
    init_schema(&pool).await.expect("schema");
    pool
}
