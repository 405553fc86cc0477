//! Schema setup for the orders service database

use anyhow::Result;
use sqlx::SqlitePool;
use tracing::info;

/// Default database URL when `DATABASE_URL` is not set
pub const DEFAULT_DATABASE_URL: &str = "sqlite://orders_service.db";

/// Create the orders service tables if they do not exist
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS products (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            price REAL NOT NULL,
            description TEXT,
            stock INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS orders (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id TEXT NOT NULL,
            total REAL NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS order_items (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            order_id INTEGER NOT NULL,
            product_id INTEGER NOT NULL,
            quantity INTEGER NOT NULL,
            price REAL NOT NULL,
            FOREIGN KEY (order_id) REFERENCES orders(id),
            FOREIGN KEY (product_id) REFERENCES products(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Seed the product catalog on first run
pub async fn seed_products(pool: &SqlitePool) -> Result<()> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
        .fetch_one(pool)
        .await?;

    if count == 0 {
        let defaults: [(&str, f64, &str, i64); 5] = [
            ("Laptop Dell XPS 13", 1299.0, "High-performance ultrabook", 10),
            ("iPhone 15 Pro", 1199.0, "Latest-generation Apple smartphone", 15),
            ("Sony WH-1000XM5", 399.0, "Noise-cancelling headphones", 20),
            ("iPad Air", 699.0, "Apple 10.9-inch tablet", 12),
            ("Samsung Galaxy Watch", 349.0, "Samsung smartwatch", 18),
        ];

        for (name, price, description, stock) in defaults {
            sqlx::query("INSERT INTO products (name, price, description, stock) VALUES (?, ?, ?, ?)")
                .bind(name)
                .bind(price)
                .bind(description)
                .bind(stock)
                .execute(pool)
                .await?;
        }
        info!("Default product catalog created");
    }

    Ok(())
}

/// In-memory database pool with schema and seeded products, for tests
#[cfg(test)]
pub async fn test_pool() -> SqlitePool {
    use common::database::{DatabaseConfig, init_pool};

    let config = DatabaseConfig {
        database_url: "sqlite::memory:".to_string(),
        max_connections: 1,
    };

    let pool = init_pool(&config).await.expect("in-memory pool");
    init_schema(&pool).await.expect("schema");
    seed_products(&pool).await.expect("seed");
    pool
}
