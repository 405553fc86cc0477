//! Product and order repository

use sqlx::{Sqlite, SqlitePool, Transaction};
use thiserror::Error;
use tracing::info;

use crate::models::{NewOrderItem, Order, OrderDetail, OrderItem, Product};

/// Errors raised while creating an order
#[derive(Debug, Error)]
pub enum CreateOrderError {
    #[error("Product {0} not found")]
    UnknownProduct(i64),

    #[error("Insufficient stock for {0}")]
    InsufficientStock(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Repository for products and orders
#[derive(Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Create a new order repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// List all products ordered by id
    pub async fn list_products(&self) -> Result<Vec<Product>, sqlx::Error> {
        sqlx::query_as::<_, Product>("SELECT * FROM products ORDER BY id")
            .fetch_all(&self.pool)
            .await
    }

    /// Find a product by id
    pub async fn find_product(&self, id: i64) -> Result<Option<Product>, sqlx::Error> {
        sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// List all orders of a user, newest first
    pub async fn orders_by_user(&self, user_id: &str) -> Result<Vec<Order>, sqlx::Error> {
        sqlx::query_as::<_, Order>(
            "SELECT * FROM orders WHERE user_id = ? ORDER BY created_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    /// Find an order of a user, including its line items
    pub async fn find_order(
        &self,
        order_id: i64,
        user_id: &str,
    ) -> Result<Option<OrderDetail>, sqlx::Error> {
        let order = sqlx::query_as::<_, Order>(
            "SELECT * FROM orders WHERE id = ? AND user_id = ?",
        )
        .bind(order_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(order) = order else {
            return Ok(None);
        };

        let items = sqlx::query_as::<_, OrderItem>(
            r#"
            SELECT oi.id, oi.order_id, oi.product_id, p.name AS product_name,
                   oi.quantity, oi.price
            FROM order_items oi
            JOIN products p ON oi.product_id = p.id
            WHERE oi.order_id = ?
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(OrderDetail { order, items }))
    }

    /// Create an order with its line items and decrement product stock
    ///
    /// The whole sequence runs inside one transaction: if any product is
    /// unknown or under-stocked, or any statement fails, the transaction is
    /// rolled back and nothing is written.
    pub async fn create_order(
        &self,
        user_id: &str,
        items: &[NewOrderItem],
    ) -> Result<i64, CreateOrderError> {
        let mut tx: Transaction<'_, Sqlite> = self.pool.begin().await?;

        // Validate items and compute the total up front.
        let mut total = 0.0;
        let mut priced_items = Vec::with_capacity(items.len());
        for item in items {
            let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ?")
                .bind(item.product_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(CreateOrderError::UnknownProduct(item.product_id))?;

            if product.stock < item.quantity {
                return Err(CreateOrderError::InsufficientStock(product.name));
            }

            total += product.price * item.quantity as f64;
            priced_items.push((item.product_id, item.quantity, product.price));
        }

        let order_id: i64 = sqlx::query_scalar(
            "INSERT INTO orders (user_id, total, status) VALUES (?, ?, 'pending') RETURNING id",
        )
        .bind(user_id)
        .bind(total)
        .fetch_one(&mut *tx)
        .await?;

        for (product_id, quantity, price) in priced_items {
            sqlx::query(
                "INSERT INTO order_items (order_id, product_id, quantity, price) VALUES (?, ?, ?, ?)",
            )
            .bind(order_id)
            .bind(product_id)
            .bind(quantity)
            .bind(price)
            .execute(&mut *tx)
            .await?;

            sqlx::query("UPDATE products SET stock = stock - ? WHERE id = ?")
                .bind(quantity)
                .bind(product_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        info!("Order {} created for user {}", order_id, user_id);
        Ok(order_id)
    }

    /// Update the status of a user's order; `false` when no row matched
    pub async fn update_status(
        &self,
        order_id: i64,
        user_id: &str,
        status: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE orders SET status = ? WHERE id = ? AND user_id = ?")
            .bind(status)
            .bind(order_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
