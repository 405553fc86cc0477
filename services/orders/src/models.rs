//! Product and order models

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Product entity
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub price: f64,
    pub description: Option<String>,
    pub stock: i64,
    pub created_at: NaiveDateTime,
}

/// Order entity
///
/// `user_id` is the authenticated username forwarded by the gateway; it is
/// an opaque string with no foreign key into the other services.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Order {
    pub id: i64,
    pub user_id: String,
    pub total: f64,
    pub status: String,
    pub created_at: NaiveDateTime,
}

/// Line item of an order, joined with the product name for display
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub quantity: i64,
    pub price: f64,
}

/// Order together with its line items
#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// Requested line item for order creation
#[derive(Debug, Clone, Deserialize)]
pub struct NewOrderItem {
    pub product_id: i64,
    pub quantity: i64,
}

/// Order creation payload
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NewOrder {
    pub items: Vec<NewOrderItem>,
}

/// Order status update payload
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateOrder {
    pub status: Option<String>,
}
