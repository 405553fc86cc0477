//! Orders service routes
//!
//! Product endpoints are public; order endpoints require the `X-User-Id`
//! identity header injected by the gateway.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::json;
use tracing::error;

use common::response;

use crate::AppState;
use crate::models::{NewOrder, UpdateOrder};
use crate::repository::CreateOrderError;

/// Create the router for the orders service
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/products", get(list_products))
        .route("/products/:id", get(get_product))
        .route("/orders", get(list_orders).post(create_order))
        .route("/orders/:id", get(get_order).put(update_order))
        .with_state(state)
}

/// Read the authenticated username from the identity header
fn current_user(headers: &HeaderMap) -> Option<String> {
    headers
        .get("X-User-Id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": "orders-service"
    }))
}

/// List the product catalog
pub async fn list_products(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, OrderError> {
    let products = state.orders.list_products().await.map_err(|e| {
        error!("Failed to list products: {}", e);
        OrderError::Internal
    })?;

    Ok(Json(response::success_with_count(&products)))
}

/// Get a product by id
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, OrderError> {
    let product = state
        .orders
        .find_product(id)
        .await
        .map_err(|e| {
            error!("Failed to get product: {}", e);
            OrderError::Internal
        })?
        .ok_or(OrderError::ProductNotFound(id))?;

    Ok(Json(response::success(product)))
}

/// List all orders of the calling user
pub async fn list_orders(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, OrderError> {
    let user_id = current_user(&headers).ok_or(OrderError::MissingUser)?;

    let orders = state.orders.orders_by_user(&user_id).await.map_err(|e| {
        error!("Failed to list orders: {}", e);
        OrderError::Internal
    })?;

    Ok(Json(response::success_with_count(&orders)))
}

/// Get an order of the calling user, with its line items
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, OrderError> {
    let user_id = current_user(&headers).ok_or(OrderError::MissingUser)?;

    let detail = state
        .orders
        .find_order(id, &user_id)
        .await
        .map_err(|e| {
            error!("Failed to get order: {}", e);
            OrderError::Internal
        })?
        .ok_or(OrderError::OrderNotFound(id))?;

    Ok(Json(response::success(detail)))
}

/// Create a new order for the calling user
///
/// A missing or malformed body is treated like an empty one so the
/// error envelope stays uniform.
pub async fn create_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Option<Json<NewOrder>>,
) -> Result<impl IntoResponse, OrderError> {
    let user_id = current_user(&headers).ok_or(OrderError::MissingUser)?;
    let payload = payload.map(|Json(p)| p).unwrap_or_default();

    if payload.items.is_empty() {
        return Err(OrderError::MissingItems);
    }

    let order_id = state
        .orders
        .create_order(&user_id, &payload.items)
        .await
        .map_err(|e| match e {
            CreateOrderError::Database(e) => {
                error!("Failed to create order: {}", e);
                OrderError::Internal
            }
            e => OrderError::CreationFailed(e.to_string()),
        })?;

    let detail = state
        .orders
        .find_order(order_id, &user_id)
        .await
        .map_err(|e| {
            error!("Failed to reload order: {}", e);
            OrderError::Internal
        })?
        .ok_or(OrderError::OrderNotFound(order_id))?;

    Ok((
        StatusCode::CREATED,
        Json(response::success_with_message(
            detail,
            "Order created successfully.",
        )),
    ))
}

/// Update the status of an order of the calling user
pub async fn update_order(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    payload: Option<Json<UpdateOrder>>,
) -> Result<impl IntoResponse, OrderError> {
    let user_id = current_user(&headers).ok_or(OrderError::MissingUser)?;

    let payload = payload.map(|Json(p)| p).unwrap_or_default();
    let Some(status) = payload.status else {
        return Err(OrderError::MissingStatus);
    };

    let updated = state
        .orders
        .update_status(id, &user_id, &status)
        .await
        .map_err(|e| {
            error!("Failed to update order: {}", e);
            OrderError::Internal
        })?;

    if !updated {
        return Err(OrderError::OrderNotFound(id));
    }

    let detail = state
        .orders
        .find_order(id, &user_id)
        .await
        .map_err(|e| {
            error!("Failed to reload order: {}", e);
            OrderError::Internal
        })?
        .ok_or(OrderError::OrderNotFound(id))?;

    Ok(Json(response::success_with_message(
        detail,
        "Order updated successfully.",
    )))
}

/// Custom error type for orders service endpoints
#[derive(Debug)]
pub enum OrderError {
    MissingUser,
    MissingItems,
    MissingStatus,
    ProductNotFound(i64),
    OrderNotFound(i64),
    CreationFailed(String),
    Internal,
}

impl IntoResponse for OrderError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            OrderError::MissingUser => (
                StatusCode::UNAUTHORIZED,
                "MISSING_USER",
                "User identity not provided.".to_string(),
            ),
            OrderError::MissingItems => (
                StatusCode::BAD_REQUEST,
                "MISSING_ITEMS",
                "The items list is required.".to_string(),
            ),
            OrderError::MissingStatus => (
                StatusCode::BAD_REQUEST,
                "MISSING_STATUS",
                "The status field is required.".to_string(),
            ),
            OrderError::ProductNotFound(id) => (
                StatusCode::NOT_FOUND,
                "PRODUCT_NOT_FOUND",
                format!("Product with id {} not found.", id),
            ),
            OrderError::OrderNotFound(id) => (
                StatusCode::NOT_FOUND,
                "ORDER_NOT_FOUND",
                format!("Order with id {} not found.", id),
            ),
            OrderError::CreationFailed(msg) => {
                (StatusCode::BAD_REQUEST, "ORDER_CREATION_FAILED", msg)
            }
            OrderError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "Internal server error.".to_string(),
            ),
        };

        (status, Json(response::failure(code, &message))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database;
    use crate::models::NewOrderItem;
    use crate::repository::OrderRepository;
    use serde_json::Value;

    async fn test_state() -> AppState {
        let pool = database::test_pool().await;
        AppState {
            db_pool: pool.clone(),
            orders: OrderRepository::new(pool),
        }
    }

    fn alice_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("X-User-Id", "alice".parse().unwrap());
        headers
    }

    async fn body_of(resp: Response) -> Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_orders_require_identity_header() {
        let state = test_state().await;

        let err = list_orders(State(state), HeaderMap::new())
            .await
            .err()
            .expect("should fail");
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_of(resp).await["error"]["code"], "MISSING_USER");
    }

    #[tokio::test]
    async fn test_create_order_requires_items() {
        let state = test_state().await;

        let err = create_order(State(state), alice_headers(), Some(Json(NewOrder::default())))
            .await
            .err()
            .expect("should fail");
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_of(resp).await["error"]["code"], "MISSING_ITEMS");
    }

    #[tokio::test]
    async fn test_create_order_without_body_returns_envelope() {
        let state = test_state().await;

        // No JSON body at all behaves like an empty one.
        let err = create_order(State(state), alice_headers(), None)
            .await
            .err()
            .expect("should fail");
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = body_of(resp).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "MISSING_ITEMS");
    }

    #[tokio::test]
    async fn test_create_and_fetch_order() {
        let state = test_state().await;

        let payload = NewOrder {
            items: vec![NewOrderItem {
                product_id: 1,
                quantity: 1,
            }],
        };
        let resp = create_order(State(state.clone()), alice_headers(), Some(Json(payload)))
            .await
            .unwrap()
            .into_response();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body = body_of(resp).await;
        let order_id = body["data"]["id"].as_i64().unwrap();
        assert_eq!(body["data"]["items"][0]["quantity"], 1);

        let resp = list_orders(State(state), alice_headers())
            .await
            .unwrap()
            .into_response();
        let body = body_of(resp).await;
        assert_eq!(body["count"], 1);
        assert_eq!(body["data"][0]["id"], order_id);
    }

    #[tokio::test]
    async fn test_unknown_product_is_404() {
        let state = test_state().await;

        let err = get_product(State(state), Path(9999)).await.err().unwrap();
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_of(resp).await["error"]["code"], "PRODUCT_NOT_FOUND");
    }
}
