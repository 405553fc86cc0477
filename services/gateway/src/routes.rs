//! Gateway routes
//!
//! The gateway mirrors the backend endpoints: auth routes are public (except
//! logout), user and order routes sit behind the bearer-token guard, which
//! injects the authenticated username downstream as `X-User-Id`.

use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    http::Method,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::{Value, json};

use crate::AppState;
use crate::forward::Forwarded;
use crate::middleware::{CurrentUser, auth_middleware};

/// Create the router for the gateway
pub fn create_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/auth/logout", post(auth_logout))
        .route("/users", get(users_list).post(users_create))
        .route("/users/profile", get(user_profile))
        .route(
            "/users/:id",
            get(user_detail).put(user_update).delete(user_delete),
        )
        .route("/orders", get(orders_list).post(orders_create))
        .route("/orders/:id", get(order_detail).put(order_update))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/auth/login", post(auth_login))
        .route("/auth/refresh", post(auth_refresh))
        .route("/auth/verify", post(auth_verify))
        .route("/auth/register", post(auth_register))
        .route("/products", get(products_list))
        .route("/products/:id", get(product_detail))
        .merge(protected_routes)
        .with_state(state)
}

fn json_body(body: Option<Json<Value>>) -> Value {
    body.map(|Json(v)| v).unwrap_or_else(|| json!({}))
}

/// Health check endpoint, reporting the configured backends
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": "api-gateway",
        "services": {
            "auth": state.services.auth,
            "users": state.services.users,
            "orders": state.services.orders,
        }
    }))
}

// ========== Auth service routes (public, except logout) ==========

pub async fn auth_login(State(state): State<AppState>, body: Option<Json<Value>>) -> Forwarded {
    state
        .client
        .forward(
            &state.services.auth,
            "/auth/login",
            Method::POST,
            Some(json_body(body)),
            &[],
        )
        .await
}

pub async fn auth_refresh(State(state): State<AppState>, body: Option<Json<Value>>) -> Forwarded {
    state
        .client
        .forward(
            &state.services.auth,
            "/auth/refresh",
            Method::POST,
            Some(json_body(body)),
            &[],
        )
        .await
}

pub async fn auth_verify(State(state): State<AppState>, body: Option<Json<Value>>) -> Forwarded {
    state
        .client
        .forward(
            &state.services.auth,
            "/auth/verify",
            Method::POST,
            Some(json_body(body)),
            &[],
        )
        .await
}

pub async fn auth_register(State(state): State<AppState>, body: Option<Json<Value>>) -> Forwarded {
    state
        .client
        .forward(
            &state.services.auth,
            "/auth/register",
            Method::POST,
            Some(json_body(body)),
            &[],
        )
        .await
}

pub async fn auth_logout(State(state): State<AppState>, body: Option<Json<Value>>) -> Forwarded {
    state
        .client
        .forward(
            &state.services.auth,
            "/auth/logout",
            Method::POST,
            Some(json_body(body)),
            &[],
        )
        .await
}

// ========== User service routes (protected) ==========

pub async fn users_list(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Forwarded {
    state
        .client
        .forward(
            &state.services.users,
            "/users",
            Method::GET,
            None,
            &[("X-User-Id", &user.0)],
        )
        .await
}

pub async fn users_create(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    body: Option<Json<Value>>,
) -> Forwarded {
    state
        .client
        .forward(
            &state.services.users,
            "/users",
            Method::POST,
            Some(json_body(body)),
            &[("X-User-Id", &user.0)],
        )
        .await
}

pub async fn user_profile(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Forwarded {
    state
        .client
        .forward(
            &state.services.users,
            "/users/profile",
            Method::GET,
            None,
            &[("X-User-Id", &user.0)],
        )
        .await
}

pub async fn user_detail(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(user): Extension<CurrentUser>,
) -> Forwarded {
    state
        .client
        .forward(
            &state.services.users,
            &format!("/users/{}", id),
            Method::GET,
            None,
            &[("X-User-Id", &user.0)],
        )
        .await
}

pub async fn user_update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(user): Extension<CurrentUser>,
    body: Option<Json<Value>>,
) -> Forwarded {
    state
        .client
        .forward(
            &state.services.users,
            &format!("/users/{}", id),
            Method::PUT,
            Some(json_body(body)),
            &[("X-User-Id", &user.0)],
        )
        .await
}

pub async fn user_delete(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(user): Extension<CurrentUser>,
) -> Forwarded {
    state
        .client
        .forward(
            &state.services.users,
            &format!("/users/{}", id),
            Method::DELETE,
            None,
            &[("X-User-Id", &user.0)],
        )
        .await
}

// ========== Orders service routes ==========

pub async fn products_list(State(state): State<AppState>) -> Forwarded {
    state
        .client
        .forward(&state.services.orders, "/products", Method::GET, None, &[])
        .await
}

pub async fn product_detail(State(state): State<AppState>, Path(id): Path<i64>) -> Forwarded {
    state
        .client
        .forward(
            &state.services.orders,
            &format!("/products/{}", id),
            Method::GET,
            None,
            &[],
        )
        .await
}

pub async fn orders_list(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Forwarded {
    state
        .client
        .forward(
            &state.services.orders,
            "/orders",
            Method::GET,
            None,
            &[("X-User-Id", &user.0)],
        )
        .await
}

pub async fn orders_create(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    body: Option<Json<Value>>,
) -> Forwarded {
    state
        .client
        .forward(
            &state.services.orders,
            "/orders",
            Method::POST,
            Some(json_body(body)),
            &[("X-User-Id", &user.0)],
        )
        .await
}

pub async fn order_detail(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(user): Extension<CurrentUser>,
) -> Forwarded {
    state
        .client
        .forward(
            &state.services.orders,
            &format!("/orders/{}", id),
            Method::GET,
            None,
            &[("X-User-Id", &user.0)],
        )
        .await
}

pub async fn order_update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(user): Extension<CurrentUser>,
    body: Option<Json<Value>>,
) -> Forwarded {
    state
        .client
        .forward(
            &state.services.orders,
            &format!("/orders/{}", id),
            Method::PUT,
            Some(json_body(body)),
            &[("X-User-Id", &user.0)],
        )
        .await
}
