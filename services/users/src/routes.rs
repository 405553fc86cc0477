//! User service routes
//!
//! The gateway injects the authenticated username as the `X-User-Id` header;
//! this service trusts it as an opaque identity string.

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
use crate::models::{NewProfile, UpdateProfile};

/// Create the router for the user service
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/users", get(list_users).post(create_user))
        .route("/users/profile", get(get_profile))
        .route(
            "/users/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
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
        "service": "user-service"
    }))
}

/// List all user profiles
pub async fn list_users(State(state): State<AppState>) -> Result<impl IntoResponse, UserError> {
    let profiles = state.profiles.list().await.map_err(|e| {
        error!("Failed to list profiles: {}", e);
        UserError::Internal
    })?;

    Ok(Json(response::success_with_count(&profiles)))
}

/// Get a user profile by id
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, UserError> {
    let profile = state
        .profiles
        .find_by_id(id)
        .await
        .map_err(|e| {
            error!("Failed to get profile: {}", e);
            UserError::Internal
        })?
        .ok_or(UserError::NotFound(id))?;

    Ok(Json(response::success(profile)))
}

/// Create a new user profile
///
/// A missing or malformed body is treated like an empty one so the
/// error envelope stays uniform.
pub async fn create_user(
    State(state): State<AppState>,
    payload: Option<Json<NewProfile>>,
) -> Result<impl IntoResponse, UserError> {
    let payload = payload.map(|Json(p)| p).unwrap_or_default();
    let Some(username) = payload.username.clone() else {
        return Err(UserError::MissingUsername);
    };

    let profile = state
        .profiles
        .create(&username, &payload)
        .await
        .map_err(|e| {
            error!("Failed to create profile: {}", e);
            UserError::Internal
        })?
        .ok_or_else(|| UserError::CreationFailed("This user already exists".to_string()))?;

    Ok((
        StatusCode::CREATED,
        Json(response::success_with_message(
            profile,
            "User created successfully.",
        )),
    ))
}

/// Apply a partial update to a user profile
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Option<Json<UpdateProfile>>,
) -> Result<impl IntoResponse, UserError> {
    let payload = payload.map(|Json(p)| p).unwrap_or_default();
    if payload.is_empty() {
        return Err(UserError::UpdateFailed("No fields to update".to_string()));
    }

    let updated = state.profiles.update(id, &payload).await.map_err(|e| {
        error!("Failed to update profile: {}", e);
        UserError::Internal
    })?;

    if !updated {
        return Err(UserError::NotFound(id));
    }

    let profile = state
        .profiles
        .find_by_id(id)
        .await
        .map_err(|e| {
            error!("Failed to reload profile: {}", e);
            UserError::Internal
        })?
        .ok_or(UserError::NotFound(id))?;

    Ok(Json(response::success_with_message(
        profile,
        "User updated successfully.",
    )))
}

/// Delete a user profile
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, UserError> {
    let deleted = state.profiles.delete(id).await.map_err(|e| {
        error!("Failed to delete profile: {}", e);
        UserError::Internal
    })?;

    if !deleted {
        return Err(UserError::NotFound(id));
    }

    Ok(Json(json!({
        "success": true,
        "message": "User deleted successfully.",
    })))
}

/// Get the profile of the calling user
pub async fn get_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, UserError> {
    let username = current_user(&headers).ok_or(UserError::MissingUser)?;

    let profile = state
        .profiles
        .find_by_username(&username)
        .await
        .map_err(|e| {
            error!("Failed to get profile: {}", e);
            UserError::Internal
        })?
        .ok_or(UserError::ProfileNotFound(username))?;

    Ok(Json(response::success(profile)))
}

/// Custom error type for user service endpoints
#[derive(Debug)]
pub enum UserError {
    MissingUsername,
    MissingUser,
    NotFound(i64),
    ProfileNotFound(String),
    CreationFailed(String),
    UpdateFailed(String),
    Internal,
}

impl IntoResponse for UserError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            UserError::MissingUsername => (
                StatusCode::BAD_REQUEST,
                "MISSING_USERNAME",
                "The username field is required.".to_string(),
            ),
            UserError::MissingUser => (
                StatusCode::UNAUTHORIZED,
                "MISSING_USER",
                "User identity not provided.".to_string(),
            ),
            UserError::NotFound(id) => (
                StatusCode::NOT_FOUND,
                "USER_NOT_FOUND",
                format!("User with id {} not found.", id),
            ),
            UserError::ProfileNotFound(username) => (
                StatusCode::NOT_FOUND,
                "USER_NOT_FOUND",
                format!("No profile found for {}.", username),
            ),
            UserError::CreationFailed(msg) => (StatusCode::BAD_REQUEST, "CREATION_FAILED", msg),
            UserError::UpdateFailed(msg) => (StatusCode::BAD_REQUEST, "UPDATE_FAILED", msg),
            UserError::Internal => (
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
    use crate::repository::ProfileRepository;
    use serde_json::Value;

    async fn test_state() -> AppState {
        let pool = database::test_pool().await;
        AppState {
            db_pool: pool.clone(),
            profiles: ProfileRepository::new(pool),
        }
    }

    async fn body_of(resp: Response) -> Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_profile_requires_identity_header() {
        let state = test_state().await;

        let err = get_profile(State(state), HeaderMap::new())
            .await
            .err()
            .expect("should fail");
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_of(resp).await["error"]["code"], "MISSING_USER");
    }

    #[tokio::test]
    async fn test_profile_of_calling_user() {
        let state = test_state().await;
        state
            .profiles
            .create("alice", &NewProfile::default())
            .await
            .unwrap();

        let mut headers = HeaderMap::new();
        headers.insert("X-User-Id", "alice".parse().unwrap());

        let resp = get_profile(State(state), headers)
            .await
            .unwrap()
            .into_response();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_of(resp).await["data"]["username"], "alice");
    }

    #[tokio::test]
    async fn test_get_unknown_user_is_404() {
        let state = test_state().await;

        let err = get_user(State(state), Path(42)).await.err().unwrap();
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_of(resp).await["error"]["code"], "USER_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_update_with_no_fields_fails() {
        let state = test_state().await;
        let profile = state
            .profiles
            .create("alice", &NewProfile::default())
            .await
            .unwrap()
            .unwrap();

        let err = update_user(
            State(state),
            Path(profile.id),
            Some(Json(UpdateProfile::default())),
        )
        .await
        .err()
        .unwrap();
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_of(resp).await["error"]["code"], "UPDATE_FAILED");
    }

    #[tokio::test]
    async fn test_create_user_without_body_returns_envelope() {
        let state = test_state().await;

        // No JSON body at all behaves like an empty one.
        let err = create_user(State(state), None).await.err().unwrap();
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = body_of(resp).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "MISSING_USERNAME");
    }
}
