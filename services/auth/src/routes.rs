//! Authentication service routes

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use common::response;

use crate::AppState;
use crate::models::NewUser;
use crate::tokens::{REFRESH_TOKEN_TTL_DAYS, issue_token_pair};
use crate::validation;

/// Request for user login
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Request carrying a refresh token
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RefreshTokenRequest {
    pub refresh_token: Option<String>,
}

/// Request for access token verification
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct VerifyRequest {
    pub token: Option<String>,
}

/// Request for user registration
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    pub email: Option<String>,
}

/// Create the router for the authentication service
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/auth/health", get(health_check))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/verify", post(verify))
        .route("/auth/logout", post(logout))
        .route("/auth/register", post(register))
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": "auth-service"
    }))
}

/// Authenticate a user and return an access + refresh token pair
///
/// A missing or malformed body is treated like an empty one so the
/// error envelope stays uniform.
pub async fn login(
    State(state): State<AppState>,
    payload: Option<Json<LoginRequest>>,
) -> Result<impl IntoResponse, AuthError> {
    let payload = payload.map(|Json(p)| p).unwrap_or_default();
    let (Some(username), Some(password)) = (payload.username, payload.password) else {
        return Err(AuthError::MissingCredentials);
    };

    info!("Login attempt for user: {}", username);

    let valid = state
        .user_repository
        .verify_credentials(&username, &password)
        .await
        .map_err(|e| {
            error!("Failed to verify credentials: {}", e);
            AuthError::Internal
        })?;

    if !valid {
        return Err(AuthError::InvalidCredentials);
    }

    let pair = issue_token_pair(&state.jwt_service, &state.token_repository, &username)
        .await
        .map_err(|e| {
            error!("Failed to issue token pair: {}", e);
            AuthError::Internal
        })?;

    let ttl = (REFRESH_TOKEN_TTL_DAYS * 24 * 3600) as u64;
    state
        .sessions
        .store(&username, &pair.refresh_token, ttl)
        .await
        .ok();

    Ok((
        StatusCode::OK,
        Json(response::success(json!({
            "access_token": pair.access_token,
            "refresh_token": pair.refresh_token,
            "token_type": "Bearer",
            "expires_in": state.jwt_service.access_token_expiry(),
            "refresh_expires_at": pair.refresh_expires_at,
        }))),
    ))
}

/// Rotate a refresh token and return a new token pair
///
/// The presented token is consumed (verified and revoked in one statement)
/// before the new pair is issued, so it cannot be replayed.
pub async fn refresh(
    State(state): State<AppState>,
    payload: Option<Json<RefreshTokenRequest>>,
) -> Result<impl IntoResponse, AuthError> {
    let payload = payload.map(|Json(p)| p).unwrap_or_default();
    let Some(refresh_token) = payload.refresh_token else {
        return Err(AuthError::MissingToken);
    };

    let username = state
        .token_repository
        .consume(&refresh_token)
        .await
        .map_err(|e| {
            error!("Failed to consume refresh token: {}", e);
            AuthError::Internal
        })?
        .ok_or(AuthError::InvalidToken)?;

    let pair = issue_token_pair(&state.jwt_service, &state.token_repository, &username)
        .await
        .map_err(|e| {
            error!("Failed to issue token pair: {}", e);
            AuthError::Internal
        })?;

    let ttl = (REFRESH_TOKEN_TTL_DAYS * 24 * 3600) as u64;
    state
        .sessions
        .store(&username, &pair.refresh_token, ttl)
        .await
        .ok();

    Ok((
        StatusCode::OK,
        Json(response::success(json!({
            "access_token": pair.access_token,
            "refresh_token": pair.refresh_token,
            "token_type": "Bearer",
            "expires_in": state.jwt_service.access_token_expiry(),
            "refresh_expires_at": pair.refresh_expires_at,
        }))),
    ))
}

/// Check the validity of an access token
pub async fn verify(
    State(state): State<AppState>,
    payload: Option<Json<VerifyRequest>>,
) -> Result<impl IntoResponse, AuthError> {
    let payload = payload.map(|Json(p)| p).unwrap_or_default();
    let Some(token) = payload.token else {
        return Err(AuthError::MissingToken);
    };

    let claims = state
        .jwt_service
        .verify_access_token(&token)
        .ok_or(AuthError::InvalidToken)?;

    Ok((
        StatusCode::OK,
        Json(response::success(json!({
            "username": claims.sub,
            "expires_at": claims.exp,
        }))),
    ))
}

/// Revoke a refresh token
///
/// Idempotent: succeeds even when the token is unknown or already revoked.
pub async fn logout(
    State(state): State<AppState>,
    payload: Option<Json<RefreshTokenRequest>>,
) -> Result<impl IntoResponse, AuthError> {
    let payload = payload.map(|Json(p)| p).unwrap_or_default();
    if let Some(refresh_token) = payload.refresh_token {
        if let Ok(Some(username)) = state.token_repository.verify(&refresh_token).await {
            state.sessions.clear(&username).await.ok();
        }
        state
            .token_repository
            .revoke(&refresh_token)
            .await
            .map_err(|e| {
                error!("Failed to revoke refresh token: {}", e);
                AuthError::Internal
            })?;
    }

    Ok((
        StatusCode::OK,
        Json(json!({
            "success": true,
            "message": "Logged out successfully.",
        })),
    ))
}

/// Register a new user
pub async fn register(
    State(state): State<AppState>,
    payload: Option<Json<RegisterRequest>>,
) -> Result<impl IntoResponse, AuthError> {
    let payload = payload.map(|Json(p)| p).unwrap_or_default();
    let (Some(username), Some(password)) = (payload.username, payload.password) else {
        return Err(AuthError::MissingCredentials);
    };

    validation::validate_username(&username).map_err(AuthError::CreationFailed)?;
    validation::validate_password(&password).map_err(AuthError::CreationFailed)?;
    if let Some(email) = &payload.email {
        validation::validate_email(email).map_err(AuthError::CreationFailed)?;
    }

    let new_user = NewUser {
        username,
        password,
        email: payload.email,
    };

    let user = state
        .user_repository
        .create(&new_user)
        .await
        .map_err(|e| {
            error!("Failed to create user: {}", e);
            AuthError::Internal
        })?
        .ok_or_else(|| AuthError::CreationFailed("Username is already taken".to_string()))?;

    Ok((
        StatusCode::CREATED,
        Json(response::success_with_message(
            json!({
                "user_id": user.id,
                "username": user.username,
            }),
            "User created successfully.",
        )),
    ))
}

/// Custom error type for authentication endpoints
#[derive(Debug)]
pub enum AuthError {
    MissingCredentials,
    InvalidCredentials,
    MissingToken,
    InvalidToken,
    CreationFailed(String),
    Internal,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AuthError::MissingCredentials => (
                StatusCode::BAD_REQUEST,
                "MISSING_CREDENTIALS",
                "The username and password fields are required.".to_string(),
            ),
            AuthError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "INVALID_CREDENTIALS",
                "Invalid username or password.".to_string(),
            ),
            AuthError::MissingToken => (
                StatusCode::BAD_REQUEST,
                "MISSING_TOKEN",
                "A token is required.".to_string(),
            ),
            AuthError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "INVALID_TOKEN",
                "Token is invalid or expired.".to_string(),
            ),
            AuthError::CreationFailed(msg) => (StatusCode::BAD_REQUEST, "CREATION_FAILED", msg),
            AuthError::Internal => (
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
    use crate::jwt::{JwtConfig, TokenService};
    use crate::repositories::UserRepository;
    use crate::session::SessionManager;
    use crate::tokens::RefreshTokenRepository;
    use crate::database;
    use serde_json::Value;

    async fn test_state() -> AppState {
        let pool = database::test_pool().await;
        let jwt_service = TokenService::new(&JwtConfig {
            secret: "route-test-secret".to_string(),
            access_token_expiry: 3600,
        });

        AppState {
            db_pool: pool.clone(),
            user_repository: UserRepository::new(pool.clone()),
            token_repository: RefreshTokenRepository::new(pool),
            jwt_service,
            sessions: SessionManager::new(None),
        }
    }

    async fn body_of(resp: Response) -> Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn register_alice(state: &AppState) {
        let resp = register(
            State(state.clone()),
            Some(Json(RegisterRequest {
                username: Some("alice".to_string()),
                password: Some("pw123".to_string()),
                email: None,
            })),
        )
        .await
        .unwrap()
        .into_response();
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    async fn login_alice(state: &AppState) -> Value {
        let resp = login(
            State(state.clone()),
            Some(Json(LoginRequest {
                username: Some("alice".to_string()),
                password: Some("pw123".to_string()),
            })),
        )
        .await
        .unwrap()
        .into_response();
        assert_eq!(resp.status(), StatusCode::OK);
        body_of(resp).await
    }

    #[tokio::test]
    async fn test_login_missing_fields() {
        let state = test_state().await;

        let err = login(State(state), Some(Json(LoginRequest::default())))
            .await
            .err()
            .expect("should fail");
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_of(resp).await["error"]["code"], "MISSING_CREDENTIALS");
    }

    #[tokio::test]
    async fn test_login_without_body_returns_envelope() {
        let state = test_state().await;

        // No JSON body at all behaves like an empty one.
        let err = login(State(state), None).await.err().expect("should fail");
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = body_of(resp).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "MISSING_CREDENTIALS");
    }

    #[tokio::test]
    async fn test_refresh_without_body_returns_envelope() {
        let state = test_state().await;

        let err = refresh(State(state), None)
            .await
            .err()
            .expect("should fail");
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_of(resp).await["error"]["code"], "MISSING_TOKEN");
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let state = test_state().await;
        register_alice(&state).await;

        let err = login(
            State(state),
            Some(Json(LoginRequest {
                username: Some("alice".to_string()),
                password: Some("wrong".to_string()),
            })),
        )
        .await
        .err()
        .expect("should fail");
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_of(resp).await["error"]["code"], "INVALID_CREDENTIALS");
    }

    #[tokio::test]
    async fn test_login_then_verify_returns_username() {
        let state = test_state().await;
        register_alice(&state).await;

        let body = login_alice(&state).await;
        let access = body["data"]["access_token"].as_str().unwrap().to_string();
        assert!(!access.is_empty());
        assert!(!body["data"]["refresh_token"].as_str().unwrap().is_empty());
        assert_eq!(body["data"]["token_type"], "Bearer");
        assert_eq!(body["data"]["expires_in"], 3600);

        let resp = verify(
            State(state),
            Some(Json(VerifyRequest {
                token: Some(access),
            })),
        )
        .await
        .unwrap()
        .into_response();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_of(resp).await["data"]["username"], "alice");
    }

    #[tokio::test]
    async fn test_refresh_rotates_and_rejects_reuse() {
        let state = test_state().await;
        register_alice(&state).await;

        let body = login_alice(&state).await;
        let old_refresh = body["data"]["refresh_token"].as_str().unwrap().to_string();

        let resp = refresh(
            State(state.clone()),
            Some(Json(RefreshTokenRequest {
                refresh_token: Some(old_refresh.clone()),
            })),
        )
        .await
        .unwrap()
        .into_response();
        assert_eq!(resp.status(), StatusCode::OK);
        let new_body = body_of(resp).await;
        assert_ne!(new_body["data"]["refresh_token"], old_refresh.as_str());

        // The first refresh consumed the old token.
        let err = refresh(
            State(state),
            Some(Json(RefreshTokenRequest {
                refresh_token: Some(old_refresh),
            })),
        )
        .await
        .err()
        .expect("reuse should fail");
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_of(resp).await["error"]["code"], "INVALID_TOKEN");
    }

    #[tokio::test]
    async fn test_logout_is_idempotent() {
        let state = test_state().await;
        register_alice(&state).await;

        let body = login_alice(&state).await;
        let token = body["data"]["refresh_token"].as_str().unwrap().to_string();

        for _ in 0..2 {
            let resp = logout(
                State(state.clone()),
                Some(Json(RefreshTokenRequest {
                    refresh_token: Some(token.clone()),
                })),
            )
            .await
            .unwrap()
            .into_response();
            assert_eq!(resp.status(), StatusCode::OK);
        }

        assert_eq!(state.token_repository.verify(&token).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_register_duplicate_fails() {
        let state = test_state().await;
        register_alice(&state).await;

        let err = register(
            State(state),
            Some(Json(RegisterRequest {
                username: Some("alice".to_string()),
                password: Some("pw123".to_string()),
                email: None,
            })),
        )
        .await
        .err()
        .expect("duplicate should fail");
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_of(resp).await["error"]["code"], "CREATION_FAILED");
    }
}
