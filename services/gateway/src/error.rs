//! Custom error types for the gateway

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use common::response;

/// Custom error type for gateway request handling
#[derive(Debug)]
pub enum GatewayError {
    /// No bearer token on a protected route
    MissingToken,
    /// Token present but malformed, expired, or badly signed
    InvalidToken,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            GatewayError::MissingToken => (
                StatusCode::UNAUTHORIZED,
                "MISSING_TOKEN",
                "Token missing. Provide an Authorization: Bearer <token> header.",
            ),
            GatewayError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "INVALID_TOKEN",
                "Token is invalid or expired.",
            ),
        };

        (status, Json(response::failure(code, message))).into_response()
    }
}
