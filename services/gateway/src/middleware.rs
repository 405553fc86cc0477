//! Authentication middleware for the gateway
//!
//! Protected routes pass through this guard before their handler runs. The
//! access token is read from the `Authorization: Bearer <token>` header only;
//! on success the authenticated username is attached to the request
//! extensions for the forwarding handlers.

use anyhow::Result;
use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::Deserialize;
use tracing::debug;

use crate::AppState;
use crate::error::GatewayError;

/// Access token claims, as issued by the auth service
#[derive(Debug, Deserialize)]
pub struct Claims {
    /// Username of the authenticated user
    pub sub: String,
    /// Issued at time (epoch seconds)
    pub iat: u64,
    /// Expiration time (epoch seconds)
    pub exp: u64,
}

/// Authenticated identity attached to request extensions
#[derive(Debug, Clone)]
pub struct CurrentUser(pub String);

/// Decode-only verifier for access tokens
///
/// The gateway never issues tokens; it only checks the signature and expiry
/// against the shared secret.
#[derive(Clone)]
pub struct TokenVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    /// Create a verifier from the shared secret
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;

        TokenVerifier {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Create a verifier from the `JWT_SECRET` environment variable
    pub fn from_env() -> Result<Self> {
        let secret = std::env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable not set"))?;
        Ok(Self::new(&secret))
    }

    /// Verify an access token and return its claims
    ///
    /// Returns `None` on any failure (malformed, expired, bad signature).
    pub fn verify(&self, token: &str) -> Option<Claims> {
        match decode::<Claims>(token, &self.decoding_key, &self.validation) {
            Ok(data) => Some(data.claims),
            Err(e) => {
                debug!("Access token rejected: {}", e);
                None
            }
        }
    }
}

/// Extract and validate the bearer token, then attach the identity
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, GatewayError> {
    let auth_header = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .ok_or(GatewayError::MissingToken)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(GatewayError::MissingToken)?;

    let claims = state
        .verifier
        .verify(token)
        .ok_or(GatewayError::InvalidToken)?;

    req.extensions_mut().insert(CurrentUser(claims.sub));

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use serde::Serialize;
    use std::time::{SystemTime, UNIX_EPOCH};

    #[derive(Serialize)]
    struct TestClaims {
        sub: String,
        iat: u64,
        exp: u64,
    }

    fn sign(secret: &str, sub: &str, exp_offset: i64) -> String {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs() as i64;
        let claims = TestClaims {
            sub: sub.to_string(),
            iat: now as u64,
            exp: (now + exp_offset) as u64,
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_valid_token_accepted() {
        let verifier = TokenVerifier::new("gateway-test-secret");
        let token = sign("gateway-test-secret", "alice", 3600);

        let claims = verifier.verify(&token).expect("should verify");
        assert_eq!(claims.sub, "alice");
    }

    #[test]
    fn test_expired_token_rejected() {
        let verifier = TokenVerifier::new("gateway-test-secret");
        let token = sign("gateway-test-secret", "alice", -3600);

        assert!(verifier.verify(&token).is_none());
    }

    #[test]
    fn test_foreign_signature_rejected() {
        let verifier = TokenVerifier::new("gateway-test-secret");
        let token = sign("some-other-secret", "alice", 3600);

        assert!(verifier.verify(&token).is_none());
    }
}
