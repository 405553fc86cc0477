//! JWT service for access token issuance and verification
//!
//! Access tokens are stateless HS256 JWTs signed with a secret shared across
//! the services. Validity is solely a function of the signature and the `exp`
//! claim; there is no revocation list for access tokens.

use anyhow::Result;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Shared secret used to sign and verify tokens
    pub secret: String,
    /// Access token expiration time in seconds (default: 1 hour)
    pub access_token_expiry: u64,
}

impl JwtConfig {
    /// Create a new JwtConfig from environment variables
    ///
    /// # Environment Variables
    /// - `JWT_SECRET`: shared signing secret (required)
    /// - `JWT_ACCESS_TOKEN_EXPIRY`: access token expiry in seconds (default: 3600)
    pub fn from_env() -> Result<Self> {
        let secret = std::env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable not set"))?;

        let access_token_expiry = std::env::var("JWT_ACCESS_TOKEN_EXPIRY")
            .unwrap_or_else(|_| "3600".to_string())
            .parse()
            .unwrap_or(3600);

        Ok(JwtConfig {
            secret,
            access_token_expiry,
        })
    }
}

/// Access token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Username of the authenticated user
    pub sub: String,
    /// Issued at time (epoch seconds)
    pub iat: u64,
    /// Expiration time (epoch seconds)
    pub exp: u64,
}

/// Token service for issuing and verifying access tokens
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_token_expiry: u64,
}

impl TokenService {
    /// Initialize a new token service
    pub fn new(config: &JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;

        TokenService {
            encoding_key,
            decoding_key,
            validation,
            access_token_expiry: config.access_token_expiry,
        }
    }

    /// Issue a signed access token for a user
    pub fn issue_access_token(&self, username: &str) -> Result<String> {
        let now = current_epoch()?;

        let claims = Claims {
            sub: username.to_string(),
            iat: now,
            exp: now + self.access_token_expiry,
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;
        Ok(token)
    }

    /// Verify an access token and return its claims
    ///
    /// Returns `None` on any failure (malformed, expired, bad signature);
    /// callers cannot distinguish the reasons through this call.
    pub fn verify_access_token(&self, token: &str) -> Option<Claims> {
        match decode::<Claims>(token, &self.decoding_key, &self.validation) {
            Ok(data) => Some(data.claims),
            Err(e) => {
                debug!("Access token rejected: {}", e);
                None
            }
        }
    }

    /// Get the access token expiry time in seconds
    pub fn access_token_expiry(&self) -> u64 {
        self.access_token_expiry
    }
}

/// Current time as epoch seconds
pub fn current_epoch() -> Result<u64> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| anyhow::anyhow!("Failed to get current time: {}", e))?
        .as_secs();
    Ok(now)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_service() -> TokenService {
        TokenService::new(&JwtConfig {
            secret: "unit-test-secret".to_string(),
            access_token_expiry: 3600,
        })
    }

    #[test]
    fn test_issue_and_verify_round_trip() {
        let service = test_service();
        let token = service.issue_access_token("alice").unwrap();

        let claims = service.verify_access_token(&token).expect("token should verify");
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.exp, claims.iat + 3600);
    }

    #[test]
    fn test_expired_token_fails_verification() {
        let service = test_service();
        let now = current_epoch().unwrap();

        // Sign a token that expired an hour ago; the signature is valid but
        // verification must still fail on exp.
        let claims = Claims {
            sub: "alice".to_string(),
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"unit-test-secret"),
        )
        .unwrap();

        assert!(service.verify_access_token(&token).is_none());
    }

    #[test]
    fn test_tampered_token_fails_verification() {
        let service = test_service();
        let token = service.issue_access_token("alice").unwrap();

        // Swap out the payload segment; the signature no longer matches.
        let mut parts: Vec<&str> = token.split('.').collect();
        let other = service.issue_access_token("mallory").unwrap();
        let other_parts: Vec<&str> = other.split('.').collect();
        parts[1] = other_parts[1];
        let forged = parts.join(".");

        assert!(service.verify_access_token(&forged).is_none());
    }

    #[test]
    fn test_wrong_secret_fails_verification() {
        let service = test_service();
        let other = TokenService::new(&JwtConfig {
            secret: "another-secret".to_string(),
            access_token_expiry: 3600,
        });

        let token = other.issue_access_token("alice").unwrap();
        assert!(service.verify_access_token(&token).is_none());
    }

    #[test]
    fn test_malformed_token_fails_verification() {
        let service = test_service();
        assert!(service.verify_access_token("not-a-jwt").is_none());
    }
}
