//! Refresh token model

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Refresh token entity as stored in the `refresh_tokens` table
///
/// The token value itself is an opaque random string; validity is a function
/// of the `revoked` flag and a strict epoch-seconds comparison against
/// `expires_at`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RefreshToken {
    pub id: i64,
    pub token: String,
    pub username: String,
    pub expires_at: i64,
    pub created_at: i64,
    pub revoked: bool,
}
