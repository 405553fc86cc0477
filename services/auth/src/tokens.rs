//! Refresh token store and rotation
//!
//! Refresh tokens are opaque random strings tracked in the `refresh_tokens`
//! table. Rotation invalidates a token the moment a new one is issued from
//! it: `consume` performs the verify-and-revoke as a single conditional
//! UPDATE, so two concurrent uses of the same token cannot both succeed.

use anyhow::Result;
use rand::Rng;
use rand::distributions::Alphanumeric;
use sqlx::SqlitePool;
use tracing::info;

use crate::jwt::{TokenService, current_epoch};
use crate::models::RefreshToken;

/// Default refresh token lifetime in days
pub const REFRESH_TOKEN_TTL_DAYS: i64 = 30;

/// Length of the opaque token string; 48 alphanumeric characters carry
/// just under 6 bits of entropy each, comfortably above 256 bits total.
const TOKEN_LENGTH: usize = 48;

/// Access + refresh token pair returned by login and refresh
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub refresh_expires_at: i64,
}

/// Repository for refresh token persistence
#[derive(Clone)]
pub struct RefreshTokenRepository {
    pool: SqlitePool,
}

impl RefreshTokenRepository {
    /// Create a new refresh token repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new refresh token for a user
    ///
    /// Returns the opaque token value and its absolute expiry (epoch seconds).
    pub async fn create(&self, username: &str, ttl_days: i64) -> Result<(String, i64)> {
        let token = generate_opaque_token();
        let now = current_epoch()? as i64;
        let expires_at = now + ttl_days * 24 * 3600;

        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (token, username, expires_at, created_at, revoked)
            VALUES (?, ?, ?, ?, 0)
            "#,
        )
        .bind(&token)
        .bind(username)
        .bind(expires_at)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok((token, expires_at))
    }

    /// Look up a refresh token record by its opaque value
    pub async fn find(&self, token: &str) -> Result<Option<RefreshToken>> {
        let record = sqlx::query_as::<_, RefreshToken>(
            r#"
            SELECT id, token, username, expires_at, created_at, revoked
            FROM refresh_tokens
            WHERE token = ?
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// Verify a refresh token without revoking it
    ///
    /// Returns the owning username, or `None` if the token is absent,
    /// revoked, or past its expiry. A token is still live at the exact
    /// second of its expiry timestamp.
    pub async fn verify(&self, token: &str) -> Result<Option<String>> {
        let now = current_epoch()? as i64;
        self.verify_at(token, now).await
    }

    async fn verify_at(&self, token: &str, now: i64) -> Result<Option<String>> {
        let username = self
            .find(token)
            .await?
            .filter(|t| !t.revoked && t.expires_at >= now)
            .map(|t| t.username);

        Ok(username)
    }

    /// Atomically verify and revoke a refresh token
    ///
    /// The conditional UPDATE only matches a live token, so a second consume
    /// of the same value (including a concurrent replay) finds nothing.
    pub async fn consume(&self, token: &str) -> Result<Option<String>> {
        let now = current_epoch()? as i64;
        self.consume_at(token, now).await
    }

    async fn consume_at(&self, token: &str, now: i64) -> Result<Option<String>> {
        let username: Option<String> = sqlx::query_scalar(
            r#"
            UPDATE refresh_tokens SET revoked = 1
            WHERE token = ? AND revoked = 0 AND expires_at >= ?
            RETURNING username
            "#,
        )
        .bind(token)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(username)
    }

    /// Revoke a refresh token; idempotent
    pub async fn revoke(&self, token: &str) -> Result<()> {
        sqlx::query("UPDATE refresh_tokens SET revoked = 1 WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Revoke every refresh token belonging to a user
    ///
    /// Used on credential change and logout-everywhere.
    pub async fn revoke_all(&self, username: &str) -> Result<u64> {
        let result = sqlx::query("UPDATE refresh_tokens SET revoked = 1 WHERE username = ?")
            .bind(username)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Delete expired tokens; invoked on demand, not scheduled
    pub async fn delete_expired(&self) -> Result<u64> {
        let now = current_epoch()? as i64;

        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at < ?")
            .bind(now)
            .execute(&self.pool)
            .await?;

        let deleted = result.rows_affected();
        if deleted > 0 {
            info!("Deleted {} expired refresh tokens", deleted);
        }
        Ok(deleted)
    }
}

/// Issue a new access + refresh token pair for a user
pub async fn issue_token_pair(
    jwt: &TokenService,
    tokens: &RefreshTokenRepository,
    username: &str,
) -> Result<TokenPair> {
    let access_token = jwt.issue_access_token(username)?;
    let (refresh_token, refresh_expires_at) =
        tokens.create(username, REFRESH_TOKEN_TTL_DAYS).await?;

    Ok(TokenPair {
        access_token,
        refresh_token,
        refresh_expires_at,
    })
}

/// Generate a cryptographically random opaque token string
fn generate_opaque_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database;

    async fn test_repo() -> RefreshTokenRepository {
        let pool = database::test_pool().await;
        RefreshTokenRepository::new(pool)
    }

    #[test]
    fn test_opaque_token_shape() {
        let a = generate_opaque_token();
        let b = generate_opaque_token();
        assert_eq!(a.len(), TOKEN_LENGTH);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_create_and_verify() {
        let repo = test_repo().await;

        let (token, expires_at) = repo.create("alice", 30).await.unwrap();
        assert!(expires_at > current_epoch().unwrap() as i64);

        let username = repo.verify(&token).await.unwrap();
        assert_eq!(username.as_deref(), Some("alice"));

        assert_eq!(repo.verify("no-such-token").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_consume_is_single_use() {
        let repo = test_repo().await;

        let (token, _) = repo.create("alice", 30).await.unwrap();

        let first = repo.consume(&token).await.unwrap();
        assert_eq!(first.as_deref(), Some("alice"));

        // Rotation: the first consume revoked the token.
        let second = repo.consume(&token).await.unwrap();
        assert_eq!(second, None);
        assert_eq!(repo.verify(&token).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_token_is_live_through_its_expiry_second() {
        let repo = test_repo().await;

        let (token, expires_at) = repo.create("alice", 30).await.unwrap();

        // Valid at the exact expiry second, gone one second later.
        let at_expiry = repo.verify_at(&token, expires_at).await.unwrap();
        assert_eq!(at_expiry.as_deref(), Some("alice"));

        let past_expiry = repo.verify_at(&token, expires_at + 1).await.unwrap();
        assert_eq!(past_expiry, None);

        let consumed = repo.consume_at(&token, expires_at).await.unwrap();
        assert_eq!(consumed.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn test_consume_rejects_past_expiry() {
        let repo = test_repo().await;

        let (token, expires_at) = repo.create("alice", 30).await.unwrap();
        assert_eq!(repo.consume_at(&token, expires_at + 1).await.unwrap(), None);

        // The failed consume must not have revoked the token.
        let record = repo.find(&token).await.unwrap().unwrap();
        assert!(!record.revoked);
    }

    #[tokio::test]
    async fn test_revoke_is_idempotent() {
        let repo = test_repo().await;

        let (token, _) = repo.create("alice", 30).await.unwrap();
        repo.revoke(&token).await.unwrap();
        repo.revoke(&token).await.unwrap();

        assert_eq!(repo.verify(&token).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_revoke_all_invalidates_every_token() {
        let repo = test_repo().await;

        let (t1, _) = repo.create("alice", 30).await.unwrap();
        let (t2, _) = repo.create("alice", 30).await.unwrap();
        let (bob, _) = repo.create("bob", 30).await.unwrap();

        let revoked = repo.revoke_all("alice").await.unwrap();
        assert_eq!(revoked, 2);

        assert_eq!(repo.verify(&t1).await.unwrap(), None);
        assert_eq!(repo.verify(&t2).await.unwrap(), None);
        assert_eq!(repo.verify(&bob).await.unwrap().as_deref(), Some("bob"));
    }

    #[tokio::test]
    async fn test_expired_token_fails_and_is_swept() {
        let repo = test_repo().await;

        // A negative TTL puts the expiry in the past.
        let (token, _) = repo.create("alice", -1).await.unwrap();
        assert_eq!(repo.verify(&token).await.unwrap(), None);
        assert_eq!(repo.consume(&token).await.unwrap(), None);

        let deleted = repo.delete_expired().await.unwrap();
        assert_eq!(deleted, 1);
    }
}
