//! Optional Redis session cache
//!
//! When a cache is configured, the auth service tracks the live refresh
//! token per user under `session:<username>`. The cache is purely a
//! convenience view; the refresh token table remains the source of truth,
//! so every operation degrades to a no-op without Redis.

use anyhow::Result;
use common::cache::RedisPool;
use tracing::{info, warn};

/// Session cache wrapper over an optional Redis connection
#[derive(Clone)]
pub struct SessionManager {
    cache: Option<RedisPool>,
}

impl SessionManager {
    /// Create a new session manager
    pub fn new(cache: Option<RedisPool>) -> Self {
        if cache.is_none() {
            info!("Session cache disabled (SESSION_CACHE_URL not set)");
        }
        Self { cache }
    }

    /// Record the live refresh token for a user
    pub async fn store(&self, username: &str, refresh_token: &str, ttl_seconds: u64) -> Result<()> {
        if let Some(cache) = &self.cache {
            let key = session_key(username);
            if let Err(e) = cache.set(&key, refresh_token, Some(ttl_seconds)).await {
                warn!("Failed to cache session for {}: {}", username, e);
            }
        }
        Ok(())
    }

    /// Fetch the cached refresh token for a user
    pub async fn get(&self, username: &str) -> Result<Option<String>> {
        match &self.cache {
            Some(cache) => cache.get(&session_key(username)).await,
            None => Ok(None),
        }
    }

    /// Drop the cached session for a user
    pub async fn clear(&self, username: &str) -> Result<()> {
        if let Some(cache) = &self.cache {
            if let Err(e) = cache.delete(&session_key(username)).await {
                warn!("Failed to clear session for {}: {}", username, e);
            }
        }
        Ok(())
    }
}

fn session_key(username: &str) -> String {
    format!("session:{}", username)
}
