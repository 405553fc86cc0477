//! Profile repository for database operations

use anyhow::Result;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::info;

use crate::models::{NewProfile, Profile, UpdateProfile};

const PROFILE_COLUMNS: &str =
    "id, username, email, first_name, last_name, phone, address, created_at, updated_at";

/// Profile repository
#[derive(Clone)]
pub struct ProfileRepository {
    pool: SqlitePool,
}

impl ProfileRepository {
    /// Create a new profile repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// List all profiles ordered by id
    pub async fn list(&self) -> Result<Vec<Profile>> {
        let profiles = sqlx::query_as::<_, Profile>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM users ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(profiles)
    }

    /// Find a profile by id
    pub async fn find_by_id(&self, id: i64) -> Result<Option<Profile>> {
        let profile = sqlx::query_as::<_, Profile>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM users WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(profile)
    }

    /// Find a profile by username
    pub async fn find_by_username(&self, username: &str) -> Result<Option<Profile>> {
        let profile = sqlx::query_as::<_, Profile>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM users WHERE username = ?"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(profile)
    }

    /// Create a new profile
    ///
    /// Returns `Ok(None)` when the username is already taken.
    pub async fn create(&self, username: &str, new: &NewProfile) -> Result<Option<Profile>> {
        info!("Creating profile for: {}", username);

        let result = sqlx::query_as::<_, Profile>(&format!(
            r#"
            INSERT INTO users (username, email, first_name, last_name, phone, address)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING {PROFILE_COLUMNS}
            "#
        ))
        .bind(username)
        .bind(&new.email)
        .bind(&new.first_name)
        .bind(&new.last_name)
        .bind(&new.phone)
        .bind(&new.address)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(profile) => Ok(Some(profile)),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Apply a partial update to a profile
    ///
    /// Returns `false` when no row matched the id.
    pub async fn update(&self, id: i64, update: &UpdateProfile) -> Result<bool> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE users SET ");
        let mut fields = builder.separated(", ");

        if let Some(email) = &update.email {
            fields.push("email = ").push_bind_unseparated(email);
        }
        if let Some(first_name) = &update.first_name {
            fields.push("first_name = ").push_bind_unseparated(first_name);
        }
        if let Some(last_name) = &update.last_name {
            fields.push("last_name = ").push_bind_unseparated(last_name);
        }
        if let Some(phone) = &update.phone {
            fields.push("phone = ").push_bind_unseparated(phone);
        }
        if let Some(address) = &update.address {
            fields.push("address = ").push_bind_unseparated(address);
        }
        fields.push("updated_at = CURRENT_TIMESTAMP");

        builder.push(" WHERE id = ").push_bind(id);

        let result = builder.build().execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a profile; returns `false` when nothing was deleted
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
