//! User repository.

use chrono::{DateTime, Utc};
use pod_core::User;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

pub struct UserRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepo<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `DbError::Duplicate` if `external_id` or `email` already
    /// exist, or `DbError::Sqlx` otherwise.
    pub async fn create(&self, user: &User) -> Result<(), DbError> {
        sqlx::query(
            r"
            INSERT INTO users (
                id, external_id, email, name, is_admin, email_digest_enabled,
                email_digest_hour, timezone, last_email_digest_sent, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ",
        )
        .bind(user.id)
        .bind(&user.external_id)
        .bind(&user.email)
        .bind(&user.name)
        .bind(user.is_admin)
        .bind(user.email_digest_enabled)
        .bind(user.email_digest_hour)
        .bind(&user.timezone)
        .bind(user.last_email_digest_sent)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                DbError::Duplicate(user.email.clone())
            }
            _ => DbError::Sqlx(e),
        })?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `DbError` if the update fails.
    pub async fn update(&self, user: &User) -> Result<(), DbError> {
        sqlx::query(
            r"
            UPDATE users
            SET name = $2, is_admin = $3, email_digest_enabled = $4, email_digest_hour = $5,
                timezone = $6, updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(user.is_admin)
        .bind(user.email_digest_enabled)
        .bind(user.email_digest_hour)
        .bind(&user.timezone)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `DbError` if the query fails.
    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<User>, DbError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(user)
    }

    /// # Errors
    ///
    /// Returns `DbError` if the query fails.
    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>, DbError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(self.pool)
            .await?;
        Ok(user)
    }

    /// # Errors
    ///
    /// Returns `DbError` if the query fails.
    pub async fn get_by_external_id(&self, external_id: &str) -> Result<Option<User>, DbError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE external_id = $1")
            .bind(external_id)
            .fetch_optional(self.pool)
            .await?;
        Ok(user)
    }

    /// Users eligible for a digest pass: opted in, and either never sent
    /// one or the last send was at least 20 hours ago (§4.A). The
    /// timezone-local delivery-hour check happens in the pipeline crate's
    /// `DigestWorker`, not here, since it needs an IANA time library.
    ///
    /// # Errors
    ///
    /// Returns `DbError` if the query fails.
    pub async fn get_users_for_email_digest(&self) -> Result<Vec<User>, DbError> {
        let users = sqlx::query_as::<_, User>(
            r"
            SELECT * FROM users
            WHERE email_digest_enabled = TRUE
                AND (last_email_digest_sent IS NULL
                     OR last_email_digest_sent <= NOW() - INTERVAL '20 hours')
            ORDER BY created_at
            ",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(users)
    }

    /// # Errors
    ///
    /// Returns `DbError` if the update fails.
    pub async fn mark_email_digest_sent(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), DbError> {
        sqlx::query(
            "UPDATE users SET last_email_digest_sent = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(at)
        .execute(self.pool)
        .await?;
        Ok(())
    }
}
