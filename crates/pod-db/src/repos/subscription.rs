//! Subscription repository — the many-to-many edge between users and
//! podcasts (invariant 6: there is no other "subscribed" flag).

use pod_core::{Podcast, UserSubscription};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

pub struct SubscriptionRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> SubscriptionRepo<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Idempotent: subscribing twice is a no-op, not an error.
    ///
    /// # Errors
    ///
    /// Returns `DbError` if the insert fails for a reason other than a
    /// duplicate row.
    pub async fn subscribe(&self, sub: &UserSubscription) -> Result<(), DbError> {
        sqlx::query(
            r"
            INSERT INTO user_subscriptions (user_id, podcast_id, created_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, podcast_id) DO NOTHING
            ",
        )
        .bind(sub.user_id)
        .bind(sub.podcast_id)
        .bind(sub.created_at)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `DbError` if the delete fails.
    pub async fn unsubscribe(&self, user_id: Uuid, podcast_id: Uuid) -> Result<(), DbError> {
        sqlx::query("DELETE FROM user_subscriptions WHERE user_id = $1 AND podcast_id = $2")
            .bind(user_id)
            .bind(podcast_id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `DbError` if the query fails.
    pub async fn is_subscribed(&self, user_id: Uuid, podcast_id: Uuid) -> Result<bool, DbError> {
        let row: Option<(i32,)> = sqlx::query_as(
            "SELECT 1 FROM user_subscriptions WHERE user_id = $1 AND podcast_id = $2",
        )
        .bind(user_id)
        .bind(podcast_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row.is_some())
    }

    /// The podcasts a user is subscribed to — used by both `ChatSearch`'s
    /// `subscribed_only` scope and `get_user_subscriptions`.
    ///
    /// # Errors
    ///
    /// Returns `DbError` if the query fails.
    pub async fn get_user_subscriptions(&self, user_id: Uuid) -> Result<Vec<Podcast>, DbError> {
        let podcasts = sqlx::query_as::<_, Podcast>(
            r"
            SELECT p.* FROM podcasts p
            JOIN user_subscriptions s ON s.podcast_id = p.id
            WHERE s.user_id = $1
            ORDER BY p.title
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(podcasts)
    }
}
