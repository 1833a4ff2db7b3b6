//! Podcast repository.

use chrono::{DateTime, Utc};
use pod_core::Podcast;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

pub struct PodcastRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> PodcastRepo<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new podcast.
    ///
    /// # Errors
    ///
    /// Returns `DbError::Duplicate` if `feed_url` already exists, or
    /// `DbError::Sqlx` on any other failure.
    pub async fn create(&self, podcast: &Podcast) -> Result<(), DbError> {
        sqlx::query(
            r"
            INSERT INTO podcasts (
                id, source_type, feed_url, title, description, image_url, author, language,
                local_directory, last_checked, last_new_episode, channel_id, playlist_id, handle,
                description_index_status, description_index_error, description_resource_name,
                description_display_name, description_uploaded_at, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17,
                    $18, $19, $20, $21)
            ",
        )
        .bind(podcast.id)
        .bind(podcast.source_type)
        .bind(&podcast.feed_url)
        .bind(&podcast.title)
        .bind(&podcast.description)
        .bind(&podcast.image_url)
        .bind(&podcast.author)
        .bind(&podcast.language)
        .bind(&podcast.local_directory)
        .bind(podcast.last_checked)
        .bind(podcast.last_new_episode)
        .bind(&podcast.channel_id)
        .bind(&podcast.playlist_id)
        .bind(&podcast.handle)
        .bind(&podcast.description_index_status)
        .bind(&podcast.description_index_error)
        .bind(&podcast.description_resource_name)
        .bind(&podcast.description_display_name)
        .bind(podcast.description_uploaded_at)
        .bind(podcast.created_at)
        .bind(podcast.updated_at)
        .execute(self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                DbError::Duplicate(podcast.feed_url.clone())
            }
            _ => DbError::Sqlx(e),
        })?;
        Ok(())
    }

    /// Update mutable podcast fields (everything but `id`/`created_at`).
    ///
    /// # Errors
    ///
    /// Returns `DbError` if the update fails.
    pub async fn update(&self, podcast: &Podcast) -> Result<(), DbError> {
        sqlx::query(
            r"
            UPDATE podcasts
            SET title = $2, description = $3, image_url = $4, author = $5, language = $6,
                local_directory = $7, channel_id = $8, playlist_id = $9, handle = $10,
                updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(podcast.id)
        .bind(&podcast.title)
        .bind(&podcast.description)
        .bind(&podcast.image_url)
        .bind(&podcast.author)
        .bind(&podcast.language)
        .bind(&podcast.local_directory)
        .bind(&podcast.channel_id)
        .bind(&podcast.playlist_id)
        .bind(&podcast.handle)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `DbError` if the query fails.
    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<Podcast>, DbError> {
        let podcast = sqlx::query_as::<_, Podcast>("SELECT * FROM podcasts WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(podcast)
    }

    /// # Errors
    ///
    /// Returns `DbError` if the query fails.
    pub async fn get_by_feed_url(&self, feed_url: &str) -> Result<Option<Podcast>, DbError> {
        let podcast = sqlx::query_as::<_, Podcast>("SELECT * FROM podcasts WHERE feed_url = $1")
            .bind(feed_url)
            .fetch_optional(self.pool)
            .await?;
        Ok(podcast)
    }

    /// Looks up an existing YouTube-sourced podcast by channel id, used
    /// to dedupe a channel add against one already subscribed (§4.B).
    ///
    /// # Errors
    ///
    /// Returns `DbError` if the query fails.
    pub async fn get_by_channel_id(&self, channel_id: &str) -> Result<Option<Podcast>, DbError> {
        let podcast = sqlx::query_as::<_, Podcast>("SELECT * FROM podcasts WHERE channel_id = $1")
            .bind(channel_id)
            .fetch_optional(self.pool)
            .await?;
        Ok(podcast)
    }

    /// Resolves a citation title back to its owning podcast, per the
    /// ChatSearch description-citation path (§4.I).
    ///
    /// # Errors
    ///
    /// Returns `DbError` if the query fails.
    pub async fn get_by_description_display_name(
        &self,
        display_name: &str,
    ) -> Result<Option<Podcast>, DbError> {
        let podcast = sqlx::query_as::<_, Podcast>(
            "SELECT * FROM podcasts WHERE description_display_name = $1",
        )
        .bind(display_name)
        .fetch_optional(self.pool)
        .await?;
        Ok(podcast)
    }

    /// # Errors
    ///
    /// Returns `DbError` if the query fails.
    pub async fn list(&self, limit: Option<i64>) -> Result<Vec<Podcast>, DbError> {
        let podcasts = match limit {
            Some(n) => {
                sqlx::query_as::<_, Podcast>("SELECT * FROM podcasts ORDER BY title LIMIT $1")
                    .bind(n)
                    .fetch_all(self.pool)
                    .await?
            }
            None => {
                sqlx::query_as::<_, Podcast>("SELECT * FROM podcasts ORDER BY title")
                    .fetch_all(self.pool)
                    .await?
            }
        };
        Ok(podcasts)
    }

    /// Podcasts whose description has not yet been indexed, for the
    /// Indexer's separate description-pending queue (§4.F).
    ///
    /// # Errors
    ///
    /// Returns `DbError` if the query fails.
    pub async fn get_podcasts_pending_description_indexing(
        &self,
        limit: i64,
    ) -> Result<Vec<Podcast>, DbError> {
        let podcasts = sqlx::query_as::<_, Podcast>(
            r"
            SELECT * FROM podcasts
            WHERE description_index_status = 'pending' AND description IS NOT NULL
            ORDER BY created_at
            LIMIT $1
            ",
        )
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(podcasts)
    }

    /// # Errors
    ///
    /// Returns `DbError` if the update fails.
    pub async fn update_last_checked(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), DbError> {
        sqlx::query("UPDATE podcasts SET last_checked = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Advances `last_new_episode` only if `candidate` is strictly newer
    /// than the current value (invariant 5). The `WHERE` clause makes the
    /// monotonicity check atomic rather than read-then-write.
    ///
    /// # Errors
    ///
    /// Returns `DbError` if the update fails.
    pub async fn advance_last_new_episode(
        &self,
        id: Uuid,
        candidate: DateTime<Utc>,
    ) -> Result<(), DbError> {
        sqlx::query(
            r"
            UPDATE podcasts
            SET last_new_episode = $2, updated_at = NOW()
            WHERE id = $1 AND (last_new_episode IS NULL OR last_new_episode < $2)
            ",
        )
        .bind(id)
        .bind(candidate)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `DbError` if the update fails.
    pub async fn mark_description_index_started(&self, id: Uuid) -> Result<(), DbError> {
        sqlx::query(
            r"
            UPDATE podcasts
            SET description_index_status = 'processing', description_index_error = NULL,
                updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `DbError` if the update fails.
    pub async fn mark_description_index_complete(
        &self,
        id: Uuid,
        resource_name: &str,
        display_name: &str,
    ) -> Result<(), DbError> {
        sqlx::query(
            r"
            UPDATE podcasts
            SET description_index_status = 'indexed', description_resource_name = $2,
                description_display_name = $3, description_uploaded_at = NOW(), updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(resource_name)
        .bind(display_name)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `DbError` if the update fails.
    pub async fn mark_description_index_failed(
        &self,
        id: Uuid,
        error: &str,
    ) -> Result<(), DbError> {
        sqlx::query(
            r"
            UPDATE podcasts
            SET description_index_status = 'failed', description_index_error = $2,
                updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(error)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `DbError` if the delete fails. Cascades to episodes via
    /// `ON DELETE CASCADE` (invariant 7).
    pub async fn delete(&self, id: Uuid) -> Result<(), DbError> {
        sqlx::query("DELETE FROM podcasts WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pod_core::SourceType;

    #[test]
    fn new_podcast_has_no_last_new_episode() {
        let podcast = Podcast::new(SourceType::Rss, "https://x.test/feed".into(), "X".into());
        assert!(podcast.last_new_episode.is_none());
        assert!(podcast.would_advance_last_new_episode(Utc::now()));
    }
}
