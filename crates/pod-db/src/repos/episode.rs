//! Episode repository: the four-stage state machine (§4.A).
//!
//! Every transition writes through one short-lived query; callers never
//! hold a snapshot across stages. Work-selection queries use
//! `ORDER BY ... LIMIT n` without row locks, relying on the
//! orchestrator's single-writer discipline (§5) for safety.

use chrono::{DateTime, Utc};
use pod_core::{EmailContent, Episode, Stage};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

pub struct EpisodeRepo<'a> {
    pool: &'a PgPool,
}

/// Fields the `MetadataExtractor` writes in one call (§4.E).
#[derive(Debug, Clone, Default)]
pub struct MetadataPayload {
    pub summary: String,
    pub keywords: Vec<String>,
    pub hosts: Vec<String>,
    pub guests: Vec<String>,
    pub mp3_artist: Option<String>,
    pub mp3_album: Option<String>,
    pub email_content: Option<EmailContent>,
}

impl<'a> EpisodeRepo<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new episode unconditionally.
    ///
    /// # Errors
    ///
    /// Returns `DbError` if the insert fails.
    pub async fn create(&self, episode: &Episode) -> Result<(), DbError> {
        sqlx::query(
            r"
            INSERT INTO episodes (
                id, podcast_id, guid, source_type, title, description, published_date,
                duration_seconds, episode_number, season_number, enclosure_url, enclosure_type,
                enclosure_length,
                download_status, download_error, downloaded_at, local_file_path, file_size_bytes,
                file_hash, download_retry_count,
                transcript_status, transcript_error, transcribed_at, transcript_text,
                transcript_source, transcript_retry_count,
                metadata_status, metadata_error, ai_summary, ai_keywords, ai_hosts, ai_guests,
                ai_email_content, mp3_artist, mp3_album, metadata_retry_count,
                file_search_status, file_search_error, resource_name, display_name, uploaded_at,
                file_search_retry_count,
                created_at, updated_at
            )
            VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13,
                $14, $15, $16, $17, $18, $19, $20,
                $21, $22, $23, $24, $25, $26,
                $27, $28, $29, $30, $31, $32, $33, $34, $35, $36,
                $37, $38, $39, $40, $41, $42,
                $43, $44
            )
            ",
        )
        .bind(episode.id)
        .bind(episode.podcast_id)
        .bind(&episode.guid)
        .bind(episode.source_type)
        .bind(&episode.title)
        .bind(&episode.description)
        .bind(episode.published_date)
        .bind(episode.duration_seconds)
        .bind(episode.episode_number)
        .bind(episode.season_number)
        .bind(&episode.enclosure_url)
        .bind(&episode.enclosure_type)
        .bind(episode.enclosure_length)
        .bind(&episode.download_status)
        .bind(&episode.download_error)
        .bind(episode.downloaded_at)
        .bind(&episode.local_file_path)
        .bind(episode.file_size_bytes)
        .bind(&episode.file_hash)
        .bind(episode.download_retry_count)
        .bind(&episode.transcript_status)
        .bind(&episode.transcript_error)
        .bind(episode.transcribed_at)
        .bind(&episode.transcript_text)
        .bind(&episode.transcript_source)
        .bind(episode.transcript_retry_count)
        .bind(&episode.metadata_status)
        .bind(&episode.metadata_error)
        .bind(&episode.ai_summary)
        .bind(serde_json::to_value(&episode.ai_keywords).unwrap_or_default())
        .bind(serde_json::to_value(&episode.ai_hosts).unwrap_or_default())
        .bind(serde_json::to_value(&episode.ai_guests).unwrap_or_default())
        .bind(&episode.ai_email_content)
        .bind(&episode.mp3_artist)
        .bind(&episode.mp3_album)
        .bind(episode.metadata_retry_count)
        .bind(&episode.file_search_status)
        .bind(&episode.file_search_error)
        .bind(&episode.resource_name)
        .bind(&episode.display_name)
        .bind(episode.uploaded_at)
        .bind(episode.file_search_retry_count)
        .bind(episode.created_at)
        .bind(episode.updated_at)
        .execute(self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                DbError::Duplicate(format!("{}/{}", episode.podcast_id, episode.guid))
            }
            _ => DbError::Sqlx(e),
        })?;
        Ok(())
    }

    /// Upsert keyed on `(podcast_id, guid)` (§4.A): returns the existing
    /// row if present, otherwise inserts `candidate` and returns it.
    /// Idempotent — calling twice with the same guid never creates a
    /// second row.
    ///
    /// # Errors
    ///
    /// Returns `DbError` if either the lookup or the insert fails.
    pub async fn get_or_create_episode(
        &self,
        candidate: Episode,
    ) -> Result<(Episode, bool), DbError> {
        if let Some(existing) = self
            .get_by_podcast_and_guid(candidate.podcast_id, &candidate.guid)
            .await?
        {
            return Ok((existing, false));
        }
        self.create(&candidate).await?;
        Ok((candidate, true))
    }

    /// # Errors
    ///
    /// Returns `DbError` if the query fails.
    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<Episode>, DbError> {
        let episode = sqlx::query_as::<_, Episode>("SELECT * FROM episodes WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(episode)
    }

    /// # Errors
    ///
    /// Returns `DbError` if the query fails.
    pub async fn get_by_podcast_and_guid(
        &self,
        podcast_id: Uuid,
        guid: &str,
    ) -> Result<Option<Episode>, DbError> {
        let episode = sqlx::query_as::<_, Episode>(
            "SELECT * FROM episodes WHERE podcast_id = $1 AND guid = $2",
        )
        .bind(podcast_id)
        .bind(guid)
        .fetch_optional(self.pool)
        .await?;
        Ok(episode)
    }

    /// Resolves a citation title to its owning episode (§4.I).
    ///
    /// # Errors
    ///
    /// Returns `DbError` if the query fails.
    pub async fn get_by_file_search_display_name(
        &self,
        display_name: &str,
    ) -> Result<Option<Episode>, DbError> {
        let episode =
            sqlx::query_as::<_, Episode>("SELECT * FROM episodes WHERE display_name = $1")
                .bind(display_name)
                .fetch_optional(self.pool)
                .await?;
        Ok(episode)
    }

    /// # Errors
    ///
    /// Returns `DbError` if the query fails.
    pub async fn list_for_podcast(
        &self,
        podcast_id: Uuid,
        limit: Option<i64>,
    ) -> Result<Vec<Episode>, DbError> {
        let episodes = match limit {
            Some(n) => sqlx::query_as::<_, Episode>(
                "SELECT * FROM episodes WHERE podcast_id = $1 \
                 ORDER BY published_date DESC, created_at LIMIT $2",
            )
            .bind(podcast_id)
            .bind(n)
            .fetch_all(self.pool)
            .await?,
            None => sqlx::query_as::<_, Episode>(
                "SELECT * FROM episodes WHERE podcast_id = $1 \
                 ORDER BY published_date DESC, created_at",
            )
            .bind(podcast_id)
            .fetch_all(self.pool)
            .await?,
        };
        Ok(episodes)
    }

    // ---- download track -------------------------------------------------

    /// # Errors
    ///
    /// Returns `DbError` if the update fails.
    pub async fn mark_download_started(&self, id: Uuid) -> Result<(), DbError> {
        sqlx::query(
            "UPDATE episodes SET download_status = 'downloading', download_error = NULL, \
             updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `DbError` if the update fails.
    pub async fn mark_download_complete(
        &self,
        id: Uuid,
        local_file_path: &str,
        file_size_bytes: i64,
        file_hash: &str,
    ) -> Result<(), DbError> {
        sqlx::query(
            r"
            UPDATE episodes
            SET download_status = 'completed', download_error = NULL, downloaded_at = NOW(),
                local_file_path = $2, file_size_bytes = $3, file_hash = $4, updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(local_file_path)
        .bind(file_size_bytes)
        .bind(file_hash)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `DbError` if the update fails.
    pub async fn mark_download_failed(&self, id: Uuid, error: &str) -> Result<(), DbError> {
        sqlx::query(
            "UPDATE episodes SET download_status = 'failed', download_error = $2, \
             updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(error)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Clears `local_file_path` once the post-processing chain has
    /// finished with the audio (the downloader's `cleanup_processed_episodes`).
    ///
    /// # Errors
    ///
    /// Returns `DbError` if the update fails.
    pub async fn mark_audio_cleaned_up(&self, id: Uuid) -> Result<(), DbError> {
        sqlx::query(
            "UPDATE episodes SET local_file_path = NULL, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    // ---- transcript track -------------------------------------------------

    /// # Errors
    ///
    /// Returns `DbError` if the update fails.
    pub async fn mark_transcript_started(&self, id: Uuid) -> Result<(), DbError> {
        sqlx::query(
            "UPDATE episodes SET transcript_status = 'processing', transcript_error = NULL, \
             updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// `transcript_source` is either `"youtube_captions"` or `"model"`
    /// (§3). The YouTube-captions short-circuit also marks download
    /// complete in the same call, since captions-only episodes never
    /// download audio (invariant 1).
    ///
    /// # Errors
    ///
    /// Returns `DbError` if the update fails.
    pub async fn mark_transcript_complete(
        &self,
        id: Uuid,
        transcript_text: &str,
        transcript_source: &str,
    ) -> Result<(), DbError> {
        sqlx::query(
            r"
            UPDATE episodes
            SET transcript_status = 'completed', transcript_error = NULL, transcribed_at = NOW(),
                transcript_text = $2, transcript_source = $3, updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(transcript_text)
        .bind(transcript_source)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Marks both download and transcript complete in one statement: the
    /// YouTube captions-available fast path (§4.D).
    ///
    /// # Errors
    ///
    /// Returns `DbError` if the update fails.
    pub async fn mark_captions_complete(
        &self,
        id: Uuid,
        transcript_text: &str,
    ) -> Result<(), DbError> {
        sqlx::query(
            r"
            UPDATE episodes
            SET download_status = 'completed', download_error = NULL, downloaded_at = NOW(),
                transcript_status = 'completed', transcript_error = NULL, transcribed_at = NOW(),
                transcript_text = $2, transcript_source = 'youtube_captions', updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(transcript_text)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `DbError` if the update fails.
    pub async fn mark_transcript_failed(&self, id: Uuid, error: &str) -> Result<(), DbError> {
        sqlx::query(
            "UPDATE episodes SET transcript_status = 'failed', transcript_error = $2, \
             updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(error)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    // ---- metadata track -------------------------------------------------

    /// # Errors
    ///
    /// Returns `DbError` if the update fails.
    pub async fn mark_metadata_started(&self, id: Uuid) -> Result<(), DbError> {
        sqlx::query(
            "UPDATE episodes SET metadata_status = 'processing', metadata_error = NULL, \
             updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Writes the merged metadata in one call (§4.E).
    ///
    /// # Errors
    ///
    /// Returns `DbError` if the update fails.
    pub async fn mark_metadata_complete(
        &self,
        id: Uuid,
        payload: &MetadataPayload,
    ) -> Result<(), DbError> {
        let email_content = payload
            .email_content
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| DbError::InvalidOperation(e.to_string()))?;
        sqlx::query(
            r"
            UPDATE episodes
            SET metadata_status = 'completed', metadata_error = NULL,
                ai_summary = $2, ai_keywords = $3, ai_hosts = $4, ai_guests = $5,
                ai_email_content = $6, mp3_artist = $7, mp3_album = $8, updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(&payload.summary)
        .bind(serde_json::to_value(&payload.keywords).unwrap_or_default())
        .bind(serde_json::to_value(&payload.hosts).unwrap_or_default())
        .bind(serde_json::to_value(&payload.guests).unwrap_or_default())
        .bind(email_content)
        .bind(&payload.mp3_artist)
        .bind(&payload.mp3_album)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `DbError` if the update fails.
    pub async fn mark_metadata_failed(&self, id: Uuid, error: &str) -> Result<(), DbError> {
        sqlx::query(
            "UPDATE episodes SET metadata_status = 'failed', metadata_error = $2, \
             updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(error)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    // ---- file_search track -------------------------------------------------

    /// # Errors
    ///
    /// Returns `DbError` if the update fails.
    pub async fn mark_file_search_started(&self, id: Uuid) -> Result<(), DbError> {
        sqlx::query(
            "UPDATE episodes SET file_search_status = 'processing', file_search_error = NULL, \
             updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `DbError` if the update fails.
    pub async fn mark_file_search_complete(
        &self,
        id: Uuid,
        resource_name: &str,
        display_name: &str,
    ) -> Result<(), DbError> {
        sqlx::query(
            r"
            UPDATE episodes
            SET file_search_status = 'indexed', file_search_error = NULL, resource_name = $2,
                display_name = $3, uploaded_at = NOW(), updated_at = NOW()
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
    pub async fn mark_file_search_failed(&self, id: Uuid, error: &str) -> Result<(), DbError> {
        sqlx::query(
            "UPDATE episodes SET file_search_status = 'failed', file_search_error = $2, \
             updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(error)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    // ---- retry / failure machinery, generic over the four stages -----------

    /// Flips a failed stage back to pending and clears its error.
    /// `retry_count` is deliberately left untouched — per §10.6, retries
    /// accumulate across resubmissions of the same failed stage; only an
    /// explicit operator reset zeroes the counter.
    ///
    /// # Errors
    ///
    /// Returns `DbError` if the update fails.
    pub async fn reset_episode_for_retry(&self, id: Uuid, stage: Stage) -> Result<(), DbError> {
        let (status_col, error_col) = stage_columns(stage);
        let sql = format!(
            "UPDATE episodes SET {status_col} = 'pending', {error_col} = NULL, updated_at = NOW() \
             WHERE id = $1"
        );
        sqlx::query(&sql).bind(id).execute(self.pool).await?;
        Ok(())
    }

    /// Increments the stage's retry counter and returns the new value.
    ///
    /// # Errors
    ///
    /// Returns `DbError` if the update fails, or `DbError::NotFound` if
    /// the episode doesn't exist.
    pub async fn increment_retry_count(&self, id: Uuid, stage: Stage) -> Result<i32, DbError> {
        let retry_col = stage_retry_column(stage);
        let sql = format!(
            "UPDATE episodes SET {retry_col} = {retry_col} + 1, updated_at = NOW() \
             WHERE id = $1 RETURNING {retry_col}"
        );
        let row: Option<(i32,)> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        row.map(|(n,)| n)
            .ok_or_else(|| DbError::NotFound(id.to_string()))
    }

    /// Terminal transition: a `permanently_failed` stage is never
    /// auto-retried again (invariant 4).
    ///
    /// # Errors
    ///
    /// Returns `DbError` if the update fails.
    pub async fn mark_permanently_failed(
        &self,
        id: Uuid,
        stage: Stage,
        error: &str,
    ) -> Result<(), DbError> {
        let (status_col, error_col) = stage_columns(stage);
        let sql = format!(
            "UPDATE episodes SET {status_col} = 'permanently_failed', {error_col} = $2, \
             updated_at = NOW() WHERE id = $1"
        );
        sqlx::query(&sql)
            .bind(id)
            .bind(error)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    // ---- work-selection queries -------------------------------------------------

    /// # Errors
    ///
    /// Returns `DbError` if the query fails.
    pub async fn get_episodes_pending_download(&self, limit: i64) -> Result<Vec<Episode>, DbError> {
        let episodes = sqlx::query_as::<_, Episode>(
            r"
            SELECT * FROM episodes WHERE download_status = 'pending'
            ORDER BY published_date DESC, created_at LIMIT $1
            ",
        )
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(episodes)
    }

    /// Count of episodes with download completed but transcript still
    /// pending — the download buffer (§4.H).
    ///
    /// # Errors
    ///
    /// Returns `DbError` if the query fails.
    pub async fn get_download_buffer_count(&self) -> Result<i64, DbError> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM episodes \
             WHERE download_status = 'completed' AND transcript_status = 'pending'",
        )
        .fetch_one(self.pool)
        .await?;
        Ok(count)
    }

    /// # Errors
    ///
    /// Returns `DbError` if the query fails.
    pub async fn get_next_for_transcription(&self) -> Result<Option<Episode>, DbError> {
        let episode = sqlx::query_as::<_, Episode>(
            r"
            SELECT * FROM episodes
            WHERE download_status = 'completed' AND transcript_status = 'pending'
            ORDER BY published_date DESC, created_at
            LIMIT 1
            ",
        )
        .fetch_optional(self.pool)
        .await?;
        Ok(episode)
    }

    /// # Errors
    ///
    /// Returns `DbError` if the query fails.
    pub async fn get_episodes_pending_metadata(&self, limit: i64) -> Result<Vec<Episode>, DbError> {
        let episodes = sqlx::query_as::<_, Episode>(
            r"
            SELECT * FROM episodes
            WHERE transcript_status = 'completed' AND metadata_status = 'pending'
            ORDER BY published_date DESC, created_at LIMIT $1
            ",
        )
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(episodes)
    }

    /// # Errors
    ///
    /// Returns `DbError` if the query fails.
    pub async fn get_episodes_pending_indexing(&self, limit: i64) -> Result<Vec<Episode>, DbError> {
        let episodes = sqlx::query_as::<_, Episode>(
            r"
            SELECT * FROM episodes
            WHERE metadata_status = 'completed' AND file_search_status = 'pending'
            ORDER BY published_date DESC, created_at LIMIT $1
            ",
        )
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(episodes)
    }

    /// Episodes whose post-processing chain has finished and whose audio
    /// is still on disk.
    ///
    /// # Errors
    ///
    /// Returns `DbError` if the query fails.
    pub async fn get_episodes_ready_for_cleanup(
        &self,
        limit: i64,
    ) -> Result<Vec<Episode>, DbError> {
        let episodes = sqlx::query_as::<_, Episode>(
            r"
            SELECT * FROM episodes
            WHERE metadata_status = 'completed' AND file_search_status = 'indexed'
                AND local_file_path IS NOT NULL
            ORDER BY published_date DESC, created_at LIMIT $1
            ",
        )
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(episodes)
    }

    /// One episode with a completed transcript and either stage of the
    /// post-processing chain still pending.
    ///
    /// # Errors
    ///
    /// Returns `DbError` if the query fails.
    pub async fn get_next_pending_post_processing(&self) -> Result<Option<Episode>, DbError> {
        let episode = sqlx::query_as::<_, Episode>(
            r"
            SELECT * FROM episodes
            WHERE transcript_status = 'completed'
                AND (metadata_status = 'pending' OR file_search_status = 'pending')
            ORDER BY published_date DESC, created_at
            LIMIT 1
            ",
        )
        .fetch_optional(self.pool)
        .await?;
        Ok(episode)
    }

    /// Episodes in the user's subscribed podcasts with completed
    /// metadata, published after `since` — the digest/chat read path.
    ///
    /// # Errors
    ///
    /// Returns `DbError` if the query fails.
    pub async fn get_new_episodes_for_user_since(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Episode>, DbError> {
        let episodes = sqlx::query_as::<_, Episode>(
            r"
            SELECT e.* FROM episodes e
            JOIN user_subscriptions s ON s.podcast_id = e.podcast_id
            WHERE s.user_id = $1 AND e.metadata_status = 'completed' AND e.published_date > $2
            ORDER BY e.published_date DESC
            LIMIT $3
            ",
        )
        .bind(user_id)
        .bind(since)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(episodes)
    }

    /// Per-stage status counts, optionally scoped to one podcast. Backs
    /// the CLI's `status`/`list` maintenance commands (§6).
    ///
    /// # Errors
    ///
    /// Returns `DbError` if the query fails.
    pub async fn stage_counts(&self, podcast_id: Option<Uuid>) -> Result<StageCounts, DbError> {
        let row: StageCountsRow = if let Some(podcast_id) = podcast_id {
            sqlx::query_as(
                r"
                SELECT
                    COUNT(*) AS total,
                    COUNT(*) FILTER (WHERE download_status = 'completed') AS downloaded,
                    COUNT(*) FILTER (WHERE transcript_status = 'completed') AS transcribed,
                    COUNT(*) FILTER (WHERE transcript_status = 'permanently_failed') AS transcript_dead,
                    COUNT(*) FILTER (WHERE metadata_status = 'completed') AS metadata_done,
                    COUNT(*) FILTER (WHERE file_search_status = 'indexed') AS indexed
                FROM episodes WHERE podcast_id = $1
                ",
            )
            .bind(podcast_id)
            .fetch_one(self.pool)
            .await?
        } else {
            sqlx::query_as(
                r"
                SELECT
                    COUNT(*) AS total,
                    COUNT(*) FILTER (WHERE download_status = 'completed') AS downloaded,
                    COUNT(*) FILTER (WHERE transcript_status = 'completed') AS transcribed,
                    COUNT(*) FILTER (WHERE transcript_status = 'permanently_failed') AS transcript_dead,
                    COUNT(*) FILTER (WHERE metadata_status = 'completed') AS metadata_done,
                    COUNT(*) FILTER (WHERE file_search_status = 'indexed') AS indexed
                FROM episodes
                ",
            )
            .fetch_one(self.pool)
            .await?
        };
        Ok(row.into())
    }
}

/// Aggregate episode counts by pipeline stage, used for CLI reporting.
#[derive(Debug, Clone, Copy, Default)]
pub struct StageCounts {
    pub total: i64,
    pub downloaded: i64,
    pub transcribed: i64,
    pub transcript_dead: i64,
    pub metadata_done: i64,
    pub indexed: i64,
}

#[derive(sqlx::FromRow)]
struct StageCountsRow {
    total: i64,
    downloaded: i64,
    transcribed: i64,
    transcript_dead: i64,
    metadata_done: i64,
    indexed: i64,
}

impl From<StageCountsRow> for StageCounts {
    fn from(row: StageCountsRow) -> Self {
        Self {
            total: row.total,
            downloaded: row.downloaded,
            transcribed: row.transcribed,
            transcript_dead: row.transcript_dead,
            metadata_done: row.metadata_done,
            indexed: row.indexed,
        }
    }
}

fn stage_columns(stage: Stage) -> (&'static str, &'static str) {
    match stage {
        Stage::Download => ("download_status", "download_error"),
        Stage::Transcript => ("transcript_status", "transcript_error"),
        Stage::Metadata => ("metadata_status", "metadata_error"),
        Stage::FileSearch => ("file_search_status", "file_search_error"),
    }
}

const fn stage_retry_column(stage: Stage) -> &'static str {
    match stage {
        Stage::Download => "download_retry_count",
        Stage::Transcript => "transcript_retry_count",
        Stage::Metadata => "metadata_retry_count",
        Stage::FileSearch => "file_search_retry_count",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_columns_are_distinct_per_stage() {
        let all = [
            Stage::Download,
            Stage::Transcript,
            Stage::Metadata,
            Stage::FileSearch,
        ];
        let cols: Vec<_> = all.iter().map(|s| stage_columns(*s)).collect();
        for i in 0..cols.len() {
            for j in (i + 1)..cols.len() {
                assert_ne!(cols[i], cols[j]);
            }
        }
    }
}
