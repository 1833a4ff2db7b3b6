//! Podcast model (an RSS feed or a YouTube channel)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::episode::SourceType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DescriptionIndexStatus {
    Pending,
    Processing,
    Indexed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Podcast {
    pub id: Uuid,
    pub source_type: SourceType,
    pub feed_url: String,
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub author: Option<String>,
    pub language: Option<String>,
    pub local_directory: Option<String>,
    pub last_checked: Option<DateTime<Utc>>,
    pub last_new_episode: Option<DateTime<Utc>>,

    // YouTube-only fields (added for YouTube support)
    pub channel_id: Option<String>,
    pub playlist_id: Option<String>,
    pub handle: Option<String>,

    // description_index sub-record, flattened for sqlx's sake
    pub description_index_status: String,
    pub description_index_error: Option<String>,
    pub description_resource_name: Option<String>,
    pub description_display_name: Option<String>,
    pub description_uploaded_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Podcast {
    #[must_use]
    pub fn new(source_type: SourceType, feed_url: String, title: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            source_type,
            feed_url,
            title,
            description: None,
            image_url: None,
            author: None,
            language: None,
            local_directory: None,
            last_checked: None,
            last_new_episode: None,
            channel_id: None,
            playlist_id: None,
            handle: None,
            description_index_status: "pending".to_string(),
            description_index_error: None,
            description_resource_name: None,
            description_display_name: None,
            description_uploaded_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: String) -> Self {
        self.description = Some(description);
        self
    }

    #[must_use]
    pub fn with_image_url(mut self, url: String) -> Self {
        self.image_url = Some(url);
        self
    }

    #[must_use]
    pub fn with_author(mut self, author: String) -> Self {
        self.author = Some(author);
        self
    }

    #[must_use]
    pub fn description_index_status(&self) -> DescriptionIndexStatus {
        match self.description_index_status.as_str() {
            "processing" => DescriptionIndexStatus::Processing,
            "indexed" => DescriptionIndexStatus::Indexed,
            "failed" => DescriptionIndexStatus::Failed,
            _ => DescriptionIndexStatus::Pending,
        }
    }

    /// Invariant 5: `last_new_episode` only ever moves forward.
    #[must_use]
    pub fn would_advance_last_new_episode(&self, candidate: DateTime<Utc>) -> bool {
        self.last_new_episode.is_none_or(|current| candidate > current)
    }
}
