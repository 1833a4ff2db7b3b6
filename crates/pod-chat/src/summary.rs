//! Safe-field projections of `Podcast`/`Episode` for the direct-read
//! tools (§4.I: `get_podcast_info`, `get_episode_info`,
//! `get_user_subscriptions`). Deliberately excludes internal pipeline
//! state (retry counts, error strings, local file paths).

use chrono::{DateTime, Utc};
use pod_core::{Episode, Podcast};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct PodcastSummary {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub author: Option<String>,
    pub image_url: Option<String>,
    pub language: Option<String>,
}

impl From<&Podcast> for PodcastSummary {
    fn from(podcast: &Podcast) -> Self {
        Self {
            id: podcast.id,
            title: podcast.title.clone(),
            description: podcast.description.clone(),
            author: podcast.author.clone(),
            image_url: podcast.image_url.clone(),
            language: podcast.language.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EpisodeSummary {
    pub id: Uuid,
    pub podcast_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub published_date: DateTime<Utc>,
    pub duration_seconds: Option<i32>,
    pub summary: Option<String>,
    pub keywords: Vec<String>,
    pub hosts: Vec<String>,
    pub guests: Vec<String>,
}

impl From<&Episode> for EpisodeSummary {
    fn from(episode: &Episode) -> Self {
        Self {
            id: episode.id,
            podcast_id: episode.podcast_id,
            title: episode.title.clone(),
            description: episode.description.clone(),
            published_date: episode.published_date,
            duration_seconds: episode.duration_seconds,
            summary: episode.ai_summary.clone(),
            keywords: episode.ai_keywords.clone(),
            hosts: episode.ai_hosts.clone(),
            guests: episode.ai_guests.clone(),
        }
    }
}
