//! Conversation and chat message models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR", rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Conversation {
    pub id: Uuid,
    pub user_id: Uuid,
    pub podcast_id: Option<Uuid>,
    pub episode_id: Option<Uuid>,
    pub title: Option<String>,
    pub message_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    #[must_use]
    pub fn new(user_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            user_id,
            podcast_id: None,
            episode_id: None,
            title: None,
            message_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[must_use]
    pub const fn scoped_to_podcast(mut self, podcast_id: Uuid) -> Self {
        self.podcast_id = Some(podcast_id);
        self
    }

    #[must_use]
    pub const fn scoped_to_episode(mut self, podcast_id: Uuid, episode_id: Uuid) -> Self {
        self.podcast_id = Some(podcast_id);
        self.episode_id = Some(episode_id);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ChatMessage {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub role: ChatRole,
    pub content: String,
    #[sqlx(json)]
    pub citations: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    #[must_use]
    pub fn new(conversation_id: Uuid, role: ChatRole, content: String) -> Self {
        Self {
            id: Uuid::now_v7(),
            conversation_id,
            role,
            content,
            citations: serde_json::Value::Array(Vec::new()),
            created_at: Utc::now(),
        }
    }
}
