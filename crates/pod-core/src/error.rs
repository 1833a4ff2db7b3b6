//! Core error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid slug: {0}")]
    InvalidSlug(String),

    #[error("invalid feed url: {0}")]
    InvalidFeedUrl(String),

    #[error("invalid stage: {0}")]
    InvalidStage(String),

    #[error("invalid digest hour: {0} (must be 0-23)")]
    InvalidDigestHour(i32),

    #[error("podcast not found: {0}")]
    PodcastNotFound(String),

    #[error("episode not found: {0}")]
    EpisodeNotFound(String),

    #[error("user not found: {0}")]
    UserNotFound(String),

    #[error("conversation not found: {0}")]
    ConversationNotFound(String),

    #[error("malformed ai metadata: {0}")]
    MalformedAiMetadata(String),
}
