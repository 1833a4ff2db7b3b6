//! Error taxonomy for the chat retrieval tool surface.

use pod_db::DbError;
use pod_pipeline::PipelineError;

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("database error: {0}")]
    Db(#[from] DbError),
    #[error("document store error: {0}")]
    Store(#[from] PipelineError),
    #[error("episode not found: {0}")]
    EpisodeNotFound(uuid::Uuid),
    #[error("podcast not found: {0}")]
    PodcastNotFound(uuid::Uuid),
}
