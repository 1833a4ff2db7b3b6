//! Pipeline error types.
//!
//! Every stage resolves its own failures to one of these variants and a
//! `mark_<stage>_failed`/`mark_permanently_failed` Repository call; a
//! `PipelineError` is never allowed to unwind past a stage boundary
//! inside the Orchestrator or `PostProcessor` (§7, §10.3).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("database error: {0}")]
    Db(#[from] pod_db::DbError),

    #[error("feed error: {0}")]
    Feed(#[from] pod_feeds::FeedError),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("audio file not found: {0}")]
    AudioNotFound(String),

    #[error("transcript missing for episode {0}")]
    TranscriptMissing(String),

    #[error("rate limit exhausted after {0} attempts")]
    RateLimitExhausted(u32),

    #[error("malformed AI metadata response: {0}")]
    MalformedAiResponse(String),

    #[error("index upload timed out after {0:?}")]
    IndexUploadTimeout(std::time::Duration),

    #[error("index operation failed: {0}")]
    IndexOperationFailed(String),

    #[error("invalid configuration: {0}")]
    Configuration(String),
}

/// Tagged outcome of one episode's pass through a stage (§9 Design Notes:
/// "exception-for-control-flow → tagged result"). Orchestrator and
/// `PostProcessor` decisions read these tags instead of catching panics
/// or broad error types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpisodeOutcome {
    Success,
    TransientFailure,
    PermanentFailure,
}

/// Aggregate result of a batch worker operation (download batch, sync
/// batch, …): `processed` succeeded, `failed` errored, `skipped` were
/// not attempted (e.g. precondition no longer holds by the time the
/// worker reached them).
#[derive(Debug, Clone, Default)]
pub struct WorkerResult {
    pub processed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub errors: Vec<String>,
}

impl WorkerResult {
    #[must_use]
    pub fn merge(mut self, other: Self) -> Self {
        self.processed += other.processed;
        self.failed += other.failed;
        self.skipped += other.skipped;
        self.errors.extend(other.errors);
        self
    }
}
