//! Podcast ingestion pipeline: the six-stage episode lifecycle (feed sync,
//! audio download, transcription, metadata extraction, semantic indexing,
//! cleanup) plus the single-writer Orchestrator that drives it and the
//! timezone-aware daily email digest.

pub mod config;
pub mod digest;
pub mod document_store;
pub mod error;
pub mod orchestrator;
pub mod stages;

pub use config::PipelineConfig;
pub use digest::{DigestWorker, MailSender};
pub use document_store::{DocumentStore, RetrievedChunk};
pub use error::{EpisodeOutcome, PipelineError, WorkerResult};
pub use orchestrator::{Orchestrator, OrchestratorStats};
