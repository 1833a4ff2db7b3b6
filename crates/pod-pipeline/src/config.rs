//! Runtime configuration for the ingestion pipeline.
//!
//! Uses figment2 for layered config with precedence:
//! `defaults → config file → env vars → CLI args`, following the same
//! shape the base workspace's own pipeline config uses, generalized to
//! the env var table in §6 with a `PIPELINE_` prefix.

use clap::{CommandFactory, Parser, error::ErrorKind};
use figment2::{
    Figment,
    providers::{Env, Format, Serialized, Yaml},
};
use serde::{Deserialize, Serialize};
use serde_inline_default::serde_inline_default;
use std::path::{Path, PathBuf};

use crate::error::PipelineError;

/// Pipeline configuration: concurrency, buffering, and retry knobs for
/// the Orchestrator and its worker pools (§6).
///
/// Precedence: defaults < config file < env vars < CLI args.
#[serde_inline_default]
#[derive(Parser, Debug, Clone, Serialize, Deserialize)]
#[command(author, version, about = "Podcast/YouTube ingestion pipeline")]
pub struct PipelineConfig {
    /// Path to an optional YAML config file.
    #[arg(short, long, default_value = "config/pipeline.yaml")]
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Database URL (Postgres).
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Base directory under which podcast audio subdirectories live.
    #[arg(long, env = "PIPELINE_AUDIO_DIR")]
    #[serde_inline_default(PathBuf::from("./audio"))]
    pub audio_dir: PathBuf,

    /// `LanceDB` path backing the Indexer's document store.
    #[arg(long, env = "PIPELINE_LANCEDB_PATH")]
    #[serde_inline_default(String::from("./data/lancedb"))]
    pub lancedb_path: String,

    /// Display name of the indexer's single document store.
    #[arg(long, env = "PIPELINE_STORE_DISPLAY_NAME")]
    #[serde_inline_default(String::from("podcast-transcripts"))]
    pub store_display_name: String,

    /// How often the orchestrator re-syncs subscribed feeds.
    #[arg(long, env = "PIPELINE_SYNC_INTERVAL_SECONDS")]
    #[serde_inline_default(900)]
    pub sync_interval_seconds: u64,

    /// Target size of the download buffer (episodes downloaded, awaiting
    /// transcription).
    #[arg(long, env = "PIPELINE_DOWNLOAD_BUFFER_SIZE")]
    #[serde_inline_default(10)]
    pub download_buffer_size: u32,

    /// Refill the buffer once its count drops below this threshold.
    #[arg(long, env = "PIPELINE_DOWNLOAD_BUFFER_THRESHOLD")]
    #[serde_inline_default(5)]
    pub download_buffer_threshold: u32,

    /// Episodes fetched per download batch.
    #[arg(long, env = "PIPELINE_DOWNLOAD_BATCH_SIZE")]
    #[serde_inline_default(10)]
    pub download_batch_size: u32,

    /// Concurrent download workers.
    #[arg(long, env = "PIPELINE_DOWNLOAD_WORKERS")]
    #[serde_inline_default(5)]
    pub download_workers: usize,

    /// `PostProcessor` thread pool size; 0 disables async post-processing
    /// and falls back to `process_one_sync`.
    #[arg(long, env = "PIPELINE_POST_PROCESSING_WORKERS")]
    #[serde_inline_default(4)]
    pub post_processing_workers: usize,

    /// How long the main loop sleeps when there is no pending
    /// transcription and no post-processing chain to help finish.
    #[arg(long, env = "PIPELINE_IDLE_WAIT_SECONDS")]
    #[serde_inline_default(10)]
    pub idle_wait_seconds: u64,

    /// Retry budget shared by every stage before a `permanently_failed`
    /// transition.
    #[arg(long, env = "PIPELINE_MAX_RETRIES")]
    #[serde_inline_default(3)]
    pub max_retries: i32,

    /// HTTP endpoint of the external transcription model (§4.D). Unset
    /// means transcription always declines, which the orchestrator
    /// treats as a transient failure to retry.
    #[arg(long, env = "PIPELINE_TRANSCRIBER_ENDPOINT")]
    pub transcriber_endpoint: Option<String>,

    /// HTTP endpoint of the external grounded-generation metadata
    /// provider (§4.E). Required for the `MetadataExtractor`'s AI call.
    #[arg(long, env = "PIPELINE_AI_METADATA_ENDPOINT")]
    pub ai_metadata_endpoint: Option<String>,

    /// Outbound webhook the digest worker posts rendered emails to
    /// (§1: mail transport is a collaborator out of scope). Unset means
    /// digests compute and mark sent but are never transmitted (§7).
    #[arg(long, env = "PIPELINE_MAIL_WEBHOOK_URL")]
    pub mail_webhook_url: Option<String>,

    /// Base URL used to build episode links in digest emails; falls
    /// back to the sanitized enclosure URL when unset (§6).
    #[arg(long, env = "PIPELINE_WEB_BASE_URL")]
    pub web_base_url: Option<String>,

    /// YouTube Data API key, required only when syncing YouTube-sourced
    /// podcasts (§4.B).
    #[arg(long, env = "PIPELINE_YOUTUBE_API_KEY")]
    pub youtube_api_key: Option<String>,
}

impl PipelineConfig {
    /// Loads config with layered precedence: defaults < YAML file < env
    /// vars < CLI args.
    ///
    /// # Errors
    ///
    /// Returns an error if config parsing fails or cross-field
    /// validation fails.
    pub fn load() -> color_eyre::Result<Self> {
        let cli = Self::parse();
        let config: Self = Figment::new()
            .merge(Yaml::file(&cli.config_path))
            .merge(Env::prefixed("PIPELINE_"))
            .merge(Serialized::defaults(cli))
            .extract()?;

        if let Err(e) = config.validate() {
            Self::command()
                .error(ErrorKind::ValueValidation, e.to_string())
                .exit();
        }
        Ok(config)
    }

    /// Loads from a specific path (daemon command, tests).
    ///
    /// # Errors
    ///
    /// Returns an error if config parsing or validation fails.
    pub fn load_from(config_path: &Path) -> color_eyre::Result<Self> {
        let config: Self = Figment::new()
            .merge(Yaml::file(config_path))
            .merge(Env::prefixed("PIPELINE_"))
            .extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Loads config the same way as [`Self::load_from`] but without
    /// invoking `clap::Parser::parse()` — safe to call from inside a
    /// larger CLI's subcommand handler, where the process argv belongs
    /// to that outer parser rather than to `PipelineConfig` itself.
    /// `DATABASE_URL` is read directly since it intentionally has no
    /// `PIPELINE_` prefix.
    ///
    /// # Errors
    ///
    /// Returns an error if config parsing or validation fails.
    pub fn load_for_subcommand(config_path: &Path) -> color_eyre::Result<Self> {
        let config: Self = Figment::new()
            .merge(Yaml::file(config_path))
            .merge(Env::prefixed("PIPELINE_"))
            .merge(Serialized::default("database_url", std::env::var("DATABASE_URL").ok()))
            .extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Cross-field and lower-bound validation (§6: "all integer keys
    /// validated ≥ their lower bounds"; "`threshold < buffer_size`").
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Configuration` on the first violated rule.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.database_url.is_none() {
            return Err(PipelineError::Configuration(
                "database_url is required (DATABASE_URL env, --database-url, or config file)"
                    .to_string(),
            ));
        }
        if self.download_buffer_threshold >= self.download_buffer_size {
            return Err(PipelineError::Configuration(format!(
                "download_buffer_threshold ({}) must be < download_buffer_size ({})",
                self.download_buffer_threshold, self.download_buffer_size
            )));
        }
        if self.sync_interval_seconds == 0 {
            return Err(PipelineError::Configuration(
                "sync_interval_seconds must be >= 1".to_string(),
            ));
        }
        if self.download_batch_size == 0 {
            return Err(PipelineError::Configuration(
                "download_batch_size must be >= 1".to_string(),
            ));
        }
        if self.download_workers == 0 {
            return Err(PipelineError::Configuration(
                "download_workers must be >= 1".to_string(),
            ));
        }
        if self.idle_wait_seconds == 0 {
            return Err(PipelineError::Configuration(
                "idle_wait_seconds must be >= 1".to_string(),
            ));
        }
        if self.max_retries < 1 {
            return Err(PipelineError::Configuration(
                "max_retries must be >= 1".to_string(),
            ));
        }
        Ok(())
    }

    /// # Panics
    ///
    /// Panics if `database_url` was not configured; `validate` is
    /// expected to have already rejected that case at load time.
    #[must_use]
    #[expect(clippy::missing_panics_doc)]
    pub fn database_url(&self) -> &str {
        self.database_url
            .as_deref()
            .expect("database_url missing despite passing validate()")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> PipelineConfig {
        PipelineConfig {
            config_path: PathBuf::new(),
            database_url: Some("postgres://localhost/test".to_string()),
            audio_dir: PathBuf::from("./audio"),
            lancedb_path: "./data/lancedb".to_string(),
            store_display_name: "podcast-transcripts".to_string(),
            sync_interval_seconds: 900,
            download_buffer_size: 10,
            download_buffer_threshold: 5,
            download_batch_size: 10,
            download_workers: 5,
            post_processing_workers: 4,
            idle_wait_seconds: 10,
            max_retries: 3,
            transcriber_endpoint: None,
            ai_metadata_endpoint: None,
            mail_webhook_url: None,
            web_base_url: None,
            youtube_api_key: None,
        }
    }

    #[test]
    fn default_config_validates() {
        assert!(base().validate().is_ok());
    }

    #[test]
    fn threshold_must_be_below_buffer_size() {
        let mut cfg = base();
        cfg.download_buffer_threshold = 10;
        cfg.download_buffer_size = 10;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn missing_database_url_is_rejected() {
        let mut cfg = base();
        cfg.database_url = None;
        assert!(cfg.validate().is_err());
    }
}
