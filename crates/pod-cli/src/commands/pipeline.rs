//! `pipeline` (§6, §4.H): runs the Orchestrator's main loop until
//! SIGINT/SIGTERM, then shuts down gracefully and prints final stats.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use color_eyre::eyre::Result;
use colored::Colorize;
use pod_db::Database;
use pod_pipeline::stages::indexer::Indexer;
use pod_pipeline::stages::metadata::MetadataExtractor;
use pod_pipeline::stages::transcriber::Transcriber;
use pod_pipeline::{DigestWorker, Orchestrator, PipelineConfig};

use super::providers::{HttpAiMetadataProvider, WebhookMailSender};

const DEFAULT_CONFIG_PATH: &str = "config/pipeline.yaml";

pub async fn run() -> Result<()> {
    let config = PipelineConfig::load_for_subcommand(&PathBuf::from(DEFAULT_CONFIG_PATH))?;
    let db = Database::connect(config.database_url()).await?;

    let indexer = Indexer::connect(&config.lancedb_path).await?;
    indexer.create_or_get_store().await?;

    let transcriber = Transcriber::new(config.transcriber_endpoint.clone());
    let Some(ai_endpoint) = config.ai_metadata_endpoint.clone() else {
        color_eyre::eyre::bail!(
            "PIPELINE_AI_METADATA_ENDPOINT (or --ai-metadata-endpoint) is required to run the pipeline"
        );
    };
    let extractor = MetadataExtractor::new(HttpAiMetadataProvider::new(ai_endpoint));
    let mailer = WebhookMailSender::new(config.mail_webhook_url.clone());
    let digest_worker = DigestWorker::new(db.clone(), Some(mailer), config.web_base_url.clone());

    let orchestrator = Arc::new(Orchestrator::new(
        db,
        config,
        transcriber,
        extractor,
        indexer,
        Some(digest_worker),
    ));

    println!("{}", "pipeline running — press Ctrl-C to stop".cyan().bold());
    let stats = orchestrator.stats();
    Arc::clone(&orchestrator).run().await;

    println!("{}", "pipeline stopped".green().bold());
    println!(
        "episodes transcribed: {}, permanent transcription failures: {}, sync runs: {}, digest runs: {}",
        stats.episodes_transcribed.load(Ordering::Relaxed),
        stats.transcription_permanent_failures.load(Ordering::Relaxed),
        stats.sync_runs.load(Ordering::Relaxed),
        stats.digest_runs.load(Ordering::Relaxed),
    );
    Ok(())
}
