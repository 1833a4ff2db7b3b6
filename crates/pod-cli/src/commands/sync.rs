//! `sync [--podcast-id <id>]` (§6): re-syncs one feed or every feed.

use color_eyre::eyre::{Result, bail};
use colored::Colorize;
use pod_pipeline::stages::sync::SyncWorker;
use uuid::Uuid;

use super::get_database;

pub async fn run(podcast_id: Option<Uuid>) -> Result<()> {
    let db = get_database().await?;
    let worker = SyncWorker::new(db.clone(), std::env::var("PIPELINE_YOUTUBE_API_KEY").ok());

    match podcast_id {
        Some(id) => {
            let Some(podcast) = db.podcasts().get_by_id(id).await? else {
                bail!("no podcast with id {id}");
            };
            let result = worker.sync_podcast(&podcast).await?;
            println!(
                "{}: {} new, {} skipped, {} failed",
                podcast.title.cyan(),
                result.processed.to_string().green(),
                result.skipped,
                result.failed.to_string().red()
            );
        }
        None => {
            let result = worker.sync_all().await;
            println!(
                "synced all podcasts: {} new, {} skipped, {} failed",
                result.processed.to_string().green(),
                result.skipped,
                result.failed.to_string().red()
            );
            for error in &result.errors {
                println!("  {} {error}", "error:".red());
            }
        }
    }
    Ok(())
}
