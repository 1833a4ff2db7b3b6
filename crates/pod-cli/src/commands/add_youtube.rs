//! `add-youtube <channel_id>` (§6, §4.B): registers a YouTube channel as
//! a podcast and pulls its recent uploads, or reports it's already
//! subscribed.

use color_eyre::eyre::{Result, WrapErr};
use colored::Colorize;
use pod_pipeline::stages::sync::SyncWorker;

use super::get_database;

pub async fn run(channel_id: &str, max_videos: usize) -> Result<()> {
    let db = get_database().await?;
    let api_key = std::env::var("PIPELINE_YOUTUBE_API_KEY")
        .wrap_err("PIPELINE_YOUTUBE_API_KEY is not set")?;
    let worker = SyncWorker::new(db, Some(api_key));

    let (podcast, created, result) = worker.add_youtube_channel(channel_id, max_videos).await?;
    if created {
        println!(
            "{} {} ({}): {} new, {} skipped, {} failed",
            "added:".green().bold(),
            podcast.title,
            podcast.id,
            result.processed.to_string().green(),
            result.skipped,
            result.failed.to_string().red()
        );
    } else {
        println!("{} {} ({})", "already subscribed:".yellow(), podcast.title, podcast.id);
    }
    Ok(())
}
