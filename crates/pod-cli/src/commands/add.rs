//! `add <feed_url>` (§6): fetch a feed and create the podcast row, or
//! report that it already existed.

use color_eyre::eyre::Result;
use colored::Colorize;
use pod_pipeline::stages::sync::SyncWorker;

use super::get_database;

pub async fn run(feed_url: &str) -> Result<()> {
    let db = get_database().await?;
    let worker = SyncWorker::new(db, std::env::var("PIPELINE_YOUTUBE_API_KEY").ok());

    let (podcast, created) = worker.add_by_url(feed_url).await?;
    if created {
        println!("{} {} ({})", "added:".green().bold(), podcast.title, podcast.id);
    } else {
        println!("{} {} ({})", "already subscribed:".yellow(), podcast.title, podcast.id);
    }
    Ok(())
}
