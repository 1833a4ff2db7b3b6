//! `cleanup [--dry-run] [--limit N]` (§6, §4.C): deletes local audio for
//! episodes that finished the whole post-processing chain.

use color_eyre::eyre::Result;
use colored::Colorize;
use pod_pipeline::stages::download::Downloader;
use std::path::PathBuf;

use super::get_database;

const DEFAULT_LIMIT: i64 = 50;

pub async fn run(dry_run: bool, limit: Option<i64>) -> Result<()> {
    let db = get_database().await?;
    let limit = limit.unwrap_or(DEFAULT_LIMIT);

    if dry_run {
        let ready = db.episodes().get_episodes_ready_for_cleanup(limit).await?;
        println!("{} episode(s) would have their local audio cleaned up:", ready.len().to_string().cyan());
        for episode in &ready {
            println!("  {} ({})", episode.title, episode.local_file_path.as_deref().unwrap_or("-"));
        }
        return Ok(());
    }

    let audio_dir = std::env::var("PIPELINE_AUDIO_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("./audio"));
    let downloader = Downloader::new(db, audio_dir, 1);
    let result = downloader.cleanup_processed_episodes(limit).await;

    println!(
        "cleaned up {} episode(s), {} failed",
        result.processed.to_string().green(),
        result.failed.to_string().red()
    );
    Ok(())
}
