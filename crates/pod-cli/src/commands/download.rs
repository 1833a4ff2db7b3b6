//! `download [--limit N] [--concurrent N] [--async]` (§6, §4.C).

use color_eyre::eyre::Result;
use colored::Colorize;
use pod_pipeline::stages::download::Downloader;
use std::path::PathBuf;

use super::get_database;

const DEFAULT_LIMIT: i64 = 10;
const DEFAULT_CONCURRENCY: usize = 10;

pub async fn run(limit: Option<i64>, concurrent: Option<usize>, r#async: bool) -> Result<()> {
    let db = get_database().await?;
    let audio_dir = std::env::var("PIPELINE_AUDIO_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("./audio"));
    let limit = limit.unwrap_or(DEFAULT_LIMIT);
    let workers = concurrent.unwrap_or(DEFAULT_CONCURRENCY);
    let downloader = Downloader::new(db, audio_dir, workers);

    if r#async {
        tokio::spawn(async move {
            let result = downloader.download_pending(limit).await;
            tracing::info!(
                processed = result.processed,
                failed = result.failed,
                "background download batch complete"
            );
        });
        println!("{}", "dispatched download batch in the background".cyan());
        return Ok(());
    }

    let result = downloader.download_pending(limit).await;
    println!(
        "downloaded {} episode(s), {} failed, {} skipped",
        result.processed.to_string().green(),
        result.failed.to_string().red(),
        result.skipped
    );
    for error in &result.errors {
        println!("  {} {error}", "error:".red());
    }
    Ok(())
}
