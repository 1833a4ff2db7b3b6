//! `list [--all] [--limit N]` (§6): podcasts with per-stage episode counts.

use color_eyre::eyre::Result;
use colored::Colorize;
use pod_util::truncate;

use super::get_database;

const DEFAULT_LIMIT: i64 = 20;

pub async fn run(all: bool, limit: Option<i64>) -> Result<()> {
    let db = get_database().await?;
    let podcasts = db.podcasts().list(if all { None } else { Some(limit.unwrap_or(DEFAULT_LIMIT)) }).await?;

    if podcasts.is_empty() {
        println!("{}", "no podcasts yet — try `add <feed_url>` or `import-opml <path>`".yellow());
        return Ok(());
    }

    println!(
        "{:<40} {:<8} {:>10} {:>12} {:>8}",
        "Title".cyan().bold(),
        "Source".cyan().bold(),
        "Episodes".cyan().bold(),
        "Transcribed".cyan().bold(),
        "Indexed".cyan().bold(),
    );
    println!("{}", "-".repeat(84).dimmed());

    for podcast in &podcasts {
        let counts = db.episodes().stage_counts(Some(podcast.id)).await?;
        println!(
            "{:<40} {:<8} {:>10} {:>12} {:>8}",
            truncate(&podcast.title, 38),
            format!("{:?}", podcast.source_type),
            counts.total,
            counts.transcribed,
            counts.indexed,
        );
    }

    println!("{}", "-".repeat(84).dimmed());
    println!("{} {} podcast(s)", "total:".green().bold(), podcasts.len());
    Ok(())
}
