//! `import-opml <path> [--dry-run] [--update-existing]` (§6).

use color_eyre::eyre::{Result, WrapErr};
use colored::Colorize;
use pod_core::{Podcast, SourceType};

use super::get_database;

pub async fn run(path: &str, dry_run: bool, update_existing: bool) -> Result<()> {
    let content = std::fs::read_to_string(path).wrap_err_with(|| format!("failed to read {path}"))?;
    let parsed = pod_feeds::import_opml(&content)?;

    println!(
        "{} outlines, {} feeds, {} skipped (no usable URL)",
        parsed.total_outlines.to_string().cyan(),
        parsed.feeds.len().to_string().cyan(),
        parsed.skipped_no_url.to_string().yellow()
    );

    if dry_run {
        for feed in &parsed.feeds {
            let category = feed.category.as_deref().map_or(String::new(), |c| format!(" [{c}]"));
            println!("  {}{}", feed.title.as_deref().unwrap_or(&feed.feed_url), category);
        }
        println!("{}", "dry run: no database writes".yellow());
        return Ok(());
    }

    let db = get_database().await?;
    let mut added = 0usize;
    let mut skipped = 0usize;
    let mut failed = 0usize;

    for feed in &parsed.feeds {
        match db.podcasts().get_by_feed_url(&feed.feed_url).await? {
            Some(existing) => {
                if update_existing {
                    let mut updated = existing;
                    if let Some(title) = &feed.title {
                        updated.title = title.clone();
                    }
                    if let Some(description) = &feed.description {
                        updated.description = Some(description.clone());
                    }
                    db.podcasts().update(&updated).await?;
                }
                skipped += 1;
            }
            None => {
                let title = feed.title.clone().unwrap_or_else(|| feed.feed_url.clone());
                let mut podcast = Podcast::new(SourceType::Rss, feed.feed_url.clone(), title);
                if let Some(description) = &feed.description {
                    podcast = podcast.with_description(description.clone());
                }
                match db.podcasts().create(&podcast).await {
                    Ok(()) => added += 1,
                    Err(e) => {
                        tracing::warn!(feed_url = %feed.feed_url, "failed to import feed: {e}");
                        failed += 1;
                    }
                }
            }
        }
    }

    println!(
        "{} {} {} {} {} {}",
        "added:".green(),
        added,
        "skipped:".dimmed(),
        skipped,
        "failed:".red(),
        failed
    );
    Ok(())
}
