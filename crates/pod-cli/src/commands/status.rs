//! `status [--podcast-id <id>]` (§6): aggregate pipeline progress.

use color_eyre::eyre::{Result, bail};
use colored::Colorize;
use uuid::Uuid;

use super::get_database;

pub async fn run(podcast_id: Option<Uuid>) -> Result<()> {
    let db = get_database().await?;

    if let Some(id) = podcast_id {
        let Some(podcast) = db.podcasts().get_by_id(id).await? else {
            bail!("no podcast with id {id}");
        };
        print_counts(&podcast.title, db.episodes().stage_counts(Some(id)).await?);
        return Ok(());
    }

    let counts = db.episodes().stage_counts(None).await?;
    print_counts("all podcasts", counts);

    let buffer = db.episodes().get_download_buffer_count().await?;
    println!("download buffer (completed, awaiting transcription): {}", buffer.to_string().cyan());

    Ok(())
}

fn print_counts(label: &str, counts: pod_db::StageCounts) {
    println!("{}", format!("=== {label} ===").cyan().bold());
    println!("total episodes:     {}", counts.total);
    println!("downloaded:         {}", counts.downloaded);
    println!("transcribed:        {}", counts.transcribed.to_string().green());
    if counts.transcript_dead > 0 {
        println!("permanently failed: {}", counts.transcript_dead.to_string().red());
    }
    println!("metadata complete:  {}", counts.metadata_done);
    println!("indexed:            {}", counts.indexed);
}
