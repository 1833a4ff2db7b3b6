//! Downloader (§4.C): a bounded worker pool that streams episode audio to
//! disk with retry, hashing, and resume-clean semantics.

use backon::{ExponentialBuilder, Retryable};
use futures::stream::{self, StreamExt};
use pod_core::Episode;
use pod_db::Database;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;

use crate::error::{PipelineError, WorkerResult};

const USER_AGENT: &str = "podcast-pipeline/0.1 (+https://example.invalid/bot)";
const RETRYABLE_STATUS: &[u16] = &[429, 500, 502, 503, 504];

/// Outcome of downloading a single episode's audio (§4.C contract).
#[derive(Debug, Clone)]
pub struct DownloadOutcome {
    pub local_path: PathBuf,
    pub file_size: u64,
    pub file_hash: String,
}

/// Concurrent HTTP audio fetcher. One instance is shared across a batch;
/// `download_pending` dispatches up to `workers` concurrent requests.
pub struct Downloader {
    client: reqwest::Client,
    db: Database,
    audio_dir: PathBuf,
    workers: usize,
}

impl Downloader {
    #[must_use]
    pub fn new(db: Database, audio_dir: PathBuf, workers: usize) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_default();
        Self {
            client,
            db,
            audio_dir,
            workers: workers.max(1),
        }
    }

    /// Pulls up to `limit` pending episodes and dispatches them to the
    /// worker pool, returning the aggregated result.
    #[must_use = "inspect processed/failed counts"]
    pub async fn download_pending(&self, limit: i64) -> WorkerResult {
        let episodes = match self.db.episodes().get_episodes_pending_download(limit).await {
            Ok(eps) => eps,
            Err(e) => {
                return WorkerResult {
                    failed: 1,
                    errors: vec![e.to_string()],
                    ..WorkerResult::default()
                };
            }
        };

        let workers = self.workers;
        let results: Vec<WorkerResult> = stream::iter(episodes)
            .map(|episode| async move { self.download_and_record(&episode).await })
            .buffer_unordered(workers)
            .collect()
            .await;

        results
            .into_iter()
            .fold(WorkerResult::default(), WorkerResult::merge)
    }

    async fn download_and_record(&self, episode: &Episode) -> WorkerResult {
        if let Err(e) = self.db.episodes().mark_download_started(episode.id).await {
            return WorkerResult {
                failed: 1,
                errors: vec![e.to_string()],
                ..WorkerResult::default()
            };
        }

        match self.download(episode).await {
            Ok(outcome) => {
                let local_path = outcome.local_path.to_string_lossy().to_string();
                #[allow(clippy::cast_possible_wrap)]
                let size = outcome.file_size as i64;
                if let Err(e) = self
                    .db
                    .episodes()
                    .mark_download_complete(episode.id, &local_path, size, &outcome.file_hash)
                    .await
                {
                    return WorkerResult {
                        failed: 1,
                        errors: vec![e.to_string()],
                        ..WorkerResult::default()
                    };
                }
                WorkerResult {
                    processed: 1,
                    ..WorkerResult::default()
                }
            }
            Err(e) => {
                let _ = self
                    .db
                    .episodes()
                    .mark_download_failed(episode.id, &e.to_string())
                    .await;
                WorkerResult {
                    failed: 1,
                    errors: vec![e.to_string()],
                    ..WorkerResult::default()
                }
            }
        }
    }

    /// Downloads one episode's enclosure, streaming GET with retry on
    /// transient statuses, redirect-follow (the default `reqwest::Client`
    /// behavior), and a `User-Agent` identifying this system.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError` if every retry attempt fails; any partial
    /// file written during a failed attempt is deleted before returning.
    pub async fn download(&self, episode: &Episode) -> Result<DownloadOutcome, PipelineError> {
        let podcast_title = self
            .db
            .podcasts()
            .get_by_id(episode.podcast_id)
            .await?
            .map_or_else(|| episode.podcast_id.to_string(), |p| p.title);
        let podcast_dir = self
            .audio_dir
            .join(pod_util::sanitize_filename(&podcast_title));

        let attempt = || async { self.attempt_download(episode, &podcast_dir).await };

        attempt
            .retry(
                ExponentialBuilder::default()
                    .with_max_times(3)
                    .with_min_delay(Duration::from_secs(1))
                    .with_max_delay(Duration::from_secs(30)),
            )
            .when(is_retryable)
            .notify(|err, dur| {
                tracing::warn!(episode_id = %episode.id, ?dur, "download retrying: {err}");
            })
            .await
    }

    async fn attempt_download(
        &self,
        episode: &Episode,
        podcast_dir: &Path,
    ) -> Result<DownloadOutcome, PipelineError> {
        let response = self.client.get(&episode.enclosure_url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::Configuration(format!(
                "HTTP {status}: {}",
                episode.enclosure_url
            )));
        }

        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let extension = extension_for(&episode.enclosure_url, content_type.as_deref());
        let filename = build_filename(episode, extension);
        let output_path = podcast_dir.join(&filename);

        tokio::fs::create_dir_all(podcast_dir).await?;

        let write_result = stream_to_file(response, &output_path).await;
        match write_result {
            Ok((size, hash)) => Ok(DownloadOutcome {
                local_path: output_path,
                file_size: size,
                file_hash: hash,
            }),
            Err(e) => {
                let _ = tokio::fs::remove_file(&output_path).await;
                Err(e)
            }
        }
    }

    /// Deletes local audio for every episode whose post-processing chain
    /// has completed, then clears `local_file_path` (§4.C cleanup
    /// operation).
    #[must_use = "inspect processed/failed counts"]
    pub async fn cleanup_processed_episodes(&self, limit: i64) -> WorkerResult {
        let episodes = match self.db.episodes().get_episodes_ready_for_cleanup(limit).await {
            Ok(eps) => eps,
            Err(e) => {
                return WorkerResult {
                    failed: 1,
                    errors: vec![e.to_string()],
                    ..WorkerResult::default()
                };
            }
        };

        let mut result = WorkerResult::default();
        for episode in episodes {
            if let Some(path) = &episode.local_file_path {
                if let Err(e) = tokio::fs::remove_file(path).await {
                    if e.kind() != std::io::ErrorKind::NotFound {
                        result.failed += 1;
                        result.errors.push(e.to_string());
                        continue;
                    }
                }
            }
            match self.db.episodes().mark_audio_cleaned_up(episode.id).await {
                Ok(()) => result.processed += 1,
                Err(e) => {
                    result.failed += 1;
                    result.errors.push(e.to_string());
                }
            }
        }
        result
    }
}

async fn stream_to_file(
    response: reqwest::Response,
    output_path: &Path,
) -> Result<(u64, String), PipelineError> {
    let mut file = tokio::fs::File::create(output_path).await?;
    let mut hasher = Sha256::new();
    let mut total: u64 = 0;
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        hasher.update(&chunk);
        total += chunk.len() as u64;
        file.write_all(&chunk).await?;
    }
    file.flush().await?;

    Ok((total, format!("{:x}", hasher.finalize())))
}

fn is_retryable(err: &PipelineError) -> bool {
    match err {
        PipelineError::Http(e) => e
            .status()
            .is_some_and(|s| RETRYABLE_STATUS.contains(&s.as_u16()))
            || e.is_timeout()
            || e.is_connect(),
        PipelineError::Configuration(msg) => RETRYABLE_STATUS
            .iter()
            .any(|code| msg.contains(&format!("HTTP {code}"))),
        _ => false,
    }
}

/// Extension derived from the URL's path first, falling back to the
/// response MIME type, then a hardcoded default (§4.C).
fn extension_for(url: &str, mime: Option<&str>) -> &'static str {
    const KNOWN: &[&str] = &["mp3", "m4a", "mp4", "ogg", "opus", "wav", "aac"];
    if let Some(ext) = url
        .rsplit('/')
        .next()
        .and_then(|tail| tail.rsplit('.').next())
        .map(str::to_ascii_lowercase)
    {
        if let Some(found) = KNOWN.iter().find(|k| **k == ext) {
            return found;
        }
    }

    match mime {
        Some("audio/mpeg") => "mp3",
        Some("audio/mp4") => "m4a",
        Some("audio/x-m4a") => "m4a",
        Some("audio/ogg") => "ogg",
        Some("audio/opus") => "opus",
        Some("audio/wav" | "audio/x-wav") => "wav",
        _ => "mp3",
    }
}

/// `<sanitized_episode_title>[.ext]`, prefixed with `E<episode_number>_`
/// when present (§4.C).
fn build_filename(episode: &Episode, extension: &str) -> String {
    let base = pod_util::sanitize_filename(&episode.title);
    let base = if base.is_empty() {
        episode.id.to_string()
    } else {
        base
    };
    match episode.episode_number {
        Some(n) => format!("E{n}_{base}.{extension}"),
        None => format!("{base}.{extension}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_prefers_url_suffix() {
        assert_eq!(extension_for("https://cdn.example/ep1.m4a", Some("audio/mpeg")), "m4a");
    }

    #[test]
    fn extension_falls_back_to_mime() {
        assert_eq!(extension_for("https://cdn.example/ep1", Some("audio/ogg")), "ogg");
    }

    #[test]
    fn extension_defaults_to_mp3() {
        assert_eq!(extension_for("https://cdn.example/stream", None), "mp3");
        assert_eq!(
            extension_for("https://cdn.example/stream", Some("application/octet-stream")),
            "mp3"
        );
    }

    #[test]
    fn retryable_status_codes_trigger_retry() {
        let err = PipelineError::Configuration("HTTP 503: http://x".to_string());
        assert!(is_retryable(&err));
        let err = PipelineError::Configuration("HTTP 404: http://x".to_string());
        assert!(!is_retryable(&err));
    }
}
