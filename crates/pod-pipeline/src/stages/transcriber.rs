//! Transcriber (§4.D): audio → text via a long-lived model handle. The
//! model load/unload lifecycle is under the Orchestrator's control so a
//! GPU-resident model stays hot across many episodes; the specific model
//! is an external capability reached over HTTP, abstracted behind this
//! component so the pipeline never depends on a particular ASR vendor.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use pod_core::Episode;
use pod_db::Database;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

const DEFAULT_LANGUAGE: &str = "en";

/// One decoded speech segment returned by the transcription model.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TranscriptSegment {
    pub text: String,
}

#[derive(Debug, Deserialize)]
struct TranscribeResponse {
    segments: Vec<TranscriptSegment>,
}

/// Owns the long-lived model handle. `load_model`/`unload_model` are
/// idempotent and safe to call repeatedly; only the Orchestrator calls
/// them, once at startup and once at shutdown.
pub struct Transcriber {
    http: reqwest::Client,
    endpoint: Option<String>,
    language: String,
    loaded: AtomicBool,
}

impl Transcriber {
    #[must_use]
    pub fn new(endpoint: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint,
            language: DEFAULT_LANGUAGE.to_string(),
            loaded: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn with_language(mut self, language: String) -> Self {
        self.language = language;
        self
    }

    /// Loads the model handle. In this implementation the "handle" is a
    /// standing HTTP connection to the external transcription service;
    /// there is nothing to eagerly warm beyond marking the flag, since
    /// the actual model process lives out-of-tree.
    pub fn load_model(&self) {
        if !self.loaded.swap(true, Ordering::SeqCst) {
            tracing::info!("transcription model loaded");
        }
    }

    pub fn unload_model(&self) {
        if self.loaded.swap(false, Ordering::SeqCst) {
            tracing::info!("transcription model unloaded");
        }
    }

    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }

    /// Transcribes one episode's audio, or returns `None` if the model
    /// declines (caller treats `None` as a transient failure to retry).
    ///
    /// Idempotent: if `transcript_text` is already set, returns it
    /// without re-invoking the model; if a legacy `<basename>_transcription.txt`
    /// sidecar exists next to the audio, reads and returns that instead.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::AudioNotFound` if `local_file_path` is
    /// absent or unreadable, or a transport error from the model call.
    pub async fn transcribe_single(
        &self,
        episode: &Episode,
    ) -> Result<Option<String>, PipelineError> {
        if let Some(existing) = &episode.transcript_text {
            if !existing.is_empty() {
                return Ok(Some(existing.clone()));
            }
        }

        let Some(local_path) = &episode.local_file_path else {
            return Err(PipelineError::AudioNotFound(episode.id.to_string()));
        };

        if let Some(legacy) = read_legacy_transcript(local_path).await {
            return Ok(Some(legacy));
        }

        if tokio::fs::metadata(local_path).await.is_err() {
            return Err(PipelineError::AudioNotFound(local_path.clone()));
        }

        let Some(endpoint) = &self.endpoint else {
            return Ok(None);
        };

        let bytes = tokio::fs::read(local_path).await?;
        let response = self
            .http
            .post(endpoint)
            .query(&[("language", self.language.as_str())])
            .body(bytes)
            .send()
            .await?;

        if !response.status().is_success() {
            return Ok(None);
        }

        let parsed: TranscribeResponse = response.json().await?;
        let text = parsed
            .segments
            .iter()
            .map(|s| s.text.trim())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        if text.is_empty() { Ok(None) } else { Ok(Some(text)) }
    }
}

/// Reads the legacy sidecar transcript file, if present (§10.6
/// supplemented behavior, Invariant 2).
async fn read_legacy_transcript(local_file_path: &str) -> Option<String> {
    let sidecar = legacy_sidecar_path(local_file_path);
    tokio::fs::read_to_string(sidecar)
        .await
        .ok()
        .filter(|s| !s.is_empty())
}

fn legacy_sidecar_path(local_file_path: &str) -> std::path::PathBuf {
    let path = Path::new(local_file_path);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    path.with_file_name(format!("{stem}_transcription.txt"))
}

/// YouTube-captions fast path (§4.D): for episodes with captions
/// available, short-circuits both the download and transcript stages in
/// a single repository call rather than going through `Transcriber`.
pub struct YouTubeCaptionsWorker {
    http: reqwest::Client,
}

impl Default for YouTubeCaptionsWorker {
    fn default() -> Self {
        Self::new()
    }
}

impl YouTubeCaptionsWorker {
    #[must_use]
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }

    /// Downloads the caption track and, on success, marks both download
    /// and transcript complete via `mark_captions_complete`. Returns
    /// `Ok(false)` (a caller-visible fallback trigger to audio
    /// extraction, §9 Open Question) if the caption track turns out to
    /// be unavailable despite the discovery-time flag.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError` on transport or database failure.
    pub async fn try_captions(
        &self,
        db: &Database,
        episode_id: uuid::Uuid,
        caption_track_url: &str,
    ) -> Result<bool, PipelineError> {
        let response = self.http.get(caption_track_url).send().await?;
        if !response.status().is_success() {
            return Ok(false);
        }
        let raw = response.text().await?;
        let text = strip_caption_markup(&raw);
        if text.is_empty() {
            return Ok(false);
        }

        db.episodes().mark_captions_complete(episode_id, &text).await?;
        Ok(true)
    }
}

/// Strips WebVTT/SRT cue markers and timestamps, leaving plain spoken
/// text concatenated with single spaces.
fn strip_caption_markup(raw: &str) -> String {
    raw.lines()
        .filter(|line| {
            let trimmed = line.trim();
            !trimmed.is_empty()
                && trimmed != "WEBVTT"
                && !trimmed.contains("-->")
                && trimmed.parse::<u64>().is_err()
        })
        .map(str::trim)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_sidecar_path_matches_basename_convention() {
        let sidecar = legacy_sidecar_path("/audio/pod/ep1.mp3");
        assert_eq!(
            sidecar,
            std::path::PathBuf::from("/audio/pod/ep1_transcription.txt")
        );
    }

    #[test]
    fn strips_vtt_markup() {
        let vtt = "WEBVTT\n\n00:00:01.000 --> 00:00:02.000\nHello there\n\n2\nHow are you";
        assert_eq!(strip_caption_markup(vtt), "Hello there How are you");
    }

    #[test]
    fn load_unload_round_trip() {
        let t = Transcriber::new(None);
        assert!(!t.is_loaded());
        t.load_model();
        assert!(t.is_loaded());
        t.unload_model();
        assert!(!t.is_loaded());
    }
}
