//! MetadataExtractor (§4.E): merges feed metadata, ID3 tags, and
//! AI-derived fields by priority `feed > MP3 tags > AI`, rate-limiting
//! the AI call and validating its response against the closed
//! `EmailContent` schema before it ever reaches the Repository.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use chrono::{NaiveDate, Utc};
use pod_core::{EmailContent, PodcastType, StorySummary};
use pod_db::MetadataPayload;
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::error::PipelineError;

const RATE_LIMIT_REQUESTS: usize = 9;
const RATE_LIMIT_WINDOW: Duration = Duration::from_secs(60);
const MAX_RETRY_ATTEMPTS: u32 = 5;
const MAX_BACKOFF: Duration = Duration::from_secs(32);
const MIN_VALID_YEAR: i32 = 2000;
const MIN_SUMMARY_CHARS: usize = 100;
const MIN_KEYWORDS: usize = 5;
const MAX_KEYWORDS: usize = 10;

/// Raw shape the AI provider is expected to return; validated into
/// [`EmailContent`]/[`AiFields`] before use (§4.E point 3).
#[derive(Debug, Deserialize)]
pub struct AiMetadataResponse {
    pub summary: String,
    pub keywords: Vec<String>,
    pub hosts: Vec<String>,
    #[serde(default)]
    pub co_hosts: Vec<String>,
    #[serde(default)]
    pub guests: Vec<String>,
    #[serde(default)]
    pub episode_number: Option<i32>,
    #[serde(default)]
    pub date: Option<String>,
    pub email_content: RawEmailContent,
}

#[derive(Debug, Deserialize)]
pub struct RawEmailContent {
    pub podcast_type: String,
    pub teaser_summary: String,
    pub key_takeaways: Vec<String>,
    #[serde(default)]
    pub highlight_moment: Option<String>,
    #[serde(default)]
    pub story_summaries: Vec<StorySummary>,
}

/// A token-bucket rate limiter: `RATE_LIMIT_REQUESTS` permits refilled
/// every `RATE_LIMIT_WINDOW`.
pub struct RateLimiter {
    window: Duration,
    max_requests: usize,
    timestamps: Mutex<VecDeque<Instant>>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RATE_LIMIT_REQUESTS, RATE_LIMIT_WINDOW)
    }
}

impl RateLimiter {
    #[must_use]
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            window,
            max_requests,
            timestamps: Mutex::new(VecDeque::with_capacity(max_requests)),
        }
    }

    /// Blocks until a request slot is free, then reserves it.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut timestamps = self.timestamps.lock().await;
                let now = Instant::now();
                while timestamps.front().is_some_and(|t| now.duration_since(*t) >= self.window) {
                    timestamps.pop_front();
                }
                if timestamps.len() < self.max_requests {
                    timestamps.push_back(now);
                    None
                } else {
                    timestamps.front().map(|oldest| self.window - now.duration_since(*oldest))
                }
            };
            match wait {
                None => return,
                Some(delay) => tokio::time::sleep(delay).await,
            }
        }
    }
}

/// Feed-derived fields that take priority over MP3/AI in the merge.
#[derive(Debug, Clone, Default)]
pub struct FeedFields {
    pub title: Option<String>,
    pub description: Option<String>,
    pub published_date: Option<chrono::DateTime<Utc>>,
    pub duration_seconds: Option<i32>,
    pub episode_number: Option<i32>,
    pub season_number: Option<i32>,
}

/// ID3 tag fields read from the audio file, if still present on disk.
#[derive(Debug, Clone, Default)]
pub struct Id3Fields {
    pub artist: Option<String>,
    pub album: Option<String>,
}

/// Reads `mp3_artist`/`mp3_album` from the file's ID3 tag, if readable.
/// Returns defaults (not an error) when the file is missing or has no
/// tag — the merge treats MP3 fields as optional supplements.
#[must_use]
pub fn read_id3_tags(path: &std::path::Path) -> Id3Fields {
    match id3::Tag::read_from_path(path) {
        Ok(tag) => Id3Fields {
            artist: tag.artist().map(str::to_string),
            album: tag.album().map(str::to_string),
        },
        Err(_) => Id3Fields::default(),
    }
}

/// Anything able to produce AI-derived episode metadata from a
/// transcript. Abstracted so the pipeline never depends on a specific
/// grounded-generation vendor (§1 scope).
pub trait AiMetadataProvider: Send + Sync {
    /// # Errors
    ///
    /// Returns `PipelineError::Http` on transport failure (including
    /// HTTP 429, which the caller retries) or `PipelineError::MalformedAiResponse`
    /// if the response cannot be parsed.
    fn summarize(
        &self,
        transcript: &str,
        filename: &str,
    ) -> impl Future<Output = Result<AiMetadataResponse, PipelineError>> + Send;
}

/// Merges feed metadata, ID3 tags, and a rate-limited AI call into a
/// [`MetadataPayload`] ready for `EpisodeRepo::mark_metadata_complete`.
pub struct MetadataExtractor<P> {
    provider: P,
    limiter: RateLimiter,
}

impl<P: AiMetadataProvider> MetadataExtractor<P> {
    #[must_use]
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            limiter: RateLimiter::default(),
        }
    }

    /// Runs the full merge: calls the AI provider (rate-limited, retried
    /// on 429 up to `MAX_RETRY_ATTEMPTS` with exponential backoff capped
    /// at `MAX_BACKOFF`), validates the response, and folds in MP3 tags
    /// as a host fallback when the AI returns no hosts.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::RateLimitExhausted` if every retry is
    /// consumed, or `PipelineError::MalformedAiResponse` if the final
    /// response still fails validation.
    pub async fn extract(
        &self,
        transcript: &str,
        filename: &str,
        id3: &Id3Fields,
    ) -> Result<MetadataPayload, PipelineError> {
        let ai = self.call_with_retry(transcript, filename).await?;
        let email_content = validate_email_content(ai.email_content)?;

        let hosts = if ai.hosts.is_empty() {
            id3.artist.clone().into_iter().collect()
        } else {
            ai.hosts
        };

        validate_ai_fields(&ai.summary, &ai.keywords, &hosts)?;

        // `ai.date` is validated here so a malformed value never reaches a
        // caller, but the feed's `published_date` always wins when present;
        // nothing downstream currently asks for the AI's guess.
        let _ = ai.date.as_deref().and_then(sanitize_ai_date);

        Ok(MetadataPayload {
            summary: ai.summary,
            keywords: ai.keywords,
            hosts,
            guests: ai.guests,
            mp3_artist: id3.artist.clone(),
            mp3_album: id3.album.clone(),
            email_content: Some(email_content),
        })
    }

    async fn call_with_retry(
        &self,
        transcript: &str,
        filename: &str,
    ) -> Result<AiMetadataResponse, PipelineError> {
        let mut attempt = 0u32;
        loop {
            self.limiter.acquire().await;
            match self.provider.summarize(transcript, filename).await {
                Ok(response) => return Ok(response),
                Err(PipelineError::Http(e))
                    if e.status().map(|s| s.as_u16()) == Some(429) && attempt < MAX_RETRY_ATTEMPTS =>
                {
                    attempt += 1;
                    let backoff = Duration::from_secs(2u64.saturating_pow(attempt)).min(MAX_BACKOFF);
                    tracing::warn!(attempt, ?backoff, "AI metadata call rate-limited, retrying");
                    tokio::time::sleep(backoff).await;
                }
                Err(PipelineError::Http(_)) => {
                    return Err(PipelineError::RateLimitExhausted(attempt));
                }
                Err(other) => return Err(other),
            }
        }
    }
}

/// Validates the top-level AI response fields the nested `EmailContent`
/// schema can't see: `summary` must clear a minimum length, `keywords`
/// must fall within the expected count range, and `hosts` must be
/// non-empty after the ID3 fallback has already run (§4.E point 3).
fn validate_ai_fields(summary: &str, keywords: &[String], hosts: &[String]) -> Result<(), PipelineError> {
    if summary.chars().count() < MIN_SUMMARY_CHARS {
        return Err(PipelineError::MalformedAiResponse(format!(
            "summary is {} chars, below the {MIN_SUMMARY_CHARS}-char minimum",
            summary.chars().count()
        )));
    }
    if !(MIN_KEYWORDS..=MAX_KEYWORDS).contains(&keywords.len()) {
        return Err(PipelineError::MalformedAiResponse(format!(
            "expected {MIN_KEYWORDS}-{MAX_KEYWORDS} keywords, got {}",
            keywords.len()
        )));
    }
    if hosts.is_empty() {
        return Err(PipelineError::MalformedAiResponse(
            "no hosts reported by the AI call or ID3 fallback".to_string(),
        ));
    }
    Ok(())
}

/// Validates `story_summaries` truncation, the `podcast_type` enum, and
/// the teaser/takeaway length constraints from §4.E point 3.
fn validate_email_content(raw: RawEmailContent) -> Result<EmailContent, PipelineError> {
    let podcast_type = match raw.podcast_type.as_str() {
        "news" => PodcastType::News,
        "interview" => PodcastType::Interview,
        "general" => PodcastType::General,
        other => {
            return Err(PipelineError::MalformedAiResponse(format!(
                "unknown podcast_type: {other}"
            )));
        }
    };

    let story_summaries = if podcast_type == PodcastType::News {
        raw.story_summaries.into_iter().take(7).collect()
    } else {
        Vec::new()
    };

    let content = EmailContent {
        podcast_type,
        teaser_summary: raw.teaser_summary,
        key_takeaways: raw.key_takeaways.into_iter().take(5).collect(),
        highlight_moment: raw.highlight_moment,
        story_summaries,
    };

    if content.is_well_formed() {
        Ok(content)
    } else {
        Err(PipelineError::MalformedAiResponse(
            "teaser_summary/key_takeaways failed validation".to_string(),
        ))
    }
}

/// Rejects pre-2000 and malformed dates (§4.E point 3).
fn sanitize_ai_date(raw: &str) -> Option<NaiveDate> {
    let parsed = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
    (parsed.format("%Y").to_string().parse::<i32>().ok()? >= MIN_VALID_YEAR).then_some(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_raw() -> RawEmailContent {
        RawEmailContent {
            podcast_type: "news".to_string(),
            teaser_summary: "a".repeat(50),
            key_takeaways: vec!["one".to_string()],
            highlight_moment: None,
            story_summaries: (0..10)
                .map(|i| StorySummary {
                    headline: format!("h{i}"),
                    summary: format!("s{i}"),
                })
                .collect(),
        }
    }

    #[test]
    fn validates_and_truncates_story_summaries_to_seven() {
        let content = validate_email_content(valid_raw()).unwrap();
        assert_eq!(content.story_summaries.len(), 7);
    }

    #[test]
    fn non_news_podcasts_drop_story_summaries() {
        let mut raw = valid_raw();
        raw.podcast_type = "interview".to_string();
        let content = validate_email_content(raw).unwrap();
        assert!(content.story_summaries.is_empty());
    }

    #[test]
    fn rejects_short_teaser() {
        let mut raw = valid_raw();
        raw.teaser_summary = "too short".to_string();
        assert!(validate_email_content(raw).is_err());
    }

    #[test]
    fn rejects_unknown_podcast_type() {
        let mut raw = valid_raw();
        raw.podcast_type = "sports".to_string();
        assert!(validate_email_content(raw).is_err());
    }

    #[test]
    fn rejects_short_summary() {
        let err = validate_ai_fields("too short", &["a".into(); 5], &["Host".into()]).unwrap_err();
        assert!(matches!(err, PipelineError::MalformedAiResponse(_)));
    }

    #[test]
    fn rejects_keyword_count_outside_range() {
        let summary = "a".repeat(MIN_SUMMARY_CHARS);
        assert!(validate_ai_fields(&summary, &["a".into(); 2], &["Host".into()]).is_err());
        assert!(validate_ai_fields(&summary, &["a".into(); 11], &["Host".into()]).is_err());
        assert!(validate_ai_fields(&summary, &["a".into(); 5], &["Host".into()]).is_ok());
    }

    #[test]
    fn rejects_empty_hosts() {
        let summary = "a".repeat(MIN_SUMMARY_CHARS);
        let err = validate_ai_fields(&summary, &["a".into(); 5], &[]).unwrap_err();
        assert!(matches!(err, PipelineError::MalformedAiResponse(_)));
    }

    #[test]
    fn rejects_pre_2000_dates() {
        assert!(sanitize_ai_date("1999-01-01").is_none());
        assert!(sanitize_ai_date("2020-01-01").is_some());
        assert!(sanitize_ai_date("not-a-date").is_none());
    }

    #[tokio::test]
    async fn rate_limiter_allows_burst_up_to_capacity() {
        let limiter = RateLimiter::new(2, Duration::from_millis(50));
        let start = Instant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        assert!(start.elapsed() < Duration::from_millis(40));
    }
}
