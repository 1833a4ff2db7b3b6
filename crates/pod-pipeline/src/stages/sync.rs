//! Feed sync glue (component B's consumer, driven by the Orchestrator's
//! `maybe_run_sync` and the CLI's `add`/`sync` commands): fetches feed
//! bytes, hands them to the pure `pod_feeds` parser, and upserts the
//! result through the Repository. Sync failures are logged, never
//! fatal — one bad feed never blocks the rest of the batch (§4.H).

use chrono::Utc;
use pod_core::{Episode, Podcast, SourceType};
use pod_db::Database;
use pod_feeds::{ParsedPodcast, YouTubeClient, rewrite_feed_scheme, timedtext_caption_url};

use crate::error::{PipelineError, WorkerResult};
use crate::stages::transcriber::YouTubeCaptionsWorker;

/// Default number of recent uploads pulled when a YouTube channel's
/// periodic re-sync doesn't specify its own limit.
const DEFAULT_YOUTUBE_SYNC_LIMIT: usize = 50;
const DEFAULT_CAPTION_LANGUAGE: &str = "en";

pub struct SyncWorker {
    http: reqwest::Client,
    db: Database,
    youtube: Option<YouTubeClient>,
}

impl SyncWorker {
    #[must_use]
    pub fn new(db: Database, youtube_api_key: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            db,
            youtube: youtube_api_key.map(YouTubeClient::new),
        }
    }

    /// Adds a YouTube channel by id: creates the podcast row (mirroring
    /// `add_by_url`'s create-or-report-existing contract) and pulls its
    /// `max_videos` most recent uploads, dispatching YouTube captions for
    /// episodes that have them (§4.B, §6).
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Configuration` if no YouTube API key was
    /// configured, otherwise propagates API/database errors.
    pub async fn add_youtube_channel(
        &self,
        channel_id: &str,
        max_videos: usize,
    ) -> Result<(Podcast, bool, WorkerResult), PipelineError> {
        let youtube = self.require_youtube()?;

        if let Some(existing) = self.db.podcasts().get_by_channel_id(channel_id).await? {
            return Ok((existing, false, WorkerResult::default()));
        }

        let channel = youtube.get_channel_by_id(channel_id).await?;
        let feed_url = channel.uploads_playlist_id.as_deref().map_or_else(
            || format!("https://www.youtube.com/channel/{channel_id}"),
            |playlist_id| format!("https://www.youtube.com/playlist?list={playlist_id}"),
        );

        let mut podcast = Podcast::new(SourceType::YouTube, feed_url, channel.title.clone());
        podcast.channel_id = Some(channel.channel_id.clone());
        podcast.playlist_id = channel.uploads_playlist_id.clone();
        podcast.description = channel.description.clone();
        podcast.image_url = channel.thumbnail_url.clone();
        self.db.podcasts().create(&podcast).await?;

        let result = self.sync_youtube_videos(&podcast, youtube, max_videos).await?;
        Ok((podcast, true, result))
    }

    fn require_youtube(&self) -> Result<&YouTubeClient, PipelineError> {
        self.youtube
            .as_ref()
            .ok_or_else(|| PipelineError::Configuration("PIPELINE_YOUTUBE_API_KEY is not set".to_string()))
    }

    /// Fetches `feed_url`, creates the podcast row if it doesn't already
    /// exist, and returns it (the CLI `add` command, §6).
    ///
    /// # Errors
    ///
    /// Returns `PipelineError` on transport failure or a malformed feed.
    pub async fn add_by_url(&self, feed_url: &str) -> Result<(Podcast, bool), PipelineError> {
        let feed_url = rewrite_feed_scheme(feed_url);
        if let Some(existing) = self.db.podcasts().get_by_feed_url(&feed_url).await? {
            return Ok((existing, false));
        }

        let parsed = self.fetch_and_parse(&feed_url).await?;
        let podcast = Podcast::new(SourceType::Rss, parsed.feed_url.clone(), parsed.title.clone());
        let podcast = apply_parsed_podcast_fields(podcast, &parsed);
        self.db.podcasts().create(&podcast).await?;
        self.upsert_episodes(&podcast, &parsed).await?;
        Ok((podcast, true))
    }

    /// Re-syncs one podcast's feed: fetches, parses, and upserts every
    /// episode, advancing `last_new_episode` when a strictly newer one
    /// is discovered (Invariant 5).
    ///
    /// # Errors
    ///
    /// Returns `PipelineError` on transport failure or a malformed feed.
    pub async fn sync_podcast(&self, podcast: &Podcast) -> Result<WorkerResult, PipelineError> {
        if podcast.source_type == SourceType::YouTube {
            let youtube = self.require_youtube()?;
            let result = self.sync_youtube_videos(podcast, youtube, DEFAULT_YOUTUBE_SYNC_LIMIT).await?;
            self.db.podcasts().update_last_checked(podcast.id, Utc::now()).await?;
            return Ok(result);
        }

        let parsed = self.fetch_and_parse(&podcast.feed_url).await?;
        let result = self.upsert_episodes(podcast, &parsed).await?;
        self.db.podcasts().update_last_checked(podcast.id, Utc::now()).await?;
        Ok(result)
    }

    /// Syncs every podcast in the Repository, logging (not propagating)
    /// a per-podcast failure so the rest of the batch still runs.
    pub async fn sync_all(&self) -> WorkerResult {
        let podcasts = match self.db.podcasts().list(None).await {
            Ok(p) => p,
            Err(e) => {
                return WorkerResult {
                    failed: 1,
                    errors: vec![e.to_string()],
                    ..WorkerResult::default()
                };
            }
        };

        let mut result = WorkerResult::default();
        for podcast in podcasts {
            match self.sync_podcast(&podcast).await {
                Ok(r) => result = result.merge(r),
                Err(e) => {
                    tracing::warn!(podcast_id = %podcast.id, "sync failed: {e}");
                    result.failed += 1;
                    result.errors.push(format!("{}: {e}", podcast.id));
                }
            }
        }
        result
    }

    async fn fetch_and_parse(&self, feed_url: &str) -> Result<ParsedPodcast, PipelineError> {
        let bytes = self.http.get(feed_url).send().await?.bytes().await?;
        pod_feeds::parse_feed(feed_url, &bytes).map_err(PipelineError::from)
    }

    async fn upsert_episodes(
        &self,
        podcast: &Podcast,
        parsed: &ParsedPodcast,
    ) -> Result<WorkerResult, PipelineError> {
        let mut result = WorkerResult::default();
        let mut newest = podcast.last_new_episode;

        for entry in &parsed.episodes {
            let candidate = Episode::new(
                podcast.id,
                entry.guid.clone(),
                SourceType::Rss,
                entry.title.clone(),
                entry.published_date,
                entry.enclosure_url.clone(),
            );
            let candidate = apply_parsed_episode_fields(candidate, entry);

            match self.db.episodes().get_or_create_episode(candidate).await {
                Ok((episode, created)) => {
                    if created {
                        result.processed += 1;
                        if newest.is_none_or(|current| episode.published_date > current) {
                            newest = Some(episode.published_date);
                        }
                    } else {
                        result.skipped += 1;
                    }
                }
                Err(e) => {
                    result.failed += 1;
                    result.errors.push(e.to_string());
                }
            }
        }

        if newest.is_some_and(|n| podcast.would_advance_last_new_episode(n)) {
            if let Some(n) = newest {
                self.db.podcasts().advance_last_new_episode(podcast.id, n).await?;
            }
        }

        Ok(result)
    }

    /// Pulls `podcast`'s recent uploads, upserts them as `SourceType::YouTube`
    /// episodes, and for each newly-created episode with a discovered
    /// caption track, tries the YouTube-captions fast path before it ever
    /// reaches the audio download/transcribe stages (§4.B, §4.D).
    async fn sync_youtube_videos(
        &self,
        podcast: &Podcast,
        youtube: &YouTubeClient,
        max_videos: usize,
    ) -> Result<WorkerResult, PipelineError> {
        let channel_id = podcast.channel_id.as_deref().ok_or_else(|| {
            PipelineError::Configuration(format!("podcast {} has no YouTube channel_id", podcast.id))
        })?;
        let videos = youtube.get_channel_videos(channel_id, max_videos).await?;
        let captions_worker = YouTubeCaptionsWorker::new();

        let mut result = WorkerResult::default();
        let mut newest = podcast.last_new_episode;

        for video in videos {
            let mut candidate = Episode::new(
                podcast.id,
                video.video_id.clone(),
                SourceType::YouTube,
                video.title.clone(),
                video.published_at.unwrap_or_else(Utc::now),
                video.watch_url(),
            );
            candidate.description = video.description.clone();
            candidate.duration_seconds = video.duration_seconds;
            candidate.enclosure_type = Some("video/youtube".to_string());

            match self.db.episodes().get_or_create_episode(candidate).await {
                Ok((episode, created)) => {
                    if !created {
                        result.skipped += 1;
                        continue;
                    }
                    result.processed += 1;
                    if newest.is_none_or(|current| episode.published_date > current) {
                        newest = Some(episode.published_date);
                    }

                    if video.captions_available {
                        let language = video.default_caption_language.as_deref().unwrap_or(DEFAULT_CAPTION_LANGUAGE);
                        let caption_url = timedtext_caption_url(&video.video_id, language);
                        match captions_worker.try_captions(&self.db, episode.id, &caption_url).await {
                            Ok(true) => {}
                            Ok(false) => tracing::debug!(
                                episode_id = %episode.id,
                                "caption track unavailable despite discovery flag, falling back to audio"
                            ),
                            Err(e) => tracing::warn!(
                                episode_id = %episode.id,
                                "caption download failed, falling back to audio: {e}"
                            ),
                        }
                    }
                }
                Err(e) => {
                    result.failed += 1;
                    result.errors.push(e.to_string());
                }
            }
        }

        if newest.is_some_and(|n| podcast.would_advance_last_new_episode(n)) {
            if let Some(n) = newest {
                self.db.podcasts().advance_last_new_episode(podcast.id, n).await?;
            }
        }

        Ok(result)
    }
}

fn apply_parsed_podcast_fields(mut podcast: Podcast, parsed: &ParsedPodcast) -> Podcast {
    podcast.description = parsed.description.clone();
    podcast.image_url = parsed.image_url.clone();
    podcast.author = parsed.author.clone();
    podcast.language = parsed.language.clone();
    podcast
}

fn apply_parsed_episode_fields(
    mut episode: Episode,
    parsed: &pod_feeds::ParsedEpisode,
) -> Episode {
    episode.description = parsed.description.clone();
    episode.duration_seconds = parsed.duration_seconds;
    episode.episode_number = parsed.episode_number;
    episode.season_number = parsed.season_number;
    episode.enclosure_type = parsed.enclosure_type.clone();
    episode.enclosure_length = parsed.enclosure_length;
    episode
}
