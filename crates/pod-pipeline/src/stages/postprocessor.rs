//! PostProcessor (§4.G): a thread pool running the metadata → indexing →
//! cleanup chain off the Orchestrator's main loop, so a slow AI call or
//! index upload never stalls transcription.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use pod_core::Stage;
use pod_db::Database;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::download::Downloader;
use super::indexer::{DocumentMetadata, DocumentType, Indexer};
use super::metadata::{AiMetadataProvider, Id3Fields, MetadataExtractor, read_id3_tags};
use crate::error::PipelineError;

/// Thread-safe per-stage counters, incremented under no external lock
/// because every field is itself an atomic (§9 Design Notes).
#[derive(Debug, Default)]
pub struct PostProcessorStats {
    pub metadata_processed: AtomicU64,
    pub metadata_failed: AtomicU64,
    pub indexing_processed: AtomicU64,
    pub indexing_failed: AtomicU64,
    pub cleanup_processed: AtomicU64,
}

impl PostProcessorStats {
    #[must_use]
    pub fn snapshot(&self) -> (u64, u64, u64, u64, u64) {
        (
            self.metadata_processed.load(Ordering::Relaxed),
            self.metadata_failed.load(Ordering::Relaxed),
            self.indexing_processed.load(Ordering::Relaxed),
            self.indexing_failed.load(Ordering::Relaxed),
            self.cleanup_processed.load(Ordering::Relaxed),
        )
    }
}

/// Runs the metadata → indexing → cleanup chain for one episode,
/// re-reading the episode before each stage so a stage only runs if its
/// precondition still holds (§4.G).
pub struct PostProcessor<P> {
    db: Database,
    extractor: Arc<MetadataExtractor<P>>,
    indexer: Arc<Indexer>,
    downloader: Arc<Downloader>,
    store_display_name: String,
    max_retries: i32,
    stats: Arc<PostProcessorStats>,
    sender: Mutex<Option<mpsc::Sender<Uuid>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    queued: Arc<AtomicU64>,
}

impl<P: AiMetadataProvider + Send + Sync + 'static> PostProcessor<P> {
    #[must_use]
    pub fn new(
        db: Database,
        extractor: MetadataExtractor<P>,
        indexer: Indexer,
        downloader: Arc<Downloader>,
        store_display_name: String,
        max_retries: i32,
    ) -> Self {
        Self {
            db,
            extractor: Arc::new(extractor),
            indexer: Arc::new(indexer),
            downloader,
            store_display_name,
            max_retries,
            stats: Arc::new(PostProcessorStats::default()),
            sender: Mutex::new(None),
            workers: Mutex::new(Vec::new()),
            queued: Arc::new(AtomicU64::new(0)),
        }
    }

    #[must_use]
    pub fn stats(&self) -> Arc<PostProcessorStats> {
        Arc::clone(&self.stats)
    }

    /// Starts the worker pool. `n_workers = 0` disables async
    /// processing entirely: callers must use `process_one_sync` instead.
    pub fn start(&mut self, n_workers: usize) {
        if n_workers == 0 {
            *self.sender.lock().unwrap_or_else(PoisonError::into_inner) = None;
            return;
        }

        let (tx, rx) = mpsc::channel::<Uuid>(1024);
        *self.sender.lock().unwrap_or_else(PoisonError::into_inner) = Some(tx);

        let rx = Arc::new(tokio::sync::Mutex::new(rx));
        let mut handles = Vec::with_capacity(n_workers);
        for _ in 0..n_workers {
            let db = self.db.clone();
            let extractor = Arc::clone(&self.extractor);
            let indexer = Arc::clone(&self.indexer);
            let downloader = Arc::clone(&self.downloader);
            let store_display_name = self.store_display_name.clone();
            let max_retries = self.max_retries;
            let stats = Arc::clone(&self.stats);
            let queued = Arc::clone(&self.queued);
            let rx = Arc::clone(&rx);

            handles.push(tokio::spawn(async move {
                loop {
                    let episode_id = {
                        let mut guard = rx.lock().await;
                        guard.recv().await
                    };
                    let Some(episode_id) = episode_id else { break };
                    queued.fetch_sub(1, Ordering::Relaxed);
                    run_chain(
                        &db,
                        &extractor,
                        &indexer,
                        &downloader,
                        &store_display_name,
                        max_retries,
                        &stats,
                        episode_id,
                    )
                    .await;
                }
            }));
        }
        *self.workers.lock().unwrap_or_else(PoisonError::into_inner) = handles;
    }

    /// Enqueues the chain for `episode_id`. If the pool is disabled
    /// (`start(0)` or never started), runs synchronously inline.
    pub async fn submit(&self, episode_id: Uuid) {
        let tx = self.sender.lock().unwrap_or_else(PoisonError::into_inner).clone();
        match tx {
            Some(tx) => {
                self.queued.fetch_add(1, Ordering::Relaxed);
                if tx.send(episode_id).await.is_err() {
                    self.queued.fetch_sub(1, Ordering::Relaxed);
                    tracing::warn!(%episode_id, "post-processor channel closed, running inline");
                    self.process_one_sync(episode_id).await;
                }
            }
            None => self.process_one_sync(episode_id).await,
        }
    }

    /// Closes the submission channel and lets queued work drain, then
    /// (when `wait`) awaits every worker's `JoinHandle` before returning;
    /// otherwise aborts them immediately. Returns the number of episodes
    /// still queued at the moment of the call (§4.H shutdown step 3).
    pub async fn shutdown(&self, wait: bool) -> usize {
        self.sender.lock().unwrap_or_else(PoisonError::into_inner).take();

        let pending = self.queued.load(Ordering::Relaxed);
        #[allow(clippy::cast_possible_truncation)]
        let pending = pending as usize;

        let handles = std::mem::take(&mut *self.workers.lock().unwrap_or_else(PoisonError::into_inner));

        if wait {
            for handle in handles {
                if let Err(e) = handle.await {
                    tracing::warn!("post-processor worker task panicked: {e}");
                }
            }
            tracing::info!(drained = pending, "post-processor workers joined");
        } else {
            for handle in handles {
                handle.abort();
            }
            tracing::warn!(abandoned = pending, "post-processor workers aborted without waiting");
        }

        pending
    }

    /// Synchronous fallback used when the pool is disabled.
    pub async fn process_one_sync(&self, episode_id: Uuid) {
        run_chain(
            &self.db,
            &self.extractor,
            &self.indexer,
            &self.downloader,
            &self.store_display_name,
            self.max_retries,
            &self.stats,
            episode_id,
        )
        .await;
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_chain<P: AiMetadataProvider + Send + Sync>(
    db: &Database,
    extractor: &MetadataExtractor<P>,
    indexer: &Indexer,
    downloader: &Downloader,
    store_display_name: &str,
    max_retries: i32,
    stats: &PostProcessorStats,
    episode_id: Uuid,
) {
    if !run_metadata_stage(db, extractor, max_retries, stats, episode_id).await {
        return;
    }
    if !run_indexing_stage(db, indexer, store_display_name, max_retries, stats, episode_id).await {
        return;
    }
    run_cleanup_stage(db, downloader, stats, episode_id).await;
}

async fn run_metadata_stage<P: AiMetadataProvider + Send + Sync>(
    db: &Database,
    extractor: &MetadataExtractor<P>,
    max_retries: i32,
    stats: &PostProcessorStats,
    episode_id: Uuid,
) -> bool {
    let Ok(Some(episode)) = db.episodes().get_by_id(episode_id).await else {
        return false;
    };
    if episode.metadata_status() != pod_core::MetadataStatus::Pending {
        return true;
    }

    let Some(transcript) = episode.transcript_text.clone() else {
        return true;
    };

    let _ = db.episodes().mark_metadata_started(episode_id).await;

    let id3 = episode
        .local_file_path
        .as_ref()
        .map(|p| read_id3_tags(std::path::Path::new(p)))
        .unwrap_or_default();

    match extractor.extract(&transcript, &episode.title, &id3).await {
        Ok(payload) => {
            let _ = db.episodes().mark_metadata_complete(episode_id, &payload).await;
            stats.metadata_processed.fetch_add(1, Ordering::Relaxed);
            true
        }
        Err(e) => {
            handle_stage_failure(db, episode_id, Stage::Metadata, max_retries, &e).await;
            stats.metadata_failed.fetch_add(1, Ordering::Relaxed);
            false
        }
    }
}

async fn run_indexing_stage(
    db: &Database,
    indexer: &Indexer,
    store_display_name: &str,
    max_retries: i32,
    stats: &PostProcessorStats,
    episode_id: Uuid,
) -> bool {
    let Ok(Some(episode)) = db.episodes().get_by_id(episode_id).await else {
        return false;
    };
    if episode.file_search_status() != pod_core::FileSearchStatus::Pending {
        return true;
    }
    if episode.metadata_status() != pod_core::MetadataStatus::Completed {
        return true;
    }

    let Some(transcript) = episode.transcript_text.clone() else {
        return true;
    };

    let _ = db.episodes().mark_file_search_started(episode_id).await;

    let podcast_title = db
        .podcasts()
        .get_by_id(episode.podcast_id)
        .await
        .ok()
        .flatten()
        .map_or_else(|| episode.podcast_id.to_string(), |p| p.title);

    let display_name = format!("{}_{}.txt", store_display_name, episode_id);
    let metadata = DocumentMetadata {
        podcast: podcast_title,
        episode: Some(episode.title.clone()),
        release_date: Some(episode.published_date.to_rfc3339()),
        hosts: episode.ai_hosts.clone(),
        guests: episode.ai_guests.clone(),
        keywords: episode.ai_keywords.clone(),
        summary: episode.ai_summary.clone(),
    };

    match indexer
        .upload_transcript_text(&transcript, &display_name, DocumentType::Transcript, &metadata, true)
        .await
    {
        Ok(resource_name) => {
            let _ = db
                .episodes()
                .mark_file_search_complete(episode_id, &resource_name, &display_name)
                .await;
            stats.indexing_processed.fetch_add(1, Ordering::Relaxed);
            true
        }
        Err(e) => {
            handle_stage_failure(db, episode_id, Stage::FileSearch, max_retries, &e).await;
            stats.indexing_failed.fetch_add(1, Ordering::Relaxed);
            false
        }
    }
}

async fn run_cleanup_stage(
    db: &Database,
    downloader: &Downloader,
    stats: &PostProcessorStats,
    episode_id: Uuid,
) {
    let Ok(Some(episode)) = db.episodes().get_by_id(episode_id).await else {
        return;
    };
    if !episode.is_ready_for_cleanup() {
        return;
    }

    if let Some(path) = &episode.local_file_path {
        let path = PathBuf::from(path);
        if tokio::fs::remove_file(&path).await.is_ok()
            || matches!(tokio::fs::metadata(&path).await, Err(e) if e.kind() == std::io::ErrorKind::NotFound)
        {
            let _ = db.episodes().mark_audio_cleaned_up(episode_id).await;
            stats.cleanup_processed.fetch_add(1, Ordering::Relaxed);
        }
    }
    let _ = downloader;
}

/// On stage exception: increment the retry counter; if still under
/// budget, reset the stage to pending for the next sweep, otherwise mark
/// it permanently failed (§4.G).
async fn handle_stage_failure(
    db: &Database,
    episode_id: Uuid,
    stage: Stage,
    max_retries: i32,
    error: &PipelineError,
) {
    let message = error.to_string();
    match db.episodes().increment_retry_count(episode_id, stage).await {
        Ok(count) if count >= max_retries => {
            let _ = db
                .episodes()
                .mark_permanently_failed(episode_id, stage, &message)
                .await;
        }
        Ok(_) => {
            let _ = db.episodes().reset_episode_for_retry(episode_id, stage).await;
            tracing::warn!(%episode_id, ?stage, "stage failed, reset for retry: {message}");
        }
        Err(e) => tracing::error!(%episode_id, ?stage, "failed to increment retry count: {e}"),
    }
}
