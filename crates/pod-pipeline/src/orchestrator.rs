//! Orchestrator (§4.H): the single-threaded pipeline driver. One thread
//! keeps the transcriber continuously fed; everything else — sync,
//! download refill, post-processing, digests — runs off bounded worker
//! pools or a background executor so the main loop never blocks on them.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Timelike, Utc};
use pod_core::Stage;
use pod_db::Database;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;

use crate::config::PipelineConfig;
use crate::digest::{DigestWorker, MailSender};
use crate::stages::download::Downloader;
use crate::stages::indexer::Indexer;
use crate::stages::metadata::{AiMetadataProvider, MetadataExtractor};
use crate::stages::postprocessor::{PostProcessor, PostProcessorStats};
use crate::stages::sync::SyncWorker;
use crate::stages::transcriber::Transcriber;

const DIGEST_JOIN_TIMEOUT: Duration = Duration::from_secs(60);
const BACKGROUND_JOIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Lifetime counters finalized at shutdown (§4.H: "Finalize stats with
/// `stopped_at`").
#[derive(Debug, Default)]
pub struct OrchestratorStats {
    pub episodes_transcribed: AtomicU64,
    pub transcription_permanent_failures: AtomicU64,
    pub sync_runs: AtomicU64,
    pub digest_runs: AtomicU64,
    pub started_at: RwLock<Option<DateTime<Utc>>>,
    pub stopped_at: RwLock<Option<DateTime<Utc>>>,
}

/// Drives the pipeline's main loop described in §4.H. Generic over the
/// AI metadata provider and mail transport so the process binary picks
/// the concrete implementations; the orchestrator itself never depends
/// on a vendor SDK.
pub struct Orchestrator<P, M> {
    db: Database,
    config: PipelineConfig,
    downloader: Arc<Downloader>,
    transcriber: Arc<Transcriber>,
    sync_worker: Arc<SyncWorker>,
    post_processor: Arc<PostProcessor<P>>,
    digest_worker: Option<Arc<DigestWorker<M>>>,
    running: Arc<AtomicBool>,
    last_sync: Mutex<Option<DateTime<Utc>>>,
    last_digest_hour: Mutex<Option<u32>>,
    digest_job: Mutex<Option<JoinHandle<()>>>,
    sync_job: Mutex<Option<JoinHandle<()>>>,
    download_job: Mutex<Option<JoinHandle<()>>>,
    stats: Arc<OrchestratorStats>,
}

impl<P, M> Orchestrator<P, M>
where
    P: AiMetadataProvider + Send + Sync + 'static,
    M: MailSender + Send + Sync + 'static,
{
    #[must_use]
    pub fn new(
        db: Database,
        config: PipelineConfig,
        transcriber: Transcriber,
        extractor: MetadataExtractor<P>,
        indexer: Indexer,
        digest_worker: Option<DigestWorker<M>>,
    ) -> Self {
        let downloader = Arc::new(Downloader::new(
            db.clone(),
            config.audio_dir.clone(),
            config.download_workers,
        ));
        let mut post_processor = PostProcessor::new(
            db.clone(),
            extractor,
            indexer,
            Arc::clone(&downloader),
            config.store_display_name.clone(),
            config.max_retries,
        );
        post_processor.start(config.post_processing_workers);
        let sync_worker = Arc::new(SyncWorker::new(db.clone(), config.youtube_api_key.clone()));

        Self {
            db,
            sync_worker,
            config,
            downloader,
            transcriber: Arc::new(transcriber),
            post_processor: Arc::new(post_processor),
            digest_worker: digest_worker.map(Arc::new),
            running: Arc::new(AtomicBool::new(false)),
            last_sync: Mutex::new(None),
            last_digest_hour: Mutex::new(None),
            digest_job: Mutex::new(None),
            sync_job: Mutex::new(None),
            download_job: Mutex::new(None),
            stats: Arc::new(OrchestratorStats::default()),
        }
    }

    #[must_use]
    pub fn stats(&self) -> Arc<OrchestratorStats> {
        Arc::clone(&self.stats)
    }

    #[must_use]
    pub fn post_processor_stats(&self) -> Arc<PostProcessorStats> {
        self.post_processor.stats()
    }

    /// Runs the main loop until a shutdown signal (SIGINT/SIGTERM) or
    /// another caller sets `running=false` via [`Self::stop`].
    pub async fn run(self: Arc<Self>) {
        self.running.store(true, Ordering::SeqCst);
        *self.stats.started_at.write().await = Some(Utc::now());
        self.transcriber.load_model();

        let shutdown = Arc::clone(&self);
        tokio::spawn(async move {
            wait_for_shutdown_signal().await;
            shutdown.stop();
        });

        while self.running.load(Ordering::SeqCst) {
            self.maybe_run_sync().await;
            self.maybe_run_email_digests().await;
            self.maintain_download_buffer().await;

            match self.db.episodes().get_next_for_transcription().await {
                Ok(Some(episode)) => self.process_one_transcription(episode).await,
                Ok(None) => {
                    if !self.help_post_process().await {
                        tokio::time::sleep(Duration::from_secs(self.config.idle_wait_seconds)).await;
                    }
                }
                Err(e) => {
                    tracing::error!("failed to fetch next transcription candidate: {e}");
                    tokio::time::sleep(Duration::from_secs(self.config.idle_wait_seconds)).await;
                }
            }
        }

        self.shutdown_sequence().await;
    }

    /// Flips `running=false`; the loop exits after its current
    /// transcription returns (§4.H shutdown step 1).
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    async fn process_one_transcription(&self, episode: pod_core::Episode) {
        match self.transcriber.transcribe_single(&episode).await {
            Ok(Some(_text)) => {
                self.post_processor.submit(episode.id).await;
                self.stats.episodes_transcribed.fetch_add(1, Ordering::Relaxed);
            }
            Ok(None) => self.handle_transcription_failure(episode.id).await,
            Err(e) => {
                tracing::warn!(episode_id = %episode.id, "transcription error: {e}");
                self.handle_transcription_failure(episode.id).await;
            }
        }
    }

    /// `increment_retry_count(id, Stage::Transcript)`; permanently fails
    /// past `max_retries`, otherwise resets to pending (§4.H).
    async fn handle_transcription_failure(&self, episode_id: uuid::Uuid) {
        match self.db.episodes().increment_retry_count(episode_id, Stage::Transcript).await {
            Ok(count) if count >= self.config.max_retries => {
                let _ = self
                    .db
                    .episodes()
                    .mark_permanently_failed(episode_id, Stage::Transcript, "transcription failed")
                    .await;
                self.stats
                    .transcription_permanent_failures
                    .fetch_add(1, Ordering::Relaxed);
            }
            Ok(_) => {
                let _ = self.db.episodes().reset_episode_for_retry(episode_id, Stage::Transcript).await;
            }
            Err(e) => tracing::error!(%episode_id, "failed to increment transcript retry count: {e}"),
        }
    }

    /// Dispatches a sync job when `sync_interval_seconds` has elapsed
    /// since the last one. Sync runs inline (bounded by its own
    /// per-podcast error handling) — it never blocks past one iteration
    /// because `sync_all` itself returns once every podcast has been
    /// attempted.
    async fn maybe_run_sync(&self) {
        let mut last_sync = self.last_sync.lock().await;
        #[allow(clippy::cast_possible_wrap)]
        let interval = self.config.sync_interval_seconds as i64;
        let due = last_sync
            .is_none_or(|t| Utc::now().signed_duration_since(t).num_seconds() >= interval);
        if !due {
            return;
        }
        *last_sync = Some(Utc::now());
        drop(last_sync);

        let sync_worker = Arc::clone(&self.sync_worker);
        let stats = Arc::clone(&self.stats);
        let handle = tokio::spawn(async move {
            let result = sync_worker.sync_all().await;
            stats.sync_runs.fetch_add(1, Ordering::Relaxed);
            if result.failed > 0 {
                tracing::warn!(failed = result.failed, "sync batch completed with failures");
            }
        });
        *self.sync_job.lock().await = Some(handle);
    }

    /// Submits one digest job when the wall-clock hour has advanced
    /// since the last check and no digest job is currently in flight
    /// (§4.H).
    async fn maybe_run_email_digests(&self) {
        let Some(digest_worker) = &self.digest_worker else {
            return;
        };

        let current_hour = Utc::now().hour();
        let mut last_hour = self.last_digest_hour.lock().await;
        if *last_hour == Some(current_hour) {
            return;
        }

        let mut job = self.digest_job.lock().await;
        if job.as_ref().is_some_and(|h| !h.is_finished()) {
            return;
        }
        *last_hour = Some(current_hour);
        drop(last_hour);

        let digest_worker = Arc::clone(digest_worker);
        let stats = Arc::clone(&self.stats);
        *job = Some(tokio::spawn(async move {
            let result = digest_worker.run().await;
            stats.digest_runs.fetch_add(1, Ordering::Relaxed);
            if result.failed > 0 {
                tracing::warn!(failed = result.failed, "digest sweep completed with failures");
            }
        }));
    }

    /// Refills the download buffer when its count drops below
    /// `download_buffer_threshold` (§4.H download-buffer policy).
    async fn maintain_download_buffer(&self) {
        let count = match self.db.episodes().get_download_buffer_count().await {
            Ok(c) => c,
            Err(e) => {
                tracing::error!("failed to read download buffer count: {e}");
                return;
            }
        };
        if count >= i64::from(self.config.download_buffer_threshold) {
            return;
        }

        let downloader = Arc::clone(&self.downloader);
        let batch_size = i64::from(self.config.download_batch_size);
        let handle = tokio::spawn(async move {
            let result = downloader.download_pending(batch_size).await;
            if result.failed > 0 {
                tracing::warn!(failed = result.failed, "download batch completed with failures");
            }
        });
        *self.download_job.lock().await = Some(handle);
    }

    /// When there is nothing to transcribe, pulls one pending
    /// post-processing episode (if any) onto this thread rather than
    /// idling outright. Returns whether work was found.
    async fn help_post_process(&self) -> bool {
        match self.db.episodes().get_next_pending_post_processing().await {
            Ok(Some(episode)) => {
                self.post_processor.process_one_sync(episode.id).await;
                true
            }
            Ok(None) => false,
            Err(e) => {
                tracing::error!("failed to fetch next post-processing candidate: {e}");
                false
            }
        }
    }

    /// §4.H shutdown sequence steps 2–5.
    async fn shutdown_sequence(&self) {
        tracing::info!("orchestrator shutting down");

        let job = self.digest_job.lock().await.take();
        if let Some(job) = job {
            if tokio::time::timeout(DIGEST_JOIN_TIMEOUT, job).await.is_err() {
                tracing::warn!("digest job did not finish within the shutdown deadline");
            }
        }

        self.join_background_job(&self.sync_job, "sync").await;
        self.join_background_job(&self.download_job, "download buffer").await;

        let pending = self.post_processor.shutdown(true).await;
        tracing::info!(pending, "post-processor shut down");

        self.transcriber.unload_model();
        *self.stats.stopped_at.write().await = Some(Utc::now());
        tracing::info!("orchestrator stopped");
    }

    /// Awaits a fire-and-forget background job (sync/download-buffer)
    /// within [`BACKGROUND_JOIN_TIMEOUT`], logging rather than
    /// propagating if it's still running past the deadline.
    async fn join_background_job(&self, slot: &Mutex<Option<JoinHandle<()>>>, label: &str) {
        let job = slot.lock().await.take();
        if let Some(job) = job {
            if tokio::time::timeout(BACKGROUND_JOIN_TIMEOUT, job).await.is_err() {
                tracing::warn!("{label} job did not finish within the shutdown deadline");
            }
        }
    }
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {e}");
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
