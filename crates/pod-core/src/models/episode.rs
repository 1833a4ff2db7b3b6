//! Episode model and its four independently-tracked processing stages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR", rename_all = "snake_case")]
pub enum SourceType {
    Rss,
    YouTube,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DownloadStatus {
    Pending,
    Downloading,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TranscriptStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    PermanentlyFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetadataStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    PermanentlyFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileSearchStatus {
    Pending,
    Processing,
    Indexed,
    Failed,
    PermanentlyFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TranscriptSource {
    YoutubeCaptions,
    Model,
}

macro_rules! status_from_str {
    ($name:ident, $default:ident, $( $text:literal => $variant:ident ),+ $(,)?) => {
        fn $name(s: &str) -> Self {
            match s {
                $( $text => Self::$variant, )+
                _ => Self::$default,
            }
        }
    };
}

impl DownloadStatus {
    status_from_str!(from_db_str_impl, Pending,
        "downloading" => Downloading,
        "completed" => Completed,
        "failed" => Failed,
    );

    #[must_use]
    pub fn from_db_str(s: &str) -> Self {
        Self::from_db_str_impl(s)
    }

    #[must_use]
    pub const fn as_db_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Downloading => "downloading",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl TranscriptStatus {
    status_from_str!(from_db_str_impl, Pending,
        "processing" => Processing,
        "completed" => Completed,
        "failed" => Failed,
        "permanently_failed" => PermanentlyFailed,
    );

    #[must_use]
    pub fn from_db_str(s: &str) -> Self {
        Self::from_db_str_impl(s)
    }

    #[must_use]
    pub const fn as_db_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::PermanentlyFailed => "permanently_failed",
        }
    }
}

impl MetadataStatus {
    status_from_str!(from_db_str_impl, Pending,
        "processing" => Processing,
        "completed" => Completed,
        "failed" => Failed,
        "permanently_failed" => PermanentlyFailed,
    );

    #[must_use]
    pub fn from_db_str(s: &str) -> Self {
        Self::from_db_str_impl(s)
    }

    #[must_use]
    pub const fn as_db_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::PermanentlyFailed => "permanently_failed",
        }
    }
}

impl FileSearchStatus {
    status_from_str!(from_db_str_impl, Pending,
        "processing" => Processing,
        "indexed" => Indexed,
        "failed" => Failed,
        "permanently_failed" => PermanentlyFailed,
    );

    #[must_use]
    pub fn from_db_str(s: &str) -> Self {
        Self::from_db_str_impl(s)
    }

    #[must_use]
    pub const fn as_db_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Indexed => "indexed",
            Self::Failed => "failed",
            Self::PermanentlyFailed => "permanently_failed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Episode {
    pub id: Uuid,
    pub podcast_id: Uuid,
    pub guid: String,
    pub source_type: SourceType,

    pub title: String,
    pub description: Option<String>,
    pub published_date: DateTime<Utc>,
    pub duration_seconds: Option<i32>,
    pub episode_number: Option<i32>,
    pub season_number: Option<i32>,

    pub enclosure_url: String,
    pub enclosure_type: Option<String>,
    pub enclosure_length: Option<i64>,

    // --- download track ---
    pub download_status: String,
    pub download_error: Option<String>,
    pub downloaded_at: Option<DateTime<Utc>>,
    pub local_file_path: Option<String>,
    pub file_size_bytes: Option<i64>,
    pub file_hash: Option<String>,
    pub download_retry_count: i32,

    // --- transcript track ---
    pub transcript_status: String,
    pub transcript_error: Option<String>,
    pub transcribed_at: Option<DateTime<Utc>>,
    pub transcript_text: Option<String>,
    pub transcript_source: Option<String>,
    pub transcript_retry_count: i32,

    // --- metadata track ---
    pub metadata_status: String,
    pub metadata_error: Option<String>,
    pub ai_summary: Option<String>,
    #[sqlx(json)]
    pub ai_keywords: Vec<String>,
    #[sqlx(json)]
    pub ai_hosts: Vec<String>,
    #[sqlx(json)]
    pub ai_guests: Vec<String>,
    #[sqlx(json)]
    pub ai_email_content: Option<serde_json::Value>,
    pub mp3_artist: Option<String>,
    pub mp3_album: Option<String>,
    pub metadata_retry_count: i32,

    // --- file_search track ---
    pub file_search_status: String,
    pub file_search_error: Option<String>,
    pub resource_name: Option<String>,
    pub display_name: Option<String>,
    pub uploaded_at: Option<DateTime<Utc>>,
    pub file_search_retry_count: i32,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Episode {
    #[must_use]
    pub fn new(
        podcast_id: Uuid,
        guid: String,
        source_type: SourceType,
        title: String,
        published_date: DateTime<Utc>,
        enclosure_url: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            podcast_id,
            guid,
            source_type,
            title,
            description: None,
            published_date,
            duration_seconds: None,
            episode_number: None,
            season_number: None,
            enclosure_url,
            enclosure_type: None,
            enclosure_length: None,
            download_status: DownloadStatus::Pending.as_db_str().to_string(),
            download_error: None,
            downloaded_at: None,
            local_file_path: None,
            file_size_bytes: None,
            file_hash: None,
            download_retry_count: 0,
            transcript_status: TranscriptStatus::Pending.as_db_str().to_string(),
            transcript_error: None,
            transcribed_at: None,
            transcript_text: None,
            transcript_source: None,
            transcript_retry_count: 0,
            metadata_status: MetadataStatus::Pending.as_db_str().to_string(),
            metadata_error: None,
            ai_summary: None,
            ai_keywords: Vec::new(),
            ai_hosts: Vec::new(),
            ai_guests: Vec::new(),
            ai_email_content: None,
            mp3_artist: None,
            mp3_album: None,
            metadata_retry_count: 0,
            file_search_status: FileSearchStatus::Pending.as_db_str().to_string(),
            file_search_error: None,
            resource_name: None,
            display_name: None,
            uploaded_at: None,
            file_search_retry_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: String) -> Self {
        self.description = Some(description);
        self
    }

    #[must_use]
    pub const fn with_duration(mut self, seconds: i32) -> Self {
        self.duration_seconds = Some(seconds);
        self
    }

    #[must_use]
    pub fn download_status(&self) -> DownloadStatus {
        DownloadStatus::from_db_str(&self.download_status)
    }

    #[must_use]
    pub fn transcript_status(&self) -> TranscriptStatus {
        TranscriptStatus::from_db_str(&self.transcript_status)
    }

    #[must_use]
    pub fn metadata_status(&self) -> MetadataStatus {
        MetadataStatus::from_db_str(&self.metadata_status)
    }

    #[must_use]
    pub fn file_search_status(&self) -> FileSearchStatus {
        FileSearchStatus::from_db_str(&self.file_search_status)
    }

    #[must_use]
    pub fn transcript_source(&self) -> Option<TranscriptSource> {
        match self.transcript_source.as_deref() {
            Some("youtube_captions") => Some(TranscriptSource::YoutubeCaptions),
            Some("model") => Some(TranscriptSource::Model),
            _ => None,
        }
    }

    /// Invariant 1: `download_status = completed` implies either a local
    /// file exists or the transcript came from YouTube captions (which
    /// never needed the audio downloaded in the first place).
    #[must_use]
    pub fn download_invariant_holds(&self, file_exists: bool) -> bool {
        self.download_status() != DownloadStatus::Completed
            || file_exists
            || self.transcript_source() == Some(TranscriptSource::YoutubeCaptions)
    }

    /// Invariant 2: a completed transcript has recoverable text, either
    /// inline or via the legacy sidecar file convention.
    #[must_use]
    pub fn transcript_invariant_holds(&self, legacy_file_readable: bool) -> bool {
        self.transcript_status() != TranscriptStatus::Completed
            || self.transcript_text.as_ref().is_some_and(|t| !t.is_empty())
            || legacy_file_readable
    }

    /// Invariant 3: an indexed file_search implies a resource name and a
    /// completed metadata stage.
    #[must_use]
    pub fn file_search_invariant_holds(&self) -> bool {
        self.file_search_status() != FileSearchStatus::Indexed
            || (self.resource_name.as_ref().is_some_and(|r| !r.is_empty())
                && self.metadata_status() == MetadataStatus::Completed)
    }

    #[must_use]
    pub fn is_ready_for_transcription(&self) -> bool {
        self.download_status() == DownloadStatus::Completed
            && self.transcript_status() == TranscriptStatus::Pending
    }

    #[must_use]
    pub fn is_ready_for_post_processing(&self) -> bool {
        self.transcript_status() == TranscriptStatus::Completed
            && (self.metadata_status() == MetadataStatus::Pending
                || self.file_search_status() == FileSearchStatus::Pending)
    }

    #[must_use]
    pub fn is_ready_for_cleanup(&self) -> bool {
        self.metadata_status() == MetadataStatus::Completed
            && self.file_search_status() == FileSearchStatus::Indexed
            && self.local_file_path.is_some()
    }
}
