//! Domain models

mod conversation;
mod email_content;
mod episode;
mod podcast;
mod stage;
mod subscription;
mod user;

pub use conversation::{ChatMessage, ChatRole, Conversation};
pub use email_content::{EmailContent, PodcastType, StorySummary};
pub use episode::{
    DownloadStatus, Episode, FileSearchStatus, MetadataStatus, SourceType, TranscriptSource,
    TranscriptStatus,
};
pub use podcast::{DescriptionIndexStatus, Podcast};
pub use stage::Stage;
pub use subscription::UserSubscription;
pub use user::User;
