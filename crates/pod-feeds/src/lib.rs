//! Pure adapters: turn feed/OPML bytes and YouTube API responses into
//! parsed podcast/episode records. Nothing here touches a database or the
//! filesystem; callers own persistence.

mod duration;
mod error;
mod feed;
mod html;
mod opml;
mod youtube;

pub use duration::{normalize_duration, parse_iso8601_duration};
pub use error::FeedError;
pub use feed::{parse_feed, ParsedEpisode, ParsedPodcast};
pub use html::{decode_entities, normalize_explicit, rewrite_feed_scheme, strip_html};
pub use opml::{import_opml, OpmlFeed, OpmlImportResult};
pub use youtube::{ParsedYouTubeVideo, YouTubeChannel, YouTubeClient, timedtext_caption_url};
