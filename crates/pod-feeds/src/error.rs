//! Feed/OPML/YouTube adapter errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("malformed feed: {0}")]
    Malformed(String),

    #[error("unsupported url scheme: {0}")]
    UnsupportedScheme(String),

    #[error("malformed opml: {0}")]
    MalformedOpml(String),

    #[error("youtube api error: {0}")]
    YouTubeApi(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}
