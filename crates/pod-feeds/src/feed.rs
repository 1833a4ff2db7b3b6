//! RSS/Atom feed parsing, producing podcast/episode records decoupled from
//! any particular feed dialect. Built on `feed-rs`, which already folds in
//! iTunes and Media RSS extensions as generic fields.

use chrono::{DateTime, Utc};
use feed_rs::model::{Entry, Feed, MediaContent, MediaObject};

use crate::error::FeedError;
use crate::html::{normalize_explicit, strip_html};

const AUDIO_EXTENSIONS: &[&str] = &["mp3", "m4a", "mp4", "ogg", "opus", "wav", "aac"];

#[derive(Debug, Clone)]
pub struct ParsedEpisode {
    pub guid: String,
    pub title: String,
    pub description: Option<String>,
    pub published_date: DateTime<Utc>,
    pub duration_seconds: Option<i32>,
    pub episode_number: Option<i32>,
    pub season_number: Option<i32>,
    pub enclosure_url: String,
    pub enclosure_type: Option<String>,
    pub enclosure_length: Option<i64>,
    pub explicit: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct ParsedPodcast {
    pub feed_url: String,
    pub title: String,
    pub description: Option<String>,
    pub website_url: Option<String>,
    pub author: Option<String>,
    pub language: Option<String>,
    pub image_url: Option<String>,
    pub episodes: Vec<ParsedEpisode>,
}

/// Parses raw feed bytes fetched from `feed_url` into a [`ParsedPodcast`].
///
/// Entries with no usable audio enclosure are silently skipped, per the
/// "skip entries lacking any audio enclosure" rule; everything else is
/// decoded and normalized (HTML stripped, duration and explicit flags
/// canonicalized, GUID fallback chain applied).
///
/// # Errors
///
/// Returns `FeedError::Malformed` if `feed-rs` cannot parse the bytes at all.
pub fn parse_feed(feed_url: &str, bytes: &[u8]) -> Result<ParsedPodcast, FeedError> {
    let feed: Feed =
        feed_rs::parser::parse(bytes).map_err(|e| FeedError::Malformed(e.to_string()))?;

    let title = feed
        .title
        .as_ref()
        .map(|t| strip_html(&t.content))
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| feed_url.to_string());

    let description = feed
        .description
        .as_ref()
        .map(|t| strip_html(&t.content))
        .filter(|t| !t.is_empty());

    let website_url = feed
        .links
        .iter()
        .find(|l| l.rel.as_deref() != Some("self"))
        .map(|l| l.href.clone());

    let author = feed.authors.first().map(|p| p.name.clone());
    let language = feed.language.clone();
    let image_url = feed.logo.as_ref().map(|i| i.uri.clone()).or_else(|| {
        feed.icon.as_ref().map(|i| i.uri.clone())
    });

    let episodes = feed
        .entries
        .iter()
        .filter_map(|entry| parse_episode(entry))
        .collect();

    Ok(ParsedPodcast {
        feed_url: feed_url.to_string(),
        title,
        description,
        website_url,
        author,
        language,
        image_url,
        episodes,
    })
}

fn parse_episode(entry: &Entry) -> Option<ParsedEpisode> {
    let (enclosure_url, enclosure_type, enclosure_length) = extract_enclosure(entry)?;

    let guid = entry
        .id
        .clone()
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| enclosure_url.clone());

    let title = entry
        .title
        .as_ref()
        .map(|t| strip_html(&t.content))
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| "Untitled".to_string());

    let description = entry
        .summary
        .as_ref()
        .map(|t| t.content.clone())
        .or_else(|| entry.content.as_ref().and_then(|c| c.body.clone()))
        .map(|body| strip_html(&body))
        .filter(|t| !t.is_empty());

    let published_date = entry.published.or(entry.updated).unwrap_or_else(Utc::now);

    let duration_seconds = entry
        .media
        .iter()
        .flat_map(|m| m.content.iter())
        .find_map(|c| c.duration)
        .map(|d| d.as_secs() as i32);

    // `feed-rs` surfaces unrecognized namespaced elements (including the
    // iTunes extensions) under `entry.extensions`, keyed by namespace then
    // element name, rather than as dedicated struct fields.
    let explicit = itunes_extension(entry, "explicit").and_then(|v| normalize_explicit(&v));
    let episode_number = itunes_extension(entry, "episode").and_then(|v| v.parse().ok());
    let season_number = itunes_extension(entry, "season").and_then(|v| v.parse().ok());

    Some(ParsedEpisode {
        guid,
        title,
        description,
        published_date,
        duration_seconds,
        episode_number,
        season_number,
        enclosure_url,
        enclosure_type,
        enclosure_length,
        explicit,
    })
}

/// Reads a single-valued `itunes:<name>` extension element off an entry,
/// e.g. `itunes:episode`, `itunes:season`, `itunes:explicit`.
fn itunes_extension(entry: &Entry, name: &str) -> Option<String> {
    entry
        .extensions
        .get("itunes")
        .and_then(|fields| fields.get(name))
        .and_then(|values| values.first())
        .and_then(|ext| ext.value.clone())
        .filter(|v| !v.is_empty())
}

/// Checks `entry.media[].content[]` first (Media RSS / iTunes extensions as
/// `feed-rs` exposes them), then falls back to `entry.links[]` with an
/// enclosure relation or an audio-looking media type.
fn extract_enclosure(entry: &Entry) -> Option<(String, Option<String>, Option<i64>)> {
    for media in &entry.media {
        if let Some((url, mime, len)) = extract_from_media(media) {
            return Some((url, mime, len));
        }
    }

    entry
        .links
        .iter()
        .find(|l| {
            l.rel.as_deref() == Some("enclosure")
                || is_audio_type(l.media_type.as_deref(), &l.href)
        })
        .map(|l| (l.href.clone(), l.media_type.clone(), l.length.map(|n| n as i64)))
}

fn extract_from_media(media: &MediaObject) -> Option<(String, Option<String>, Option<i64>)> {
    media
        .content
        .iter()
        .find(|c| matches_audio(c))
        .and_then(|c| {
            c.url.as_ref().map(|url| {
                (
                    url.to_string(),
                    c.content_type.as_ref().map(ToString::to_string),
                    c.size.map(|n| n as i64),
                )
            })
        })
}

fn matches_audio(content: &MediaContent) -> bool {
    let mime = content.content_type.as_ref().map(ToString::to_string);
    let url = content.url.as_ref().map(ToString::to_string).unwrap_or_default();
    is_audio_type(mime.as_deref(), &url)
}

/// `audio/*` matches directly; `application/octet-stream` defers to the
/// URL's extension; anything else is checked against the extension
/// whitelist too, so odd-but-known extensions on a loose content type
/// still qualify.
fn is_audio_type(mime_type: Option<&str>, url: &str) -> bool {
    if let Some(mime) = mime_type {
        let mime = mime.to_ascii_lowercase();
        if mime.starts_with("audio/") {
            return true;
        }
        if mime != "application/octet-stream" && !mime.is_empty() {
            return url_has_audio_extension(url);
        }
    }
    url_has_audio_extension(url)
}

fn url_has_audio_extension(url: &str) -> bool {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit('.')
        .next()
        .map(|ext| AUDIO_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audio_mime_prefix_matches() {
        assert!(is_audio_type(Some("audio/mpeg"), "https://x.test/ep"));
    }

    #[test]
    fn octet_stream_defers_to_extension() {
        assert!(is_audio_type(
            Some("application/octet-stream"),
            "https://x.test/ep.mp3"
        ));
        assert!(!is_audio_type(
            Some("application/octet-stream"),
            "https://x.test/ep.pdf"
        ));
    }

    #[test]
    fn non_audio_mime_with_audio_extension_defers_to_extension() {
        assert!(is_audio_type(
            Some("binary/octet"),
            "https://x.test/ep.mp3"
        ));
    }

    #[test]
    fn bare_url_extension_whitelist() {
        assert!(url_has_audio_extension("https://x.test/file.opus"));
        assert!(!url_has_audio_extension("https://x.test/file.txt"));
    }

    fn entry_with_itunes(fields: &[(&str, &str)]) -> Entry {
        let mut itunes = std::collections::HashMap::new();
        for (name, value) in fields {
            itunes.insert(
                (*name).to_string(),
                vec![feed_rs::model::Extension {
                    name: (*name).to_string(),
                    value: Some((*value).to_string()),
                    attrs: std::collections::HashMap::new(),
                    children: std::collections::HashMap::new(),
                }],
            );
        }
        let mut entry = Entry::default();
        entry.extensions.insert("itunes".to_string(), itunes);
        entry
    }

    #[test]
    fn itunes_episode_and_season_numbers_are_read() {
        let entry = entry_with_itunes(&[("episode", "12"), ("season", "3")]);
        assert_eq!(itunes_extension(&entry, "episode"), Some("12".to_string()));
        assert_eq!(itunes_extension(&entry, "season"), Some("3".to_string()));
        assert_eq!(itunes_extension(&entry, "explicit"), None);
    }

    #[test]
    fn itunes_explicit_flag_normalizes_through_html_helper() {
        let entry = entry_with_itunes(&[("explicit", "yes")]);
        let explicit = itunes_extension(&entry, "explicit").and_then(|v| normalize_explicit(&v));
        assert_eq!(explicit, Some(true));
    }
}
