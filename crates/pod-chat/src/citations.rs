//! Citation extraction from a grounded response's `grounding_chunks`
//! (§4.I), resolving each chunk's title against the Repository and
//! deduplicating by title (S5).

use pod_db::Database;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceType {
    Transcript,
    Description,
}

impl SourceType {
    const fn as_str(&self) -> &'static str {
        match self {
            Self::Transcript => "transcript",
            Self::Description => "description",
        }
    }
}

/// One grounding chunk as the grounded-generation provider reports it,
/// i.e. `candidates[0].grounding_metadata.grounding_chunks[*].retrieved_context`.
#[derive(Debug, Clone)]
pub struct GroundingChunk {
    pub title: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Citation {
    pub index: usize,
    pub source_type: &'static str,
    pub title: String,
    pub text: String,
    pub metadata: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub podcast_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub episode_id: Option<Uuid>,
}

struct Resolved {
    source_type: SourceType,
    metadata: serde_json::Value,
    podcast_id: Option<Uuid>,
    episode_id: Option<Uuid>,
}

/// Resolves and deduplicates `chunks` by title. A chunk resolves against
/// an episode's file-search display name (transcript) or a podcast's
/// description display name (description); unresolvable titles are
/// dropped rather than surfaced as unlabeled citations.
pub async fn extract_citations(db: &Database, chunks: &[GroundingChunk]) -> Vec<Citation> {
    let mut seen_titles = std::collections::HashSet::new();
    let mut citations = Vec::new();

    for chunk in chunks {
        if !seen_titles.insert(chunk.title.clone()) {
            continue;
        }

        let Some(resolved) = resolve_title(db, &chunk.title).await else { continue };

        citations.push(Citation {
            index: citations.len() + 1,
            source_type: resolved.source_type.as_str(),
            title: chunk.title.clone(),
            text: chunk.text.clone(),
            metadata: resolved.metadata,
            podcast_id: resolved.podcast_id,
            episode_id: resolved.episode_id,
        });
    }

    citations
}

async fn resolve_title(db: &Database, title: &str) -> Option<Resolved> {
    if let Ok(Some(episode)) = db.episodes().get_by_file_search_display_name(title).await {
        let metadata = serde_json::json!({
            "episode_title": episode.title,
            "published_date": episode.published_date,
            "hosts": episode.ai_hosts,
            "guests": episode.ai_guests,
            "keywords": episode.ai_keywords,
        });
        return Some(Resolved {
            source_type: SourceType::Transcript,
            metadata,
            podcast_id: Some(episode.podcast_id),
            episode_id: Some(episode.id),
        });
    }
    if let Ok(Some(podcast)) = db.podcasts().get_by_description_display_name(title).await {
        let metadata = serde_json::json!({
            "podcast_title": podcast.title,
            "author": podcast.author,
        });
        return Some(Resolved {
            source_type: SourceType::Description,
            metadata,
            podcast_id: Some(podcast.id),
            episode_id: None,
        });
    }
    None
}
