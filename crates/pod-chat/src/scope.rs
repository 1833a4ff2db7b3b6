//! Chat turn scope and the metadata filters it compiles into (§4.I).
//!
//! Precedence (most specific first): episode > podcast > subscribed-only
//! > global. Filter literals are quote-escaped before interpolation,
//! since they're spliced directly into the document store's query
//! string.

use pod_db::Database;
use uuid::Uuid;

use crate::error::ChatError;

pub const TRANSCRIPT_DOC_TYPE: &str = "transcript";
pub const DESCRIPTION_DOC_TYPE: &str = "description";

/// Captured once per chat turn and shared by every tool call in it.
#[derive(Debug, Clone)]
pub struct ChatScope {
    pub user_id: Uuid,
    pub podcast_id: Option<Uuid>,
    pub episode_id: Option<Uuid>,
    pub subscribed_only: bool,
}

impl ChatScope {
    #[must_use]
    pub const fn global(user_id: Uuid) -> Self {
        Self { user_id, podcast_id: None, episode_id: None, subscribed_only: false }
    }

    #[must_use]
    pub const fn for_podcast(user_id: Uuid, podcast_id: Uuid) -> Self {
        Self { user_id, podcast_id: Some(podcast_id), episode_id: None, subscribed_only: false }
    }

    #[must_use]
    pub const fn for_episode(user_id: Uuid, podcast_id: Uuid, episode_id: Uuid) -> Self {
        Self { user_id, podcast_id: Some(podcast_id), episode_id: Some(episode_id), subscribed_only: false }
    }

    #[must_use]
    pub const fn subscribed_only(user_id: Uuid) -> Self {
        Self { user_id, podcast_id: None, episode_id: None, subscribed_only: true }
    }

    /// Builds the `doc_type = '...' AND <scope>` filter literal, resolving
    /// podcast/episode ids to the titles the indexer tagged documents
    /// with.
    pub(crate) async fn build_filter(&self, db: &Database, doc_type: &str) -> Result<String, ChatError> {
        let mut clauses = vec![format!("doc_type = '{}'", escape(doc_type))];

        if let Some(episode_id) = self.episode_id {
            let episode = db
                .episodes()
                .get_by_id(episode_id)
                .await?
                .ok_or(ChatError::EpisodeNotFound(episode_id))?;
            let podcast = db
                .podcasts()
                .get_by_id(episode.podcast_id)
                .await?
                .ok_or(ChatError::PodcastNotFound(episode.podcast_id))?;
            clauses.push(format!("podcast = '{}'", escape(&podcast.title)));
            clauses.push(format!("episode = '{}'", escape(&episode.title)));
        } else if let Some(podcast_id) = self.podcast_id {
            let podcast = db
                .podcasts()
                .get_by_id(podcast_id)
                .await?
                .ok_or(ChatError::PodcastNotFound(podcast_id))?;
            clauses.push(format!("podcast = '{}'", escape(&podcast.title)));
        } else if self.subscribed_only {
            let subscriptions = db.subscriptions().get_user_subscriptions(self.user_id).await?;
            let titles: Vec<String> =
                subscriptions.iter().map(|p| format!("podcast = '{}'", escape(&p.title))).collect();
            // No subscriptions: a filter no document can ever match, rather
            // than silently falling through to a global search.
            clauses.push(if titles.is_empty() { "1 = 0".to_string() } else { format!("({})", titles.join(" OR ")) });
        }

        Ok(clauses.join(" AND "))
    }
}

/// Escapes single quotes so a title can never break out of its filter
/// literal (§4.I: "filter literals have quotes escaped before
/// interpolation").
fn escape(value: &str) -> String {
    value.replace('\'', "''")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_embedded_quotes() {
        assert_eq!(escape("Bob's Show"), "Bob''s Show");
    }
}
