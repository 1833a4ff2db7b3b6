//! The five retrieval tools a chat turn is given (§4.I).

use pod_db::Database;
use pod_pipeline::{DocumentStore, RetrievedChunk};
use uuid::Uuid;

use crate::error::ChatError;
use crate::scope::{ChatScope, DESCRIPTION_DOC_TYPE, TRANSCRIPT_DOC_TYPE};
use crate::summary::{EpisodeSummary, PodcastSummary};

const DEFAULT_SEARCH_LIMIT: usize = 10;

/// Bundles the Repository and document store behind one scope, so a
/// chat turn calls these methods the way a grounded-generation provider
/// would invoke function-calling tools.
pub struct ChatTools<D> {
    db: Database,
    store: D,
    scope: ChatScope,
}

impl<D: DocumentStore> ChatTools<D> {
    #[must_use]
    pub const fn new(db: Database, store: D, scope: ChatScope) -> Self {
        Self { db, store, scope }
    }

    /// # Errors
    ///
    /// Returns `ChatError` if scope resolution or the store query fails.
    pub async fn search_transcripts(&self, query: &str) -> Result<Vec<RetrievedChunk>, ChatError> {
        let filter = self.scope.build_filter(&self.db, TRANSCRIPT_DOC_TYPE).await?;
        Ok(self.store.search(query, &filter, DEFAULT_SEARCH_LIMIT).await?)
    }

    /// # Errors
    ///
    /// Returns `ChatError` if scope resolution or the store query fails.
    pub async fn search_podcast_descriptions(&self, query: &str) -> Result<Vec<RetrievedChunk>, ChatError> {
        let filter = self.scope.build_filter(&self.db, DESCRIPTION_DOC_TYPE).await?;
        Ok(self.store.search(query, &filter, DEFAULT_SEARCH_LIMIT).await?)
    }

    /// # Errors
    ///
    /// Returns `ChatError` if the query fails.
    pub async fn get_user_subscriptions(&self) -> Result<Vec<PodcastSummary>, ChatError> {
        let podcasts = self.db.subscriptions().get_user_subscriptions(self.scope.user_id).await?;
        Ok(podcasts.iter().map(PodcastSummary::from).collect())
    }

    /// # Errors
    ///
    /// Returns `ChatError` if the query fails.
    pub async fn get_podcast_info(&self, podcast_id: Uuid) -> Result<Option<PodcastSummary>, ChatError> {
        let podcast = self.db.podcasts().get_by_id(podcast_id).await?;
        Ok(podcast.as_ref().map(PodcastSummary::from))
    }

    /// # Errors
    ///
    /// Returns `ChatError` if the query fails.
    pub async fn get_episode_info(&self, episode_id: Uuid) -> Result<Option<EpisodeSummary>, ChatError> {
        let episode = self.db.episodes().get_by_id(episode_id).await?;
        Ok(episode.as_ref().map(EpisodeSummary::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pod_pipeline::PipelineError;

    struct StubStore;

    impl DocumentStore for StubStore {
        async fn search(&self, _query: &str, filter: &str, _limit: usize) -> Result<Vec<RetrievedChunk>, PipelineError> {
            Ok(vec![RetrievedChunk { title: filter.to_string(), text: String::new() }])
        }
    }

    #[test]
    fn scope_precedence_picks_episode_over_podcast() {
        let user_id = Uuid::now_v7();
        let podcast_id = Uuid::now_v7();
        let episode_id = Uuid::now_v7();
        let scope = ChatScope::for_episode(user_id, podcast_id, episode_id);
        assert_eq!(scope.episode_id, Some(episode_id));
        assert_eq!(scope.podcast_id, Some(podcast_id));
        assert!(!scope.subscribed_only);
    }

    #[allow(dead_code)]
    fn assert_tools_is_generic_over_store(db: Database) -> ChatTools<StubStore> {
        ChatTools::new(db, StubStore, ChatScope::global(Uuid::now_v7()))
    }
}
