//! Database layer for the podcast ingestion pipeline.
//!
//! `Database` wraps a `PgPool` and hands out short-lived repository
//! handles, one per aggregate, mirroring the component table's single
//! Repository responsibility (§4.A): every write goes through one of
//! these repos, and every repo method commits its own transaction.

mod error;
mod repos;

pub use error::DbError;
pub use repos::{
    ConversationRepo, EpisodeRepo, MetadataPayload, PodcastRepo, StageCounts, SubscriptionRepo, UserRepo,
};

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

/// Database connection wrapper.
#[derive(Clone)]
pub struct Database(PgPool);

impl Database {
    /// Connect to the database with the given URL.
    ///
    /// # Errors
    ///
    /// Returns `DbError` if the connection fails.
    pub async fn connect(url: &str) -> Result<Self, DbError> {
        let pool = PgPoolOptions::new().max_connections(10).connect(url).await?;
        Ok(Self(pool))
    }

    /// Wrap an already-constructed pool (used by tests against a local
    /// test database).
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self(pool)
    }

    /// Get the underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.0
    }

    #[must_use]
    pub const fn podcasts(&self) -> PodcastRepo<'_> {
        PodcastRepo::new(&self.0)
    }

    #[must_use]
    pub const fn episodes(&self) -> EpisodeRepo<'_> {
        EpisodeRepo::new(&self.0)
    }

    #[must_use]
    pub const fn users(&self) -> UserRepo<'_> {
        UserRepo::new(&self.0)
    }

    #[must_use]
    pub const fn subscriptions(&self) -> SubscriptionRepo<'_> {
        SubscriptionRepo::new(&self.0)
    }

    #[must_use]
    pub const fn conversations(&self) -> ConversationRepo<'_> {
        ConversationRepo::new(&self.0)
    }
}
