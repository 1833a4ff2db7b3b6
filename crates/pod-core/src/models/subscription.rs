//! `UserSubscription` model — the many-to-many edge between users and podcasts.
//!
//! There is deliberately no "subscribed" flag anywhere else: a user is
//! subscribed to a podcast iff a row exists here (invariant 6).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserSubscription {
    pub user_id: Uuid,
    pub podcast_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl UserSubscription {
    #[must_use]
    pub fn new(user_id: Uuid, podcast_id: Uuid) -> Self {
        Self {
            user_id,
            podcast_id,
            created_at: Utc::now(),
        }
    }
}
