//! User model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub external_id: String,
    pub email: String,
    pub name: Option<String>,
    pub is_admin: bool,
    pub email_digest_enabled: bool,
    pub email_digest_hour: i32,
    pub timezone: String,
    pub last_email_digest_sent: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    #[must_use]
    pub fn new(external_id: String, email: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            external_id,
            email,
            name: None,
            is_admin: false,
            email_digest_enabled: true,
            email_digest_hour: 8,
            timezone: "UTC".to_string(),
            last_email_digest_sent: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: String) -> Self {
        self.name = Some(name);
        self
    }

    /// Whether this user is due a digest check: enabled, and either
    /// never sent one or the last one was at least 20 hours ago. Does
    /// not check the timezone-local delivery hour; see
    /// `pod_pipeline::digest`.
    #[must_use]
    pub fn is_due_for_digest_check(&self, now: DateTime<Utc>) -> bool {
        if !self.email_digest_enabled {
            return false;
        }
        match self.last_email_digest_sent {
            None => true,
            Some(last) => now - last >= chrono::Duration::hours(20),
        }
    }
}
