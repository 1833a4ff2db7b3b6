//! Conversation / chat-message repository.
//!
//! `Conversation` carries a denormalized `message_count` (§10.6),
//! incremented here whenever a `ChatMessage` is appended, so listing a
//! user's conversations doesn't need a `COUNT(*)` join.

use pod_core::{ChatMessage, Conversation};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

pub struct ConversationRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> ConversationRepo<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `DbError` if the insert fails.
    pub async fn create(&self, conversation: &Conversation) -> Result<(), DbError> {
        sqlx::query(
            r"
            INSERT INTO conversations (
                id, user_id, podcast_id, episode_id, title, message_count, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ",
        )
        .bind(conversation.id)
        .bind(conversation.user_id)
        .bind(conversation.podcast_id)
        .bind(conversation.episode_id)
        .bind(&conversation.title)
        .bind(conversation.message_count)
        .bind(conversation.created_at)
        .bind(conversation.updated_at)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `DbError` if the query fails.
    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<Conversation>, DbError> {
        let conversation =
            sqlx::query_as::<_, Conversation>("SELECT * FROM conversations WHERE id = $1")
                .bind(id)
                .fetch_optional(self.pool)
                .await?;
        Ok(conversation)
    }

    /// # Errors
    ///
    /// Returns `DbError` if the query fails.
    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Conversation>, DbError> {
        let conversations = sqlx::query_as::<_, Conversation>(
            "SELECT * FROM conversations WHERE user_id = $1 ORDER BY updated_at DESC",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(conversations)
    }

    /// Appends a message and bumps the conversation's `message_count` and
    /// `updated_at` in the same transaction.
    ///
    /// # Errors
    ///
    /// Returns `DbError` if either statement fails; the transaction rolls
    /// back atomically.
    pub async fn append_message(&self, message: &ChatMessage) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r"
            INSERT INTO chat_messages (id, conversation_id, role, content, citations, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ",
        )
        .bind(message.id)
        .bind(message.conversation_id)
        .bind(message.role)
        .bind(&message.content)
        .bind(&message.citations)
        .bind(message.created_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE conversations SET message_count = message_count + 1, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(message.conversation_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `DbError` if the query fails.
    pub async fn get_messages(&self, conversation_id: Uuid) -> Result<Vec<ChatMessage>, DbError> {
        let messages = sqlx::query_as::<_, ChatMessage>(
            "SELECT * FROM chat_messages WHERE conversation_id = $1 ORDER BY created_at",
        )
        .bind(conversation_id)
        .fetch_all(self.pool)
        .await?;
        Ok(messages)
    }
}
