use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row};

use procura_core::domain::conversation::{
    preview_of, Conversation, ConversationId, ConversationStatus, ConversationSummary, Message,
    MessageRole, UserId, UNTITLED_CONVERSATION,
};

use super::{ConversationStore, RepositoryError};
use crate::DbPool;

pub struct SqlConversationStore {
    pool: DbPool,
}

impl SqlConversationStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn load(
        &self,
        id: &ConversationId,
    ) -> Result<Option<Conversation>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, user_id, title, status, last_message_preview, created_at, updated_at
             FROM conversation
             WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let message_rows = sqlx::query(
            "SELECT role, content, attachment_json, proposed_call_json, created_at
             FROM conversation_message
             WHERE conversation_id = ?
             ORDER BY seq ASC",
        )
        .bind(&id.0)
        .fetch_all(&self.pool)
        .await?;

        let messages =
            message_rows.into_iter().map(message_from_row).collect::<Result<Vec<_>, _>>()?;

        Ok(Some(conversation_from_row(row, messages)?))
    }
}

#[async_trait::async_trait]
impl ConversationStore for SqlConversationStore {
    async fn create(&self, user_id: Option<UserId>) -> Result<Conversation, RepositoryError> {
        let conversation = Conversation::new(user_id);

        sqlx::query(
            "INSERT INTO conversation
                (id, user_id, title, status, last_message_preview, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&conversation.id.0)
        .bind(conversation.user_id.as_ref().map(|user| user.0.as_str()))
        .bind(&conversation.title)
        .bind(conversation.status.as_str())
        .bind(&conversation.last_message_preview)
        .bind(conversation.created_at)
        .bind(conversation.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(conversation)
    }

    async fn find(
        &self,
        id: &ConversationId,
        user_id: Option<&UserId>,
    ) -> Result<Option<Conversation>, RepositoryError> {
        let conversation = self.load(id).await?;
        Ok(conversation.filter(|conversation| match user_id {
            Some(user) => conversation.user_id.as_ref() == Some(user),
            None => conversation.user_id.is_none(),
        }))
    }

    async fn append_message(
        &self,
        id: &ConversationId,
        message: Message,
    ) -> Result<Conversation, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query("SELECT title FROM conversation WHERE id = ?")
            .bind(&id.0)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(existing) = existing else {
            return Err(RepositoryError::NotFound {
                entity: "conversation",
                id: id.0.clone(),
            });
        };
        let title: String = existing.try_get("title")?;

        let next_seq: i64 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(seq), -1) + 1 FROM conversation_message WHERE conversation_id = ?",
        )
        .bind(&id.0)
        .fetch_one(&mut *tx)
        .await?;

        let attachment_json = message
            .attachment
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|error| RepositoryError::Decode(error.to_string()))?;
        let proposed_call_json = message
            .proposed_call
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|error| RepositoryError::Decode(error.to_string()))?;

        sqlx::query(
            "INSERT INTO conversation_message
                (conversation_id, seq, role, content, attachment_json, proposed_call_json, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id.0)
        .bind(next_seq)
        .bind(message.role.as_str())
        .bind(&message.content)
        .bind(attachment_json)
        .bind(proposed_call_json)
        .bind(message.created_at)
        .execute(&mut *tx)
        .await?;

        let new_title = if title == UNTITLED_CONVERSATION && message.role == MessageRole::User {
            preview_of(&message.content)
        } else {
            title
        };

        sqlx::query(
            "UPDATE conversation SET title = ?, last_message_preview = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&new_title)
        .bind(message.preview())
        .bind(Utc::now())
        .bind(&id.0)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        self.load(id).await?.ok_or_else(|| RepositoryError::NotFound {
            entity: "conversation",
            id: id.0.clone(),
        })
    }

    async fn list_recent(
        &self,
        user_id: &UserId,
        limit: u32,
    ) -> Result<Vec<ConversationSummary>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, title, status, last_message_preview, updated_at
             FROM conversation
             WHERE user_id = ?
             ORDER BY updated_at DESC
             LIMIT ?",
        )
        .bind(&user_id.0)
        .bind(i64::from(limit.max(1)))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(summary_from_row).collect()
    }

    async fn touch(&self, id: &ConversationId, preview: &str) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("UPDATE conversation SET last_message_preview = ?, updated_at = ? WHERE id = ?")
                .bind(preview_of(preview))
                .bind(Utc::now())
                .bind(&id.0)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound { entity: "conversation", id: id.0.clone() });
        }
        Ok(())
    }

    async fn set_status(
        &self,
        id: &ConversationId,
        status: ConversationStatus,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE conversation SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(Utc::now())
            .bind(&id.0)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound { entity: "conversation", id: id.0.clone() });
        }
        Ok(())
    }
}

fn conversation_from_row(
    row: SqliteRow,
    messages: Vec<Message>,
) -> Result<Conversation, RepositoryError> {
    let status_raw: String = row.try_get("status")?;
    let status = ConversationStatus::parse(&status_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown conversation status `{status_raw}`")))?;

    Ok(Conversation {
        id: ConversationId(row.try_get("id")?),
        user_id: row.try_get::<Option<String>, _>("user_id")?.map(UserId),
        title: row.try_get("title")?,
        status,
        last_message_preview: row.try_get("last_message_preview")?,
        messages,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
    })
}

fn message_from_row(row: SqliteRow) -> Result<Message, RepositoryError> {
    let role_raw: String = row.try_get("role")?;
    let role = MessageRole::parse(&role_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown message role `{role_raw}`")))?;

    let attachment = row
        .try_get::<Option<String>, _>("attachment_json")?
        .map(|raw| serde_json::from_str(&raw))
        .transpose()
        .map_err(|error| RepositoryError::Decode(error.to_string()))?;
    let proposed_call = row
        .try_get::<Option<String>, _>("proposed_call_json")?
        .map(|raw| serde_json::from_str(&raw))
        .transpose()
        .map_err(|error| RepositoryError::Decode(error.to_string()))?;

    Ok(Message {
        role,
        content: row.try_get("content")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        attachment,
        proposed_call,
    })
}

fn summary_from_row(row: SqliteRow) -> Result<ConversationSummary, RepositoryError> {
    let status_raw: String = row.try_get("status")?;
    let status = ConversationStatus::parse(&status_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown conversation status `{status_raw}`")))?;

    Ok(ConversationSummary {
        id: ConversationId(row.try_get("id")?),
        title: row.try_get("title")?,
        status,
        last_message_preview: row.try_get("last_message_preview")?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
    })
}
