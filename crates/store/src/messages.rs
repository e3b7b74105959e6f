//! Message persistence: the durability point of the ingest pipeline.

use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::entities::{FileInfo, MessageType, NewMessage, Reaction, StoredMessage};
use crate::error::{StoreError, StoreResult};

/// The durable store the realtime core coordinates against.
///
/// `create_message` is the durability point for the ingest pipeline; a
/// message may only be broadcast after it returns. `get_message` returns
/// `None` for absent or soft-deleted messages.
pub trait MessageStore: Send + Sync {
    async fn create_message(&self, new: NewMessage) -> StoreResult<StoredMessage>;
    async fn get_message(&self, message_id: &str) -> StoreResult<Option<StoredMessage>>;
    async fn update_reactions(&self, message_id: &str, reactions: &[Reaction]) -> StoreResult<()>;
}

/// SQLite-backed message store.
#[derive(Clone)]
pub struct SqliteMessageStore {
    pool: SqlitePool,
}

impl SqliteMessageStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_message(row: &sqlx::sqlite::SqliteRow) -> StoreResult<StoredMessage> {
        let message_type: String = row.try_get("message_type")?;
        let reactions_json: String = row.try_get("reactions")?;
        let file_json: Option<String> = row.try_get("file_info")?;
        let deleted: i64 = row.try_get("deleted")?;

        let reactions: Vec<Reaction> = serde_json::from_str(&reactions_json)?;
        let file: Option<FileInfo> = match file_json {
            Some(json) => Some(serde_json::from_str(&json)?),
            None => None,
        };

        Ok(StoredMessage {
            id: row.try_get("id")?,
            room_id: row.try_get("room_id")?,
            sender_id: row.try_get("sender_id")?,
            sender_username: row.try_get("sender_username")?,
            sender_avatar: row.try_get("sender_avatar")?,
            content: row.try_get("content")?,
            message_type: MessageType::parse(&message_type).unwrap_or_default(),
            reply_to: row.try_get("reply_to")?,
            file,
            reactions,
            deleted: deleted != 0,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl MessageStore for SqliteMessageStore {
    async fn create_message(&self, new: NewMessage) -> StoreResult<StoredMessage> {
        let id = Uuid::new_v4().to_string();
        let now = chrono::Utc::now().to_rfc3339();
        let file_json = match &new.file {
            Some(file) => Some(serde_json::to_string(file)?),
            None => None,
        };

        sqlx::query(
            r#"
            INSERT INTO messages (id, room_id, sender_id, sender_username, sender_avatar,
                                  content, message_type, reply_to, file_info, reactions,
                                  deleted, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, '[]', 0, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&new.room_id)
        .bind(&new.sender_id)
        .bind(&new.sender_username)
        .bind(&new.sender_avatar)
        .bind(&new.content)
        .bind(new.message_type.as_str())
        .bind(&new.reply_to)
        .bind(&file_json)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(StoredMessage {
            id,
            room_id: new.room_id,
            sender_id: new.sender_id,
            sender_username: new.sender_username,
            sender_avatar: new.sender_avatar,
            content: new.content,
            message_type: new.message_type,
            reply_to: new.reply_to,
            file: new.file,
            reactions: Vec::new(),
            deleted: false,
            created_at: now.clone(),
            updated_at: now,
        })
    }

    async fn get_message(&self, message_id: &str) -> StoreResult<Option<StoredMessage>> {
        let row = sqlx::query(
            r#"
            SELECT id, room_id, sender_id, sender_username, sender_avatar, content,
                   message_type, reply_to, file_info, reactions, deleted,
                   created_at, updated_at
            FROM messages
            WHERE id = ? AND deleted = 0
            "#,
        )
        .bind(message_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_message).transpose()
    }

    async fn update_reactions(&self, message_id: &str, reactions: &[Reaction]) -> StoreResult<()> {
        let reactions_json = serde_json::to_string(reactions)?;
        let now = chrono::Utc::now().to_rfc3339();

        let result = sqlx::query(
            "UPDATE messages SET reactions = ?, updated_at = ? WHERE id = ? AND deleted = 0",
        )
        .bind(&reactions_json)
        .bind(&now)
        .bind(message_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::message_not_found(message_id));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::memory_pool;

    fn text_message(room: &str, sender: &str, content: &str) -> NewMessage {
        NewMessage {
            room_id: room.to_string(),
            sender_id: sender.to_string(),
            sender_username: sender.to_string(),
            sender_avatar: None,
            content: content.to_string(),
            message_type: MessageType::Text,
            reply_to: None,
            file: None,
        }
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let store = SqliteMessageStore::new(memory_pool().await);

        let created = store
            .create_message(text_message("general", "u1", "hi"))
            .await
            .unwrap();

        let fetched = store.get_message(&created.id).await.unwrap().unwrap();
        assert_eq!(fetched, created);
        assert!(fetched.reactions.is_empty());
    }

    #[tokio::test]
    async fn get_unknown_message_returns_none() {
        let store = SqliteMessageStore::new(memory_pool().await);
        assert!(store.get_message("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_reactions_persists_full_list() {
        let store = SqliteMessageStore::new(memory_pool().await);
        let created = store
            .create_message(text_message("general", "u1", "hi"))
            .await
            .unwrap();

        let reactions = vec![Reaction {
            user_id: "u2".to_string(),
            emoji: "👍".to_string(),
            reacted_at: chrono::Utc::now().to_rfc3339(),
        }];
        store
            .update_reactions(&created.id, &reactions)
            .await
            .unwrap();

        let fetched = store.get_message(&created.id).await.unwrap().unwrap();
        assert_eq!(fetched.reactions, reactions);
    }

    #[tokio::test]
    async fn update_reactions_on_unknown_message_fails() {
        let store = SqliteMessageStore::new(memory_pool().await);
        let result = store.update_reactions("missing", &[]).await;
        assert!(matches!(result, Err(StoreError::MessageNotFound { .. })));
    }

    #[tokio::test]
    async fn soft_deleted_message_is_invisible() {
        let pool = memory_pool().await;
        let store = SqliteMessageStore::new(pool.clone());
        let created = store
            .create_message(text_message("general", "u1", "hi"))
            .await
            .unwrap();

        sqlx::query("UPDATE messages SET deleted = 1 WHERE id = ?")
            .bind(&created.id)
            .execute(&pool)
            .await
            .unwrap();

        assert!(store.get_message(&created.id).await.unwrap().is_none());
        let result = store.update_reactions(&created.id, &[]).await;
        assert!(matches!(result, Err(StoreError::MessageNotFound { .. })));
    }

    #[tokio::test]
    async fn file_message_round_trips_metadata() {
        let store = SqliteMessageStore::new(memory_pool().await);
        let mut new = text_message("general", "u1", "report.pdf");
        new.message_type = MessageType::File;
        new.file = Some(FileInfo {
            name: "report.pdf".to_string(),
            mime_type: "application/pdf".to_string(),
            size: 1024,
            url: "https://files.example/report.pdf".to_string(),
        });

        let created = store.create_message(new).await.unwrap();
        let fetched = store.get_message(&created.id).await.unwrap().unwrap();
        assert_eq!(fetched.file.as_ref().unwrap().mime_type, "application/pdf");
        assert_eq!(fetched.message_type, MessageType::File);
    }
}
