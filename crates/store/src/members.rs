//! Room membership lookups.
//!
//! Membership is established by the room-management surface, not by the
//! realtime core; the gateway consults this directory before any room id
//! reaches the session registry.

use sqlx::SqlitePool;

use crate::error::StoreResult;

#[derive(Clone)]
pub struct MemberDirectory {
    pool: SqlitePool,
}

impl MemberDirectory {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// All room ids the user is a durable member of.
    pub async fn rooms_for_user(&self, user_id: &str) -> StoreResult<Vec<String>> {
        let rooms = sqlx::query_scalar::<_, String>(
            "SELECT room_id FROM room_members WHERE user_id = ? ORDER BY room_id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rooms)
    }

    pub async fn is_member(&self, room_id: &str, user_id: &str) -> StoreResult<bool> {
        let hit: Option<i64> = sqlx::query_scalar(
            "SELECT 1 FROM room_members WHERE room_id = ? AND user_id = ?",
        )
        .bind(room_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(hit.is_some())
    }

    /// Filter a caller-supplied room list down to rooms the user actually
    /// belongs to, preserving the caller's order.
    pub async fn authorized_rooms(
        &self,
        user_id: &str,
        requested: &[String],
    ) -> StoreResult<Vec<String>> {
        let mut authorized = Vec::with_capacity(requested.len());
        for room_id in requested {
            if self.is_member(room_id, user_id).await? {
                authorized.push(room_id.clone());
            }
        }
        Ok(authorized)
    }
}
