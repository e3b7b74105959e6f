//! Token-to-identity resolution.
//!
//! Credential issuance lives elsewhere; this directory only reads the token
//! table the auth surface maintains.

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::error::StoreResult;

/// Identity attached to a connection at connect time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub user_id: String,
    pub username: String,
    pub avatar: Option<String>,
}

#[derive(Clone)]
pub struct IdentityDirectory {
    pool: SqlitePool,
}

impl IdentityDirectory {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Resolve a bearer token to the user behind it. `None` means the token
    /// is unknown and the connection must be refused.
    pub async fn resolve_token(&self, token: &str) -> StoreResult<Option<UserIdentity>> {
        let row: Option<(String, String, Option<String>)> = sqlx::query_as(
            r#"
            SELECT u.id, u.username, u.avatar
            FROM access_tokens t
            JOIN users u ON u.id = t.user_id
            WHERE t.token = ?
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(user_id, username, avatar)| UserIdentity {
            user_id,
            username,
            avatar,
        }))
    }
}
