use std::path::Path;

use anyhow::{Context, Result};
use tempfile::TempDir;

use parley_config::AppConfig;
use parley_runtime::Services;
use parley_store::{MessageType, UserIdentity};

fn sqlite_url(path: &Path) -> String {
    format!("sqlite://{}", path.to_string_lossy())
}

fn build_config(database_url: String) -> AppConfig {
    let mut config = AppConfig::default();
    config.database.url = database_url;
    config.database.max_connections = 4;
    config
}

async fn initialise(config: &AppConfig) -> Result<Services> {
    Services::initialise(config)
        .await
        .context("failed to initialise services")
}

#[tokio::test(flavor = "multi_thread")]
async fn initialise_applies_the_schema() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("runtime/init.db");
    let config = build_config(sqlite_url(&db_path));

    let services = initialise(&config).await?;
    for table in ["users", "access_tokens", "room_members", "messages"] {
        let found: Option<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?",
        )
        .bind(table)
        .fetch_optional(&services.pool)
        .await?;
        assert_eq!(found.as_deref(), Some(table));
    }

    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn hub_persists_through_the_wired_store() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("runtime/hub.db");
    let config = build_config(sqlite_url(&db_path));

    let services = initialise(&config).await?;

    let (session_id, _events) = services
        .hub
        .connect(UserIdentity {
            user_id: "u1".to_string(),
            username: "alice".to_string(),
            avatar: None,
        })
        .await;
    services
        .hub
        .join_rooms(session_id, vec!["general".to_string()])
        .await;

    let message = services
        .hub
        .send_message(
            session_id,
            "general".to_string(),
            "wired end to end".to_string(),
            MessageType::Text,
            None,
        )
        .await?;

    let content: String = sqlx::query_scalar("SELECT content FROM messages WHERE id = ?")
        .bind(&message.id)
        .fetch_one(&services.pool)
        .await?;
    assert_eq!(content, "wired end to end");

    Ok(())
}
