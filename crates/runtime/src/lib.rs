use std::sync::Arc;

use anyhow::Result;
use sqlx::SqlitePool;
use tokio::task::JoinHandle;
use tracing::info;

use parley_config::AppConfig;
use parley_realtime::Hub;
use parley_store::{prepare_database, IdentityDirectory, MemberDirectory, SqliteMessageStore};

pub mod telemetry {
    use anyhow::Result;
    use tracing_subscriber::{fmt::SubscriberBuilder, EnvFilter};

    pub fn init_tracing() -> Result<()> {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let subscriber = SubscriberBuilder::default()
            .with_env_filter(env_filter)
            .finish();

        tracing::subscriber::set_global_default(subscriber)
            .map_err(|error| anyhow::anyhow!("failed to set tracing subscriber: {error}"))
    }
}

/// Everything the server needs, wired together from configuration: the
/// database pool, the realtime hub over its sqlite store, and the lookup
/// directories the gateway authenticates and authorizes with.
#[derive(Clone)]
pub struct Services {
    pub pool: SqlitePool,
    pub hub: Arc<Hub<SqliteMessageStore>>,
    pub identity: IdentityDirectory,
    pub members: MemberDirectory,
}

impl Services {
    pub async fn initialise(config: &AppConfig) -> Result<Self> {
        let pool = prepare_database(&config.database).await?;

        let store = Arc::new(SqliteMessageStore::new(pool.clone()));
        let hub = Arc::new(Hub::new(store, config.realtime.clone()));
        let identity = IdentityDirectory::new(pool.clone());
        let members = MemberDirectory::new(pool.clone());

        info!(database = %config.database.url, "services initialised");

        Ok(Self {
            pool,
            hub,
            identity,
            members,
        })
    }

    /// Start the typing TTL sweeper. The returned handle can be aborted on
    /// shutdown; letting it drop keeps the task running for the life of the
    /// process, which is what the server wants.
    pub fn spawn_background_tasks(&self) -> JoinHandle<()> {
        self.hub.clone().spawn_typing_sweeper()
    }
}

pub async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(?error, "failed to listen for shutdown signal");
    }
    info!("shutdown signal received");
}
