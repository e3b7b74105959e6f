use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

const DEFAULT_CONFIG_FILES: &[&str] = &[
    "parley.toml",
    "config/parley.toml",
    "crates/config/parley.toml",
    "../parley.toml",
    "../config/parley.toml",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub database: DatabaseConfig,
    pub realtime: RealtimeConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            http: HttpConfig::default(),
            database: DatabaseConfig::default(),
            realtime: RealtimeConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub address: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: 5050,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://parley.db".to_string(),
            max_connections: 10,
        }
    }
}

/// Tunables for the realtime coordination core.
///
/// ```
/// use parley_config::RealtimeConfig;
///
/// let realtime = RealtimeConfig::default();
/// assert_eq!(realtime.typing_ttl_seconds, 10);
/// assert_eq!(realtime.typing_sweep_interval_seconds, 5);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// A typing entry older than this is evicted by the sweep.
    #[serde(default = "RealtimeConfig::default_typing_ttl")]
    pub typing_ttl_seconds: u64,
    /// Interval between typing sweep ticks.
    #[serde(default = "RealtimeConfig::default_sweep_interval")]
    pub typing_sweep_interval_seconds: u64,
    /// Maximum accepted message content length, in characters.
    #[serde(default = "RealtimeConfig::default_max_content_length")]
    pub max_content_length: usize,
    /// Outbound event buffer per connected session.
    #[serde(default = "RealtimeConfig::default_session_buffer")]
    pub session_buffer: usize,
}

impl RealtimeConfig {
    const fn default_typing_ttl() -> u64 {
        10
    }

    const fn default_sweep_interval() -> u64 {
        5
    }

    const fn default_max_content_length() -> usize {
        4000
    }

    const fn default_session_buffer() -> usize {
        100
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            typing_ttl_seconds: Self::default_typing_ttl(),
            typing_sweep_interval_seconds: Self::default_sweep_interval(),
            max_content_length: Self::default_max_content_length(),
            session_buffer: Self::default_session_buffer(),
        }
    }
}

/// Load the application configuration by combining defaults, files, and environment overrides.
///
/// ```
/// use parley_config::load;
///
/// std::env::remove_var("PARLEY_CONFIG");
///
/// let config = load().expect("configuration should load with defaults");
/// assert!(!config.http.address.is_empty());
/// ```
pub fn load() -> anyhow::Result<AppConfig> {
    let defaults = AppConfig::default();

    let mut builder = config::Config::builder();
    builder = builder
        .set_default("http.address", defaults.http.address.clone())
        .unwrap()
        .set_default("http.port", i64::from(defaults.http.port))
        .unwrap()
        .set_default("database.url", defaults.database.url.clone())
        .unwrap()
        .set_default(
            "database.max_connections",
            i64::from(defaults.database.max_connections),
        )
        .unwrap()
        .set_default(
            "realtime.typing_ttl_seconds",
            defaults.realtime.typing_ttl_seconds as i64,
        )
        .unwrap()
        .set_default(
            "realtime.typing_sweep_interval_seconds",
            defaults.realtime.typing_sweep_interval_seconds as i64,
        )
        .unwrap()
        .set_default(
            "realtime.max_content_length",
            defaults.realtime.max_content_length as i64,
        )
        .unwrap()
        .set_default(
            "realtime.session_buffer",
            defaults.realtime.session_buffer as i64,
        )
        .unwrap();

    let environment_overrides = config::Environment::with_prefix("PARLEY").separator("__");

    let mut config_file_attached = false;

    if let Ok(path) = std::env::var("PARLEY_CONFIG") {
        builder = builder.add_source(config::File::from(PathBuf::from(&path)));
        config_file_attached = true;
        debug!(path, "loading configuration via PARLEY_CONFIG");
    } else if let Ok(cwd) = std::env::current_dir() {
        let fallback = DEFAULT_CONFIG_FILES
            .iter()
            .map(|candidate| cwd.join(candidate))
            .find(|path| path.exists());

        if let Some(path) = fallback {
            debug!(path = %path.display(), "loading configuration file");
            builder = builder.add_source(config::File::from(path));
            config_file_attached = true;
        }
    }

    if !config_file_attached {
        debug!("no configuration file found, relying on defaults and environment overrides");
    }

    builder = builder.add_source(environment_overrides);

    let cfg = builder.build().context("unable to build configuration")?;

    let config = cfg
        .try_deserialize::<AppConfig>()
        .context("invalid configuration")?;

    debug!(?config, "loaded backend configuration");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_typing_timings() {
        let config = AppConfig::default();
        assert_eq!(config.realtime.typing_ttl_seconds, 10);
        assert_eq!(config.realtime.typing_sweep_interval_seconds, 5);
        assert!(config.realtime.max_content_length > 0);
    }

    #[test]
    fn default_database_is_sqlite() {
        let config = AppConfig::default();
        assert!(config.database.url.starts_with("sqlite://"));
    }
}
