//! Configuration with layered resolution using figment.
//!
//! Resolution order (highest priority last):
//! 1. Built-in defaults
//! 2. User config: `~/.config/brands-rw-neo4j/config.toml` (XDG) or platform config dir
//! 3. Service config: `brands-rw-neo4j.toml`, or the file passed with `--config`
//! 4. Environment variables: `BRANDS_RW_*`, nested keys separated by `__`
//! 5. Command line flags and their deployment env vars (`NEO_URL`, `APP_PORT`, ...)
//!
//! # Example
//!
//! ```toml
//! [neo4j]
//! url = "bolt://neo4j.internal:7687"
//! user = "neo4j"
//! batch_size = 512
//!
//! [server]
//! port = 8080
//! env = "prod"
//!
//! [metrics]
//! graphite_tcp_address = "graphite.internal:2003"
//! graphite_prefix = "content.prod.brands.rw.neo4j"
//!
//! [schema]
//! revision = 3
//! ```

use std::ops::Deref;
use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::graph::DEFAULT_BATCH_SIZE;

/// Default service config file looked up in the working directory.
pub const SERVICE_CONFIG_FILE: &str = "brands-rw-neo4j.toml";

/// Boxed wrapper for figment::Error to reduce Result size on the stack.
#[derive(Debug)]
pub struct ConfigError(Box<figment::Error>);

impl Deref for ConfigError {
    type Target = figment::Error;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self(Box::new(err))
    }
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub neo4j: Neo4jConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub schema: SchemaSettings,
}

/// Neo4j connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Neo4jConfig {
    /// Bolt URI, e.g. `bolt://localhost:7687`.
    pub url: String,
    pub user: String,
    /// Password; absent for databases running without auth.
    pub password: Option<String>,
    /// Maximum number of statements sent in one transaction.
    pub batch_size: usize,
    /// Size of the driver's connection pool.
    pub max_connections: usize,
}

impl Default for Neo4jConfig {
    fn default() -> Self {
        Self {
            url: "bolt://localhost:7687".to_string(),
            user: "neo4j".to_string(),
            password: None,
            batch_size: DEFAULT_BATCH_SIZE,
            max_connections: 16,
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    /// Deployment environment name, reported in logs and build info.
    pub env: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            env: "local".to_string(),
        }
    }
}

/// Metrics reporting settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Graphite carbon endpoint (`host:port`). Reporting is off when unset.
    pub graphite_tcp_address: Option<String>,
    /// Prefix prepended to every metric path sent to Graphite.
    pub graphite_prefix: String,
    /// Periodically log the metric registry.
    pub log_metrics: bool,
    /// Seconds between Graphite pushes.
    pub graphite_interval_secs: u64,
    /// Seconds between metric log lines.
    pub log_interval_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            graphite_tcp_address: None,
            graphite_prefix: String::new(),
            log_metrics: false,
            graphite_interval_secs: 5,
            log_interval_secs: 60,
        }
    }
}

/// Graph schema settings, turned into a
/// [`SchemaConfig`](crate::models::SchemaConfig) at startup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaSettings {
    /// Schema revision number; the latest revision when unset.
    pub revision: Option<u32>,
    /// Replaces the revision's identifier authority table when set.
    pub authorities: Option<Vec<AuthoritySetting>>,
}

/// One identifier authority: JSON key and graph label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthoritySetting {
    pub key: String,
    pub label: String,
}

impl Config {
    /// Load config with layered resolution, applying `overrides` last.
    pub fn load<T: Serialize>(
        config_file: Option<&Path>,
        overrides: &T,
    ) -> Result<Self, ConfigError> {
        Self::figment(config_file)
            .merge(Serialized::defaults(overrides))
            .extract()
            .map_err(ConfigError::from)
    }

    /// The layered figment without command line overrides.
    pub fn figment(config_file: Option<&Path>) -> Figment {
        let service_config = config_file
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(SERVICE_CONFIG_FILE));

        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(Self::user_config_path()))
            .merge(Toml::file(service_config))
            .merge(Env::prefixed("BRANDS_RW_").split("__"))
    }

    /// User config path: ~/.config/brands-rw-neo4j/config.toml (XDG) or platform config dir.
    fn user_config_path() -> PathBuf {
        if let Some(home) = dirs::home_dir() {
            let xdg_path = home
                .join(".config")
                .join("brands-rw-neo4j")
                .join("config.toml");
            if xdg_path.exists() {
                return xdg_path;
            }
        }
        dirs::config_dir()
            .map(|p| p.join("brands-rw-neo4j").join("config.toml"))
            .unwrap_or_default()
    }
}
