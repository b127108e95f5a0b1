//! CLI module for the brands writer.
//!
//! Subcommands:
//! - `serve`: Run the HTTP service (default when no subcommand is given)
//! - `init`: Create the Neo4j indexes and constraints, then exit
//!
//! Flags fall back to the environment variables used by existing
//! deployments (`NEO_URL`, `APP_PORT`, `BATCH_SIZE`, ...).

mod init;
mod serve;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use crate::config::{Config, ConfigError};

/// Brands writer - RESTful API for managing Brands in Neo4j
#[derive(Parser)]
#[command(name = "brands-rw-neo4j")]
#[command(about = "A RESTful API for managing Brands in neo4j")]
#[command(version)]
pub struct App {
    /// Run in verbose mode
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a TOML config file (defaults to ./brands-rw-neo4j.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub settings: Settings,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP service
    Serve,

    /// Create indexes and constraints, then exit
    Init,
}

/// Settings that override the layered configuration.
///
/// Only flags that were given (or whose env var is set) are applied.
#[derive(Args, Debug, Default)]
pub struct Settings {
    /// Neo4j Bolt URL
    #[arg(long = "neo-url", env = "NEO_URL", global = true)]
    pub neo_url: Option<String>,

    /// Neo4j user
    #[arg(long = "neo-user", env = "NEO_USER", global = true)]
    pub neo_user: Option<String>,

    /// Neo4j password
    #[arg(long = "neo-password", env = "NEO_PASSWORD", global = true, hide_env_values = true)]
    pub neo_password: Option<String>,

    /// Port to listen on
    #[arg(long, env = "APP_PORT", global = true)]
    pub port: Option<u16>,

    /// Maximum number of statements to execute per batch
    #[arg(long = "batch-size", alias = "batchSize", env = "BATCH_SIZE", global = true)]
    pub batch_size: Option<usize>,

    /// Graphite TCP address, e.g. graphite.ft.com:2003; leave unset to disable
    #[arg(
        long = "graphite-tcp-address",
        alias = "graphiteTCPAddress",
        env = "GRAPHITE_ADDRESS",
        global = true
    )]
    pub graphite_tcp_address: Option<String>,

    /// Prefix for Graphite metric paths
    #[arg(
        long = "graphite-prefix",
        alias = "graphitePrefix",
        env = "GRAPHITE_PREFIX",
        global = true
    )]
    pub graphite_prefix: Option<String>,

    /// Periodically log metrics
    #[arg(
        long = "log-metrics",
        alias = "logMetrics",
        env = "LOG_METRICS",
        global = true,
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    pub log_metrics: Option<bool>,

    /// Environment this app is running in
    #[arg(long, env = "APP_ENV", global = true)]
    pub env: Option<String>,
}

#[derive(Serialize)]
struct Overrides<'a> {
    neo4j: Neo4jOverrides<'a>,
    server: ServerOverrides<'a>,
    metrics: MetricsOverrides<'a>,
}

#[derive(Serialize)]
struct Neo4jOverrides<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    password: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    batch_size: Option<usize>,
}

#[derive(Serialize)]
struct ServerOverrides<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    env: Option<&'a str>,
}

#[derive(Serialize)]
struct MetricsOverrides<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    graphite_tcp_address: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    graphite_prefix: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    log_metrics: Option<bool>,
}

impl Settings {
    fn overrides(&self) -> Overrides<'_> {
        Overrides {
            neo4j: Neo4jOverrides {
                url: self.neo_url.as_deref(),
                user: self.neo_user.as_deref(),
                password: self.neo_password.as_deref(),
                batch_size: self.batch_size,
            },
            server: ServerOverrides {
                port: self.port,
                env: self.env.as_deref(),
            },
            metrics: MetricsOverrides {
                graphite_tcp_address: self
                    .graphite_tcp_address
                    .as_deref()
                    .filter(|a| !a.is_empty()),
                graphite_prefix: self.graphite_prefix.as_deref(),
                log_metrics: self.log_metrics,
            },
        }
    }
}

impl App {
    /// Loads the configuration with this invocation's overrides applied.
    pub fn load_config(&self) -> Result<Config, ConfigError> {
        Config::load(self.config.as_deref(), &self.settings.overrides())
    }

    /// Run the CLI application.
    pub async fn run(self) -> color_eyre::Result<()> {
        match self.command {
            Some(Command::Init) => self.run_init().await,
            Some(Command::Serve) | None => self.run_serve().await,
        }
    }
}
