//! Application context shared by the request handlers.

use std::sync::Arc;

use crate::config::Config;
use crate::error::AppError;
use crate::graph::backends::neo4j::Neo4jClient;
use crate::graph::{Graph, GraphClient};
use crate::metrics::Metrics;
use crate::models::SchemaConfig;
use crate::repositories::BrandRepository;

/// Root application context.
///
/// Holds all shared dependencies behind `Arc`s and is handed to axum as
/// router state, so cloning it per request is cheap.
pub struct Context<C: GraphClient> {
    /// Brand persistence.
    pub brands: BrandRepository<C>,
    /// Application configuration.
    pub config: Arc<Config>,
    /// Request metrics.
    pub metrics: Arc<Metrics>,
}

impl<C: GraphClient> Clone for Context<C> {
    fn clone(&self) -> Self {
        Self {
            brands: self.brands.clone(),
            config: Arc::clone(&self.config),
            metrics: Arc::clone(&self.metrics),
        }
    }
}

impl<C: GraphClient> Context<C> {
    /// Builds a context around an already connected client.
    pub fn new(client: C, config: Config) -> Result<Self, AppError> {
        let schema = SchemaConfig::from_settings(&config.schema)?;
        let graph = Graph::new(client, config.neo4j.batch_size);

        Ok(Self {
            brands: BrandRepository::new(Arc::new(graph), Arc::new(schema)),
            config: Arc::new(config),
            metrics: Arc::new(Metrics::new()),
        })
    }
}

impl Context<Neo4jClient> {
    /// Connects to Neo4j and builds the production context.
    pub async fn connect(config: Config) -> Result<Self, AppError> {
        tracing::info!(url = %config.neo4j.url, "connecting to Neo4j");
        let client = Neo4jClient::connect(&config.neo4j).await?;
        tracing::info!("connected to {}", client);
        Self::new(client, config)
    }
}
