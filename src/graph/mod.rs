//! Graph abstraction layer for database access.
//!
//! Repositories talk to the database through a small trait hierarchy instead
//! of the driver directly, so the Cypher they produce can be exercised against
//! a recording client in tests and against Neo4j in production.
//!
//! # Architecture
//!
//! - [`CypherExecutor`] - Execute Cypher queries
//! - [`Transaction`] - Transaction lifecycle (commit/rollback)
//! - [`GraphClient`] - Connection management and transaction creation
//! - [`Statement`] - One parameterised statement of an atomic batch
//!
//! # Usage
//!
//! ```ignore
//! use brands_rw_neo4j::graph::{Graph, Statement};
//!
//! let graph = Graph::new(client, 1024);
//!
//! // Read query
//! let row = graph.query("MATCH (n:Brand {uuid: $uuid}) RETURN n.prefLabel AS prefLabel")
//!     .param("uuid", uuid)
//!     .fetch_one()
//!     .await?;
//!
//! // Several statements, all or nothing
//! graph.run_batch(vec![
//!     Statement::new("MATCH (t:Thing {uuid: $uuid})-[r:HAS_PARENT]->() DELETE r").param("uuid", uuid),
//!     Statement::new("MERGE (n:Thing {uuid: $uuid}) SET n:Brand").param("uuid", uuid),
//! ]).await?;
//! ```

mod batch;
mod macros;
mod query;
mod row;
mod traits;

pub mod backends;

#[cfg(test)]
pub(crate) mod mock;

// Re-export core types
pub use batch::Statement;
pub use query::{Query, QueryExt};
pub use row::{Params, Row, RowStream};
pub use traits::{CypherExecutor, GraphClient, Transaction};

// Re-export macro (defined at crate root via #[macro_export])
#[doc(inline)]
pub use crate::cypher;

// --- Graph wrapper struct ---

use futures::TryStreamExt;

use crate::error::AppError;

/// Default maximum number of statements per batch.
pub const DEFAULT_BATCH_SIZE: usize = 1024;

/// High-level wrapper providing a convenient API for graph operations.
///
/// `Graph` wraps any [`GraphClient`] and provides:
/// - Direct queries (auto-commit per query)
/// - Atomic statement batches bounded by a maximum batch size
pub struct Graph<C: GraphClient> {
    client: C,
    batch_size: usize,
}

impl<C: GraphClient> Graph<C> {
    /// Creates a new graph wrapper around the given client.
    ///
    /// `batch_size` is the maximum number of statements accepted by
    /// [`run_batch`](Graph::run_batch); zero is treated as one.
    pub fn new(client: C, batch_size: usize) -> Self {
        Self {
            client,
            batch_size: batch_size.max(1),
        }
    }

    /// Returns a reference to the underlying client.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Maximum number of statements per batch.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Creates a query builder for a direct (auto-commit) query.
    pub fn query(&self, cypher: &str) -> Query<'_, C> {
        Query::new(&self.client, cypher)
    }

    /// Executes all statements in a single transaction.
    ///
    /// Statements run in order. The rows produced by each statement are
    /// returned in the same order. The first failing statement rolls the
    /// whole transaction back and its error is returned, so a partially
    /// applied batch is never observable.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::BatchTooLarge`] without touching the database
    /// when the batch holds more statements than the configured batch size.
    pub async fn run_batch(&self, statements: Vec<Statement>) -> Result<Vec<Vec<Row>>, AppError> {
        if statements.len() > self.batch_size {
            return Err(AppError::BatchTooLarge {
                size: statements.len(),
                limit: self.batch_size,
            });
        }

        let count = statements.len();
        let txn = self.client.begin().await?;

        match execute_all(&txn, statements).await {
            Ok(results) => {
                txn.commit().await?;
                tracing::debug!(statements = count, "batch committed");
                Ok(results)
            }
            Err(e) => {
                tracing::warn!(statements = count, error = %e, "batch failed, rolling back");
                if let Err(rollback_err) = txn.rollback().await {
                    tracing::error!(error = %rollback_err, "rollback failed");
                }
                Err(e)
            }
        }
    }
}

/// Runs each statement on the executor, collecting its rows.
async fn execute_all<E: CypherExecutor>(
    executor: &E,
    statements: Vec<Statement>,
) -> Result<Vec<Vec<Row>>, AppError> {
    let mut results = Vec::with_capacity(statements.len());
    for statement in statements {
        let (cypher, params) = statement.into_parts();
        let rows: Vec<Row> = executor
            .execute_cypher(&cypher, params)
            .await?
            .try_collect()
            .await?;
        results.push(rows);
    }
    Ok(results)
}
