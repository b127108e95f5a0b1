//! Neo4j backend implementation over the Bolt protocol.
//!
//! # Example
//!
//! ```ignore
//! use brands_rw_neo4j::graph::backends::neo4j::Neo4jClient;
//! use brands_rw_neo4j::graph::Graph;
//!
//! let client = Neo4jClient::connect(&config.neo4j).await?;
//! let graph = Graph::new(client, config.neo4j.batch_size);
//!
//! let rows = graph.query("MATCH (n:Brand) RETURN count(n) AS c")
//!     .fetch_all()
//!     .await?;
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use neo4rs::{BoltList, BoltMap, BoltNull, BoltString, BoltType, ConfigBuilder, Txn};
use serde_json::Value as JsonValue;
use tokio::sync::Mutex;

use crate::config::Neo4jConfig;
use crate::error::AppError;
use crate::graph::row::{Params, Row, RowStream};
use crate::graph::traits::{CypherExecutor, GraphClient, Transaction};

/// Neo4j error code reported when a uniqueness constraint rejects a write.
const CONSTRAINT_VIOLATION_CODE: &str = "ConstraintValidationFailed";

/// Neo4j graph client.
///
/// Connection pooling is handled by the neo4rs driver. This type is cheap to
/// clone - the driver handle is `Arc`-based.
#[derive(Clone)]
pub struct Neo4jClient {
    graph: Arc<neo4rs::Graph>,
    uri: Arc<str>,
}

impl Neo4jClient {
    /// Connects to Neo4j using the given configuration.
    pub async fn connect(config: &Neo4jConfig) -> Result<Self, AppError> {
        let neo_config = ConfigBuilder::default()
            .uri(config.url.as_str())
            .user(config.user.as_str())
            .password(config.password.as_deref().unwrap_or(""))
            .max_connections(config.max_connections)
            .build()?;

        let graph = neo4rs::Graph::connect(neo_config).await?;

        Ok(Self {
            graph: Arc::new(graph),
            uri: Arc::from(config.url.as_str()),
        })
    }

    /// The Bolt URI this client is connected to.
    pub fn uri(&self) -> &str {
        &self.uri
    }
}

impl std::fmt::Display for Neo4jClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Neo4j at {}", self.uri)
    }
}

#[async_trait]
impl CypherExecutor for Neo4jClient {
    async fn execute_cypher(
        &self,
        cypher: &str,
        params: Params,
    ) -> Result<RowStream<'_>, AppError> {
        let stream = self
            .graph
            .execute(build_query(cypher, params))
            .await
            .map_err(|e| map_error(e, cypher))?;

        let query: Arc<str> = Arc::from(cypher);
        Ok(Box::pin(futures::stream::try_unfold(
            stream,
            move |mut stream| {
                let query = query.clone();
                async move {
                    match stream.next().await {
                        Ok(Some(row)) => Ok(Some((parse_row(row)?, stream))),
                        Ok(None) => Ok(None),
                        Err(e) => Err(map_error(e, &query)),
                    }
                }
            },
        )))
    }

    async fn run_cypher(&self, cypher: &str, params: Params) -> Result<(), AppError> {
        self.graph
            .run(build_query(cypher, params))
            .await
            .map_err(|e| map_error(e, cypher))
    }
}

#[async_trait]
impl GraphClient for Neo4jClient {
    type Tx = Neo4jTransaction;

    async fn begin(&self) -> Result<Self::Tx, AppError> {
        let txn = self.graph.start_txn().await?;
        Ok(Neo4jTransaction {
            txn: Mutex::new(Some(txn)),
        })
    }
}

/// An explicit Neo4j transaction.
///
/// The driver's transaction needs exclusive access per statement, so it is
/// held behind an async mutex. It is taken out on commit or rollback;
/// dropping an unfinished transaction logs a warning and the server rolls
/// it back when the connection is recycled.
pub struct Neo4jTransaction {
    txn: Mutex<Option<Txn>>,
}

impl Neo4jTransaction {
    async fn take(&self) -> Result<Txn, AppError> {
        self.txn
            .lock()
            .await
            .take()
            .ok_or_else(|| AppError::Internal("transaction already finished".to_string()))
    }
}

#[async_trait]
impl CypherExecutor for Neo4jTransaction {
    async fn execute_cypher(
        &self,
        cypher: &str,
        params: Params,
    ) -> Result<RowStream<'_>, AppError> {
        let mut guard = self.txn.lock().await;
        let txn = guard
            .as_mut()
            .ok_or_else(|| AppError::Internal("transaction already finished".to_string()))?;

        let mut stream = txn
            .execute(build_query(cypher, params))
            .await
            .map_err(|e| map_error(e, cypher))?;

        // Rows are drained while the transaction is locked.
        let mut rows = Vec::new();
        while let Some(row) = stream
            .next(txn.handle())
            .await
            .map_err(|e| map_error(e, cypher))?
        {
            rows.push(parse_row(row));
        }

        Ok(Box::pin(futures::stream::iter(rows)))
    }

    async fn run_cypher(&self, cypher: &str, params: Params) -> Result<(), AppError> {
        let mut guard = self.txn.lock().await;
        let txn = guard
            .as_mut()
            .ok_or_else(|| AppError::Internal("transaction already finished".to_string()))?;

        txn.run(build_query(cypher, params))
            .await
            .map_err(|e| map_error(e, cypher))
    }
}

#[async_trait]
impl Transaction for Neo4jTransaction {
    async fn commit(self) -> Result<(), AppError> {
        let txn = self.take().await?;
        txn.commit().await.map_err(|e| map_error(e, "COMMIT"))
    }

    async fn rollback(self) -> Result<(), AppError> {
        let txn = self.take().await?;
        txn.rollback().await?;
        Ok(())
    }
}

impl Drop for Neo4jTransaction {
    fn drop(&mut self) {
        if self.txn.get_mut().is_some() {
            tracing::warn!("Neo4jTransaction dropped without commit or rollback");
        }
    }
}

/// Builds a driver query, binding every parameter as a Bolt value.
fn build_query(cypher: &str, params: Params) -> neo4rs::Query {
    params
        .into_iter()
        .fold(neo4rs::query(cypher), |query, (name, value)| {
            query.param(&name, to_bolt(value))
        })
}

/// Converts a JSON parameter value into its Bolt equivalent.
fn to_bolt(value: JsonValue) -> BoltType {
    match value {
        JsonValue::Null => BoltType::Null(BoltNull),
        JsonValue::Bool(b) => b.into(),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => i.into(),
            None => n.as_f64().unwrap_or_default().into(),
        },
        JsonValue::String(s) => s.into(),
        JsonValue::Array(items) => {
            let mut list = BoltList::with_capacity(items.len());
            for item in items {
                list.push(to_bolt(item));
            }
            BoltType::List(list)
        }
        JsonValue::Object(entries) => {
            let mut map = BoltMap::with_capacity(entries.len());
            for (key, item) in entries {
                map.put(BoltString::from(key), to_bolt(item));
            }
            BoltType::Map(map)
        }
    }
}

/// Converts a driver row into a column map of JSON values.
fn parse_row(row: neo4rs::Row) -> Result<Row, AppError> {
    row.to::<HashMap<String, JsonValue>>()
        .map(Row::new)
        .map_err(|e| AppError::Internal(format!("failed to decode row: {}", e)))
}

/// Classifies a driver error raised while running `cypher`.
fn map_error(err: neo4rs::Error, cypher: &str) -> AppError {
    let message = err.to_string();
    if message.contains(CONSTRAINT_VIOLATION_CODE) {
        AppError::ConstraintViolation(message)
    } else {
        AppError::Query {
            message,
            query: cypher.trim().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_to_bolt_scalars() {
        assert!(matches!(to_bolt(JsonValue::Null), BoltType::Null(_)));
        assert!(matches!(to_bolt(json!(true)), BoltType::Boolean(_)));
        assert!(matches!(to_bolt(json!(42)), BoltType::Integer(_)));
        assert!(matches!(to_bolt(json!(1.5)), BoltType::Float(_)));
        assert!(matches!(to_bolt(json!("brand")), BoltType::String(_)));
    }

    #[test]
    fn test_to_bolt_nested() {
        let value = to_bolt(json!({
            "uuid": "1234",
            "aliases": ["one", "two"],
        }));

        match value {
            BoltType::Map(map) => {
                assert_eq!(map.value.len(), 2);
                match map.value.get(&BoltString::from("aliases")) {
                    Some(BoltType::List(list)) => assert_eq!(list.len(), 2),
                    other => panic!("expected list, got {:?}", other),
                }
            }
            other => panic!("expected map, got {:?}", other),
        }
    }
}
