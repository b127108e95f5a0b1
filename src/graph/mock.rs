//! Recording graph client for unit tests.
//!
//! Every statement executed through the client or one of its transactions
//! is recorded. Statements run inside a transaction only become visible in
//! [`MockClient::committed`] once the transaction commits.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::error::AppError;
use crate::graph::row::{Params, Row, RowStream};
use crate::graph::traits::{CypherExecutor, GraphClient, Transaction};
use crate::graph::Statement;

#[derive(Default)]
struct MockState {
    committed: Vec<Statement>,
    responses: Vec<(String, Vec<Row>)>,
    failures: Vec<String>,
    begun: usize,
    rollbacks: usize,
}

/// Graph client that records statements and answers with canned rows.
#[derive(Clone, Default)]
pub struct MockClient {
    state: Arc<Mutex<MockState>>,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Statements containing `needle` return `rows`. Later registrations win.
    pub fn respond(&self, needle: &str, rows: Vec<Row>) {
        self.state
            .lock()
            .unwrap()
            .responses
            .push((needle.to_string(), rows));
    }

    /// Statements containing `needle` fail with a query error.
    pub fn fail_on(&self, needle: &str) {
        self.state.lock().unwrap().failures.push(needle.to_string());
    }

    pub fn committed(&self) -> Vec<Statement> {
        self.state.lock().unwrap().committed.clone()
    }

    pub fn rollbacks(&self) -> usize {
        self.state.lock().unwrap().rollbacks
    }

    pub fn transactions_begun(&self) -> usize {
        self.state.lock().unwrap().begun
    }

    fn answer(&self, cypher: &str) -> Result<Vec<Row>, AppError> {
        let state = self.state.lock().unwrap();
        if state.failures.iter().any(|needle| cypher.contains(needle)) {
            return Err(AppError::Query {
                message: "mock failure".to_string(),
                query: cypher.to_string(),
            });
        }
        Ok(state
            .responses
            .iter()
            .rev()
            .find(|(needle, _)| cypher.contains(needle))
            .map(|(_, rows)| rows.clone())
            .unwrap_or_default())
    }
}

fn stream(rows: Vec<Row>) -> RowStream<'static> {
    Box::pin(futures::stream::iter(rows.into_iter().map(Ok)))
}

#[async_trait]
impl CypherExecutor for MockClient {
    async fn execute_cypher(
        &self,
        cypher: &str,
        params: Params,
    ) -> Result<RowStream<'_>, AppError> {
        let rows = self.answer(cypher)?;
        let mut statement = Statement::new(cypher);
        for (name, value) in params {
            statement = statement.param(&name, value);
        }
        self.state.lock().unwrap().committed.push(statement);
        Ok(stream(rows))
    }

    async fn run_cypher(&self, cypher: &str, params: Params) -> Result<(), AppError> {
        self.execute_cypher(cypher, params).await.map(|_| ())
    }
}

#[async_trait]
impl GraphClient for MockClient {
    type Tx = MockTransaction;

    async fn begin(&self) -> Result<Self::Tx, AppError> {
        self.state.lock().unwrap().begun += 1;
        Ok(MockTransaction {
            client: self.clone(),
            pending: Mutex::new(Vec::new()),
        })
    }
}

/// Transaction buffering statements until commit.
pub struct MockTransaction {
    client: MockClient,
    pending: Mutex<Vec<Statement>>,
}

#[async_trait]
impl CypherExecutor for MockTransaction {
    async fn execute_cypher(
        &self,
        cypher: &str,
        params: Params,
    ) -> Result<RowStream<'_>, AppError> {
        let rows = self.client.answer(cypher)?;
        let mut statement = Statement::new(cypher);
        for (name, value) in params {
            statement = statement.param(&name, value);
        }
        self.pending.lock().unwrap().push(statement);
        Ok(stream(rows))
    }

    async fn run_cypher(&self, cypher: &str, params: Params) -> Result<(), AppError> {
        self.execute_cypher(cypher, params).await.map(|_| ())
    }
}

#[async_trait]
impl Transaction for MockTransaction {
    async fn commit(self) -> Result<(), AppError> {
        let pending = self.pending.into_inner().unwrap();
        self.client.state.lock().unwrap().committed.extend(pending);
        Ok(())
    }

    async fn rollback(self) -> Result<(), AppError> {
        self.client.state.lock().unwrap().rollbacks += 1;
        Ok(())
    }
}

/// Builds a row from a JSON object.
pub fn row(value: JsonValue) -> Row {
    match value {
        JsonValue::Object(map) => Row::new(map.into_iter().collect()),
        other => panic!("row must be a JSON object, got {}", other),
    }
}
