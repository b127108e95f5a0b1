//! Statements for atomic batch execution.

use serde::Serialize;

use crate::graph::row::Params;

/// A single Cypher statement with its bound parameters.
///
/// Unlike [`Query`](crate::graph::Query), a statement is not tied to an
/// executor; statements are collected into a batch and handed to
/// [`Graph::run_batch`](crate::graph::Graph::run_batch) which runs them in
/// one transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    cypher: String,
    params: Params,
}

impl Statement {
    /// Creates a statement without parameters.
    pub fn new(cypher: impl Into<String>) -> Self {
        Self {
            cypher: cypher.into(),
            params: Params::new(),
        }
    }

    /// Binds a parameter, referenced in Cypher as `$name`.
    ///
    /// # Panics
    ///
    /// Panics if the value cannot be serialized to JSON.
    pub fn param<T: Serialize>(mut self, name: &str, value: T) -> Self {
        let json_value = serde_json::to_value(value).expect("failed to serialize parameter value");
        self.params.insert(name.to_string(), json_value);
        self
    }

    /// The Cypher text.
    pub fn cypher(&self) -> &str {
        &self.cypher
    }

    /// The bound parameters.
    pub fn params(&self) -> &Params {
        &self.params
    }

    pub(crate) fn into_parts(self) -> (String, Params) {
        (self.cypher, self.params)
    }
}
