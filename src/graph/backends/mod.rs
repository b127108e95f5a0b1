//! Backend implementations for graph databases.
//!
//! Each backend implements the core traits from [`crate::graph::traits`]:
//!
//! - [`CypherExecutor`](crate::graph::CypherExecutor)
//! - [`Transaction`](crate::graph::Transaction)
//! - [`GraphClient`](crate::graph::GraphClient)
//!
//! # Available Backends
//!
//! | Backend | Module | Status |
//! |---------|--------|--------|
//! | Neo4j (Bolt) | [`neo4j`] | Available |

pub mod neo4j;
