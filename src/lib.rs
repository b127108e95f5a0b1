//! brands-rw-neo4j - RESTful API for managing Brands in Neo4j
//!
//! Brands are persisted as `Thing` nodes carrying the Brand labels, with an
//! optional parent relationship and one identifier node per alternative
//! identifier. Every write and delete runs as a single Neo4j transaction.

pub mod api;
pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod graph;
pub mod metrics;
pub mod models;
pub mod repositories;
