//! Data access layer for graph operations.
//!
//! Repositories own the Cypher for their entity and run it through the
//! [`graph`](crate::graph) abstraction.

mod brand;

pub use brand::{BrandRepository, WriteOutcome};
