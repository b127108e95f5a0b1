//! Domain models for the brands service.

mod brand;
mod schema;

pub use brand::{AlternativeIdentifiers, Brand};
pub use schema::{Authority, SchemaConfig, SchemaRevision};
