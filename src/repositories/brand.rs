//! Brand repository: the graph write, read and delete protocols.
//!
//! A Brand is stored as a `Thing` node carrying the Brand labels, an
//! optional `HAS_PARENT` relationship to another Thing, and one identifier
//! node per alternative identifier value pointing at it with `IDENTIFIES`.
//! Writes and deletes are each sent as one atomic statement batch.

use std::sync::Arc;

use serde::Deserialize;

use crate::error::AppError;
use crate::graph::{cypher, Graph, GraphClient, QueryExt, Row, Statement};
use crate::models::{AlternativeIdentifiers, Brand, SchemaConfig};

/// Result of a successful write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Created,
    Updated,
}

/// Repository for Brand persistence.
pub struct BrandRepository<C: GraphClient> {
    graph: Arc<Graph<C>>,
    schema: Arc<SchemaConfig>,
}

impl<C: GraphClient> Clone for BrandRepository<C> {
    fn clone(&self) -> Self {
        Self {
            graph: Arc::clone(&self.graph),
            schema: Arc::clone(&self.schema),
        }
    }
}

/// One entry of the identifier collection returned by the read query.
#[derive(Debug, Deserialize)]
struct IdentifierEntry {
    labels: Option<Vec<String>>,
    value: Option<String>,
}

// Position of the existence probe in a write batch.
const WRITE_PROBE: usize = 0;
// Position of the label-clearing statement in a delete batch.
const DELETE_CLEAR: usize = 2;

impl<C: GraphClient> BrandRepository<C> {
    pub fn new(graph: Arc<Graph<C>>, schema: Arc<SchemaConfig>) -> Self {
        Self { graph, schema }
    }

    pub fn schema(&self) -> &SchemaConfig {
        &self.schema
    }

    pub fn graph(&self) -> &Graph<C> {
        &self.graph
    }

    /// Ensures the index and uniqueness constraints exist.
    ///
    /// Every statement is attempted; the first failure is returned after
    /// the rest have run.
    pub async fn initialise(&self) -> Result<(), AppError> {
        let mut first_error = None;
        for cypher in self.initialise_statements() {
            match self.graph.query(&cypher).run().await {
                Ok(()) => tracing::debug!(%cypher, "schema statement applied"),
                Err(e) => {
                    tracing::warn!(%cypher, error = %e, "schema statement failed");
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Writes `brand`, replacing whatever was stored at its uuid.
    pub async fn write(&self, brand: &Brand) -> Result<WriteOutcome, AppError> {
        let statements = self.write_statements(brand);
        tracing::debug!(uuid = %brand.uuid, statements = statements.len(), "writing brand");

        let results = self.graph.run_batch(statements).await?;
        let existing: i64 = match results.get(WRITE_PROBE).and_then(|rows| rows.first()) {
            Some(row) => row.get("existing")?,
            None => 0,
        };

        Ok(if existing > 0 {
            WriteOutcome::Updated
        } else {
            WriteOutcome::Created
        })
    }

    /// Reads the Brand stored at `uuid`.
    ///
    /// A bare Thing at `uuid` is reported as `None`.
    pub async fn read(&self, uuid: &str) -> Result<Option<Brand>, AppError> {
        let row = cypher!(self.graph, &self.read_query(), uuid = uuid)
            .fetch_one()
            .await?;

        row.map(|row| self.row_to_brand(&row)).transpose()
    }

    /// Deletes the Brand at `uuid`, keeping the Thing while anything else
    /// still references it.
    ///
    /// Returns `false` when there was no Brand to delete.
    pub async fn delete(&self, uuid: &str) -> Result<bool, AppError> {
        let results = self.graph.run_batch(self.delete_statements(uuid)).await?;
        match results.get(DELETE_CLEAR).and_then(|rows| rows.first()) {
            Some(row) => row.get("existed"),
            None => Ok(false),
        }
    }

    /// Number of Brand nodes.
    pub async fn count(&self) -> Result<i64, AppError> {
        let cypher = format!(
            "MATCH (n:{}) RETURN count(n) AS c",
            self.schema.primary_label()
        );
        let row = self.graph.query(&cypher).fetch_one().await?;
        match row {
            Some(row) => row.get("c"),
            None => Ok(0),
        }
    }

    /// Verifies the database answers queries.
    pub async fn check(&self) -> Result<(), AppError> {
        cypher!(self.graph.client(), "RETURN 1 AS ok")
            .fetch_one()
            .await?;
        Ok(())
    }

    /// The ordered statements making up a write.
    pub fn write_statements(&self, brand: &Brand) -> Vec<Statement> {
        let uuid = brand.uuid.as_str();
        let mut statements = vec![
            Statement::new(format!(
                "MATCH (n:{} {{uuid: $uuid}}) RETURN count(n) AS existing",
                self.schema.primary_label()
            ))
            .param("uuid", uuid),
            Statement::new("MATCH (:Thing {uuid: $uuid})-[r:HAS_PARENT]->(:Thing) DELETE r")
                .param("uuid", uuid),
            Statement::new(
                "MATCH (t:Thing {uuid: $uuid})
                 OPTIONAL MATCH (i:Identifier)-[ir:IDENTIFIES]->(t)
                 DELETE ir, i",
            )
            .param("uuid", uuid),
            Statement::new(format!(
                "MERGE (n:Thing {{uuid: $uuid}})
                 SET n{}
                 SET n = $props",
                self.schema.brand_label_expression()
            ))
            .param("uuid", uuid)
            .param("props", brand.properties()),
        ];

        if let Some(parent) = &brand.parent_uuid {
            statements.push(
                Statement::new(
                    "MATCH (t:Thing {uuid: $uuid})
                     MERGE (p:Thing {uuid: $parentUUID})
                     MERGE (t)-[:HAS_PARENT]->(p)",
                )
                .param("uuid", uuid)
                .param("parentUUID", parent),
            );
        }

        for (key, values) in brand.alternative_identifiers.iter() {
            // Unknown authorities are rejected when the document is decoded.
            let Some(authority) = self.schema.authority(key) else {
                tracing::warn!(uuid, authority = key, "skipping unknown identifier authority");
                continue;
            };
            let cypher = format!(
                "MATCH (t:Thing {{uuid: $uuid}})
                 CREATE (i:Identifier:{} {{value: $value}})
                 MERGE (i)-[:IDENTIFIES]->(t)",
                authority.label
            );
            for value in values {
                statements.push(
                    Statement::new(cypher.as_str())
                        .param("uuid", uuid)
                        .param("value", value),
                );
            }
        }

        statements
    }

    /// The ordered statements making up a delete.
    pub fn delete_statements(&self, uuid: &str) -> Vec<Statement> {
        vec![
            Statement::new(
                "MATCH (i:Identifier)-[ir:IDENTIFIES]->(:Thing {uuid: $uuid})
                 OPTIONAL MATCH (i)-[other]-()
                 WITH i, ir, count(other) AS rels
                 WHERE rels = 1
                 DELETE ir, i",
            )
            .param("uuid", uuid),
            Statement::new("MATCH (:Thing {uuid: $uuid})-[r:HAS_PARENT]->(:Thing) DELETE r")
                .param("uuid", uuid),
            Statement::new(format!(
                "MATCH (n:Thing {{uuid: $uuid}})
                 WITH n, n:{} AS existed
                 REMOVE n{}
                 SET n = {{uuid: $uuid}}
                 RETURN existed",
                self.schema.primary_label(),
                self.schema.brand_label_expression()
            ))
            .param("uuid", uuid),
            Statement::new(
                "MATCH (n:Thing {uuid: $uuid})
                 OPTIONAL MATCH (n)-[r]-()
                 WITH n, count(r) AS rels
                 WHERE rels = 0
                 DELETE n",
            )
            .param("uuid", uuid),
        ]
    }

    /// Index and constraint statements for the configured schema.
    pub fn initialise_statements(&self) -> Vec<String> {
        let mut statements =
            vec!["CREATE INDEX identifier_value IF NOT EXISTS FOR (i:Identifier) ON (i.value)".to_string()];

        for label in ["Thing", "Concept", self.schema.primary_label()] {
            statements.push(unique_constraint(label, "uuid"));
        }
        for authority in self.schema.authorities() {
            statements.push(unique_constraint(&authority.label, "value"));
        }
        statements
    }

    fn read_query(&self) -> String {
        format!(
            "MATCH (n:{} {{uuid: $uuid}})
             OPTIONAL MATCH (n)-[:HAS_PARENT]->(p:Thing)
             OPTIONAL MATCH (i:Identifier)-[:IDENTIFIES]->(n)
             RETURN n.uuid AS uuid,
                    n.prefLabel AS prefLabel,
                    n.description AS description,
                    n.descriptionXML AS descriptionXML,
                    n.strapline AS strapline,
                    n.imageUrl AS imageUrl,
                    n.aliases AS aliases,
                    p.uuid AS parentUUID,
                    collect(DISTINCT {{labels: labels(i), value: i.value}}) AS identifiers,
                    labels(n) AS types",
            self.schema.primary_label()
        )
    }

    fn row_to_brand(&self, row: &Row) -> Result<Brand, AppError> {
        let entries: Vec<IdentifierEntry> = row.get_opt("identifiers")?.unwrap_or_default();

        let mut identifiers = AlternativeIdentifiers::new();
        for entry in entries {
            let (Some(labels), Some(value)) = (entry.labels, entry.value) else {
                continue;
            };
            match self
                .schema
                .authority_for_labels(labels.iter().map(String::as_str))
            {
                Some(authority) => identifiers.insert(authority.key.clone(), value),
                None => tracing::debug!(?labels, "ignoring identifier with unknown authority"),
            }
        }

        let mut brand = Brand {
            uuid: row.get("uuid")?,
            pref_label: row.get_opt("prefLabel")?.unwrap_or_default(),
            description: text(row, "description")?,
            description_xml: text(row, "descriptionXML")?,
            strapline: text(row, "strapline")?,
            image_url: text(row, "imageUrl")?,
            parent_uuid: text(row, "parentUUID")?,
            aliases: row.get_opt("aliases")?.unwrap_or_default(),
            alternative_identifiers: identifiers,
            types: row.get_opt("types")?.unwrap_or_default(),
        };
        brand.normalize();
        Ok(brand)
    }
}

/// Reads an optional string column, treating `""` as absent.
fn text(row: &Row, key: &str) -> Result<Option<String>, AppError> {
    Ok(row
        .get_opt::<String>(key)?
        .filter(|value| !value.is_empty()))
}

fn unique_constraint(label: &str, property: &str) -> String {
    format!(
        "CREATE CONSTRAINT {}_{} IF NOT EXISTS FOR (n:{}) REQUIRE n.{} IS UNIQUE",
        label.to_lowercase(),
        property,
        label,
        property
    )
}
