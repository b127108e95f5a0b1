//! Integration tests for the Brand repository against Neo4j.
//!
//! These tests require a running Neo4j instance.
//! Run with: `cargo test --features integration --test neo4j_integration`
//!
//! Connection settings come from `NEO4J_TEST_URL`, `NEO4J_TEST_USER` and
//! `NEO4J_TEST_PASSWORD` (defaults: `bolt://localhost:7687`, `neo4j`, `password`).

#![cfg(feature = "integration")]

use std::sync::Arc;

use brands_rw_neo4j::config::Neo4jConfig;
use brands_rw_neo4j::error::AppError;
use brands_rw_neo4j::graph::backends::neo4j::Neo4jClient;
use brands_rw_neo4j::graph::{Graph, GraphClient, QueryExt, Statement, Transaction};
use brands_rw_neo4j::models::{Brand, SchemaConfig};
use brands_rw_neo4j::repositories::{BrandRepository, WriteOutcome};
use serial_test::serial;

const BRAND: &str = "it-92f4ec09-436d-4092-a88c-96f54e34007c";
const OTHER_BRAND: &str = "it-92f4ec09-436d-4092-a88c-96f54e34007d";
const PARENT: &str = "it-a806e270-edbc-423f-b8db-d21ae90e06c8";
const CHILD: &str = "it-327af339-39d4-4c7b-8c06-9f80211ea93d";
const NEW_PARENT: &str = "it-dbb0bdae-1f0c-11e4-b0cb-b2227cce2b54";

fn test_config() -> Neo4jConfig {
    Neo4jConfig {
        url: std::env::var("NEO4J_TEST_URL").unwrap_or_else(|_| "bolt://localhost:7687".into()),
        user: std::env::var("NEO4J_TEST_USER").unwrap_or_else(|_| "neo4j".into()),
        password: Some(std::env::var("NEO4J_TEST_PASSWORD").unwrap_or_else(|_| "password".into())),
        ..Neo4jConfig::default()
    }
}

async fn create_repository() -> BrandRepository<Neo4jClient> {
    let config = test_config();
    let client = Neo4jClient::connect(&config)
        .await
        .expect("Failed to connect to test database");
    let repository = BrandRepository::new(
        Arc::new(Graph::new(client, config.batch_size)),
        Arc::new(SchemaConfig::default()),
    );
    cleanup(&repository).await;
    repository
}

/// Removes every node created by these tests.
async fn cleanup(repository: &BrandRepository<Neo4jClient>) {
    repository
        .graph()
        .query(
            "MATCH (n)
             WHERE n.uuid STARTS WITH 'it-' OR (n:Identifier AND n.value STARTS WITH 'it-')
             DETACH DELETE n",
        )
        .run()
        .await
        .expect("Failed to clean up");
}

async fn count_nodes(repository: &BrandRepository<Neo4jClient>, uuid: &str) -> i64 {
    repository
        .graph()
        .query("MATCH (n:Thing {uuid: $uuid}) RETURN count(n) AS c")
        .param("uuid", uuid)
        .fetch_one()
        .await
        .expect("Query failed")
        .expect("count returns a row")
        .get("c")
        .expect("missing count")
}

async fn labels_of(repository: &BrandRepository<Neo4jClient>, uuid: &str) -> Vec<String> {
    let row = repository
        .graph()
        .query("MATCH (n:Thing {uuid: $uuid}) RETURN labels(n) AS labels")
        .param("uuid", uuid)
        .fetch_one()
        .await
        .expect("Query failed")
        .expect("node exists");
    row.get("labels").expect("missing labels")
}

async fn identifier_count(repository: &BrandRepository<Neo4jClient>) -> i64 {
    repository
        .graph()
        .query("MATCH (i:Identifier) WHERE i.value STARTS WITH 'it-' RETURN count(i) AS c")
        .fetch_one()
        .await
        .expect("Query failed")
        .expect("count returns a row")
        .get("c")
        .expect("missing count")
}

async fn parent_uuids(repository: &BrandRepository<Neo4jClient>, uuid: &str) -> Vec<String> {
    repository
        .graph()
        .query("MATCH (:Thing {uuid: $uuid})-[:HAS_PARENT]->(p) RETURN p.uuid AS parent")
        .param("uuid", uuid)
        .fetch_all()
        .await
        .expect("Query failed")
        .iter()
        .map(|row| row.get("parent").expect("missing parent"))
        .collect()
}

fn full_brand() -> Brand {
    let mut brand = Brand::new(BRAND, "Lex");
    brand.description = Some("Lex column".to_string());
    brand.description_xml = Some("<p>Lex column</p>".to_string());
    brand.strapline = Some("Breaking views".to_string());
    brand.image_url = Some("http://media.ft.com/lex.png".to_string());
    brand.parent_uuid = Some(PARENT.to_string());
    brand.aliases = vec!["Lex Column".to_string()];
    brand.alternative_identifiers.insert("uuids", format!("it-upp-{}", BRAND));
    brand.alternative_identifiers.insert("TME", "it-tme-1");
    brand.alternative_identifiers.insert("factsetIdentifiers", "it-factset-1");
    brand.normalize();
    brand
}

#[serial]
mod repository_tests {
    use super::*;

    #[tokio::test]
    async fn test_write_then_read_round_trips() {
        let repository = create_repository().await;
        repository.initialise().await.expect("Failed to initialise");

        let brand = full_brand();
        let outcome = repository.write(&brand).await.expect("Write failed");
        assert_eq!(outcome, WriteOutcome::Created);

        let read = repository.read(BRAND).await.expect("Read failed").expect("brand exists");
        let expected = Brand {
            types: vec![
                "Brand".to_string(),
                "Classification".to_string(),
                "Concept".to_string(),
                "Thing".to_string(),
            ],
            ..brand
        };
        assert_eq!(read, expected);

        cleanup(&repository).await;
    }

    #[tokio::test]
    async fn test_second_write_is_an_update() {
        let repository = create_repository().await;

        let brand = Brand::new(BRAND, "Lex");
        assert_eq!(repository.write(&brand).await.unwrap(), WriteOutcome::Created);
        assert_eq!(repository.write(&brand).await.unwrap(), WriteOutcome::Updated);

        cleanup(&repository).await;
    }

    #[tokio::test]
    async fn test_parent_placeholder_is_created() {
        let repository = create_repository().await;

        let mut brand = Brand::new(BRAND, "X");
        brand.parent_uuid = Some(PARENT.to_string());
        repository.write(&brand).await.expect("Write failed");

        let read = repository.read(BRAND).await.unwrap().unwrap();
        assert_eq!(read.parent_uuid.as_deref(), Some(PARENT));
        assert_eq!(labels_of(&repository, PARENT).await, vec!["Thing"]);
        assert!(repository.read(PARENT).await.unwrap().is_none());

        // Deleting the child leaves the placeholder without relationships.
        assert!(repository.delete(BRAND).await.unwrap());
        assert!(repository.read(BRAND).await.unwrap().is_none());
        assert_eq!(count_nodes(&repository, BRAND).await, 0);
        assert_eq!(count_nodes(&repository, PARENT).await, 1);

        cleanup(&repository).await;
    }

    #[tokio::test]
    async fn test_rewrite_moves_parent() {
        let repository = create_repository().await;

        let mut brand = Brand::new(BRAND, "Lex");
        brand.parent_uuid = Some(PARENT.to_string());
        repository.write(&brand).await.expect("Write failed");

        brand.parent_uuid = Some(NEW_PARENT.to_string());
        assert_eq!(repository.write(&brand).await.unwrap(), WriteOutcome::Updated);

        assert_eq!(parent_uuids(&repository, BRAND).await, vec![NEW_PARENT.to_string()]);
        let read = repository.read(BRAND).await.unwrap().unwrap();
        assert_eq!(read.parent_uuid.as_deref(), Some(NEW_PARENT));

        cleanup(&repository).await;
    }

    #[tokio::test]
    async fn test_delete_removes_all_trace() {
        let repository = create_repository().await;

        repository.write(&full_brand()).await.expect("Write failed");
        assert_eq!(identifier_count(&repository).await, 3);

        assert!(repository.delete(BRAND).await.unwrap());

        assert_eq!(count_nodes(&repository, BRAND).await, 0);
        assert_eq!(identifier_count(&repository).await, 0);
        assert!(!repository.delete(BRAND).await.unwrap());

        cleanup(&repository).await;
    }

    #[tokio::test]
    async fn test_deleting_a_parent_leaves_a_bare_thing() {
        let repository = create_repository().await;

        repository.write(&Brand::new(PARENT, "Parent")).await.unwrap();
        let mut child = Brand::new(CHILD, "Child");
        child.parent_uuid = Some(PARENT.to_string());
        repository.write(&child).await.unwrap();

        assert!(repository.delete(PARENT).await.unwrap());

        assert!(repository.read(PARENT).await.unwrap().is_none());
        assert_eq!(labels_of(&repository, PARENT).await, vec!["Thing"]);
        let child = repository.read(CHILD).await.unwrap().unwrap();
        assert_eq!(child.parent_uuid.as_deref(), Some(PARENT));

        cleanup(&repository).await;
    }

    #[tokio::test]
    async fn test_rewrite_clears_missing_fields() {
        let repository = create_repository().await;

        repository.write(&full_brand()).await.unwrap();
        let mut slim = Brand::new(BRAND, "Lex");
        slim.alternative_identifiers.insert("TME", "it-tme-2");
        repository.write(&slim).await.unwrap();

        let read = repository.read(BRAND).await.unwrap().unwrap();
        assert_eq!(read.strapline, None);
        assert_eq!(read.description, None);
        assert_eq!(read.parent_uuid, None);
        assert!(read.aliases.is_empty());
        assert_eq!(read.alternative_identifiers.get("TME").unwrap(), &["it-tme-2".to_string()]);
        assert!(read.alternative_identifiers.get("uuids").is_none());
        assert_eq!(identifier_count(&repository).await, 1);

        cleanup(&repository).await;
    }

    #[tokio::test]
    async fn test_count_tracks_writes_and_deletes() {
        let repository = create_repository().await;
        let before = repository.count().await.unwrap();

        repository.write(&Brand::new(BRAND, "A")).await.unwrap();
        repository.write(&Brand::new(OTHER_BRAND, "B")).await.unwrap();
        assert_eq!(repository.count().await.unwrap(), before + 2);

        repository.delete(BRAND).await.unwrap();
        assert_eq!(repository.count().await.unwrap(), before + 1);

        cleanup(&repository).await;
    }

    #[tokio::test]
    async fn test_duplicate_identifier_is_rejected_atomically() {
        let repository = create_repository().await;
        repository.initialise().await.expect("Failed to initialise");

        let mut first = Brand::new(BRAND, "First");
        first.alternative_identifiers.insert("TME", "it-shared");
        repository.write(&first).await.unwrap();

        let mut second = Brand::new(OTHER_BRAND, "Second");
        second.alternative_identifiers.insert("TME", "it-shared");
        let err = repository.write(&second).await.unwrap_err();

        assert!(matches!(err, AppError::ConstraintViolation(_)));
        assert!(repository.read(OTHER_BRAND).await.unwrap().is_none());
        assert_eq!(count_nodes(&repository, OTHER_BRAND).await, 0);

        cleanup(&repository).await;
    }

    #[tokio::test]
    async fn test_check() {
        let repository = create_repository().await;
        repository.check().await.expect("Neo4j should be reachable");
    }
}

#[serial]
mod transaction_tests {
    use super::*;

    #[tokio::test]
    async fn test_rollback_discards_changes() {
        let repository = create_repository().await;
        let client = repository.graph().client();

        let txn = client.begin().await.expect("Failed to begin");
        txn.query("CREATE (n:Thing {uuid: $uuid})")
            .param("uuid", BRAND)
            .run()
            .await
            .expect("Create failed");
        txn.rollback().await.expect("Rollback failed");

        assert_eq!(count_nodes(&repository, BRAND).await, 0);
    }

    #[tokio::test]
    async fn test_failed_batch_leaves_no_trace() {
        let repository = create_repository().await;

        let result = repository
            .graph()
            .run_batch(vec![
                Statement::new("CREATE (n:Thing {uuid: $uuid})").param("uuid", BRAND),
                Statement::new("THIS IS NOT CYPHER"),
            ])
            .await;

        assert!(result.is_err());
        assert_eq!(count_nodes(&repository, BRAND).await, 0);
    }
}
