//! Macro for convenient Cypher query construction.

/// Macro for inline Cypher queries with optional parameters.
///
/// # Usage
///
/// ```ignore
/// use brands_rw_neo4j::graph::cypher;
///
/// // Query without parameters
/// let query = cypher!(graph, "MATCH (n:Brand) RETURN count(n) AS c");
///
/// // Query with parameters
/// let query = cypher!(graph, "MATCH (n:Brand {uuid: $uuid}) RETURN n", uuid = uuid);
///
/// let rows = query.fetch_all().await?;
/// ```
#[macro_export]
macro_rules! cypher {
    // Query without parameters
    ($graph:expr, $query:expr) => {
        $graph.query($query)
    };
    // Query with parameters
    ($graph:expr, $query:expr, $($name:ident = $value:expr),+ $(,)?) => {
        $graph.query($query)$(.param(stringify!($name), $value))+
    };
}
