use crate::error::GraphError;
use crate::statements::ImportStatement;
use async_trait::async_trait;
use neo4rs::{query, ConfigBuilder, Graph};
use tracing::{debug, info};
use tripgraph_core::config::DatabaseConfig;

/// Where import statements are executed.
#[async_trait]
pub trait GraphSink: Send + Sync {
    async fn run(&self, statement: &ImportStatement) -> Result<(), GraphError>;

    /// Releases the connection. Consumes the sink, so it runs at most once.
    async fn close(self) -> Result<(), GraphError>;
}

pub struct Neo4jGraph {
    graph: Graph,
    uri: String,
}

impl Neo4jGraph {
    /// Connects and runs a trivial query, so an unreachable server or rejected
    /// credentials fail here rather than on the first import statement.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, GraphError> {
        let neo4j_config = ConfigBuilder::default()
            .uri(config.uri.as_str())
            .user(config.user.as_str())
            .password(config.password.as_str())
            .max_connections(1)
            .build()?;
        let graph = Graph::connect(neo4j_config).await?;

        let sink = Self {
            graph,
            uri: config.uri.clone(),
        };
        sink.verify_connectivity().await?;
        info!(uri = %sink.uri, "Connected to graph database");
        Ok(sink)
    }

    // Explicit transactions only: unlike `Graph::run`/`Graph::execute`, the
    // driver never retries them on its own.
    async fn verify_connectivity(&self) -> Result<(), GraphError> {
        let mut txn = self.graph.start_txn().await?;
        txn.run(query("RETURN 1")).await?;
        txn.rollback().await?;
        Ok(())
    }
}

#[async_trait]
impl GraphSink for Neo4jGraph {
    async fn run(&self, statement: &ImportStatement) -> Result<(), GraphError> {
        debug!(step = %statement.step, cypher = %statement.cypher, "Running import statement");
        let mut txn = self.graph.start_txn().await?;
        txn.run(query(&statement.cypher)).await?;
        txn.commit().await?;
        Ok(())
    }

    async fn close(self) -> Result<(), GraphError> {
        info!(uri = %self.uri, "Closing graph database connection");
        // Dropping the last handle shuts down the driver's connection pool.
        drop(self.graph);
        Ok(())
    }
}
