use crate::error::LoaderError;
use crate::graph::{GraphSink, Neo4jGraph};
use crate::source::read_trips;
use crate::staging::{StagedFile, StagingArea};
use crate::statements::{import_plan, ImportStep};
use std::path::Path;
use tracing::info;
use tripgraph_core::config::{AppConfig, DatabaseConfig};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadSummary {
    pub staged: StagedFile,
    pub steps: Vec<ImportStep>,
}

impl LoadSummary {
    pub fn rows(&self) -> usize {
        self.staged.rows
    }
}

/// Owns one graph connection and loads trip files through it.
///
/// `close` consumes the loader. Dropping it on an error path releases the
/// connection as well.
pub struct Loader<G: GraphSink = Neo4jGraph> {
    graph: G,
    staging: StagingArea,
}

impl Loader<Neo4jGraph> {
    pub async fn connect(config: &DatabaseConfig, staging: StagingArea) -> Result<Self, LoaderError> {
        let graph = Neo4jGraph::connect(config)
            .await
            .map_err(LoaderError::Connectivity)?;
        Ok(Self::with_graph(graph, staging))
    }
}

impl<G: GraphSink> Loader<G> {
    pub fn with_graph(graph: G, staging: StagingArea) -> Self {
        Self { graph, staging }
    }

    /// Reads `input`, stages it as CSV and runs the import statements in order.
    ///
    /// Statements are not wrapped in a shared transaction: if a later one
    /// fails, nodes merged by earlier ones stay in the graph.
    pub async fn ingest(&self, input: impl AsRef<Path>) -> Result<LoadSummary, LoaderError> {
        let input = input.as_ref();
        let trips = read_trips(input)?;
        let staged = self.staging.stage(input, &trips)?;

        let mut steps = Vec::with_capacity(ImportStep::ALL.len());
        for statement in import_plan(&staged) {
            info!(step = %statement.step, source = %statement.source_url, "Running import step");
            self.graph
                .run(&statement)
                .await
                .map_err(|source| LoaderError::Statement {
                    step: statement.step,
                    source,
                })?;
            steps.push(statement.step);
        }

        info!(rows = staged.rows, path = %staged.path.display(), "Loaded trips into graph");
        Ok(LoadSummary { staged, steps })
    }

    pub async fn close(self) -> Result<(), LoaderError> {
        self.graph.close().await.map_err(LoaderError::Connectivity)
    }
}

/// Connect, ingest the configured input and close, closing even when the
/// ingest fails.
pub async fn run_once(config: &AppConfig) -> Result<LoadSummary, LoaderError> {
    let staging = StagingArea::new(&config.ingest.import_dir);
    let loader = Loader::connect(&config.database, staging).await?;
    load_and_close(loader, &config.ingest.input_path).await
}

pub async fn load_and_close<G: GraphSink>(
    loader: Loader<G>,
    input: impl AsRef<Path>,
) -> Result<LoadSummary, LoaderError> {
    let result = loader.ingest(input).await;
    let closed = loader.close().await;
    let summary = result?;
    closed?;
    Ok(summary)
}
