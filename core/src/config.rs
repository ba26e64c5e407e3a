use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// Bolt routing URI. The plain `neo4j://` and `bolt://` schemes connect without TLS.
    pub uri: String,
    pub user: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    pub input_path: PathBuf,
    /// Directory the database server reads `LOAD CSV` sources from.
    pub import_dir: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub delay_secs: u64,
    #[serde(default)]
    pub retry_all_errors: bool,
}

impl RetryConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub ingest: IngestConfig,
    pub retry: RetryConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_dir("config")
    }

    /// Layers built-in defaults, `<dir>/default`, `<dir>/<RUN_MODE>` and
    /// `TRIPGRAPH_*` environment variables, later sources winning.
    pub fn load_from_dir(dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let dir = dir.as_ref();
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            .set_default("database.uri", "neo4j://localhost:7687")?
            .set_default("database.user", "neo4j")?
            .set_default("database.password", "project2phase1")?
            .set_default("ingest.input_path", "yellow_tripdata_2022-03.parquet")?
            .set_default("ingest.import_dir", "/var/lib/neo4j/import")?
            .set_default("retry.max_attempts", 10_i64)?
            .set_default("retry.delay_secs", 10_i64)?
            .set_default("retry.retry_all_errors", false)?
            .add_source(File::from(dir.join("default")).required(false))
            .add_source(File::from(dir.join(&run_mode)).required(false))
            .add_source(
                Environment::with_prefix("TRIPGRAPH")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }
}
