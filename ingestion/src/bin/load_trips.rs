use anyhow::Context;
use ingestion::loader::run_once;
use ingestion::retry::RetryPolicy;
use tracing::{error, info};
use tripgraph_core::config::AppConfig;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tripgraph_core::init_tracing();

    let config = AppConfig::load().context("failed to load configuration")?;
    let policy = RetryPolicy::from(&config.retry);
    info!(
        input = %config.ingest.input_path.display(),
        uri = %config.database.uri,
        max_attempts = policy.max_attempts,
        "Starting trip load"
    );

    // The database may still be starting, so connection failures are retried.
    // Exhausting the attempts is logged, not reported through the exit code.
    match policy.run(|_| run_once(&config)).await {
        Ok(summary) => info!(
            rows = summary.rows(),
            staged = %summary.staged.path.display(),
            "Trip load finished"
        ),
        Err(err) => error!(attempts = err.attempts(), "Trip load abandoned: {}", err),
    }

    Ok(())
}
