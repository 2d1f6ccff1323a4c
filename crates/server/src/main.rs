use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use tabula_core::PipelineConfig;
use tabula_extract::StatementPipeline;

mod error;
mod routes;

use routes::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = PipelineConfig::from_env();

    let default_filter = if config.debug_logging { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    if config.disable_external {
        tracing::info!("external extraction disabled by kill switch");
    } else if config.usable_providers().is_empty() {
        tracing::warn!("no provider API keys configured; running deterministic-only");
    }

    let bind_addr = config.bind_addr.clone();
    let state = Arc::new(AppState { pipeline: StatementPipeline::from_config(config) });
    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("listening on {bind_addr}");
    axum::serve(listener, app).await?;
    Ok(())
}
