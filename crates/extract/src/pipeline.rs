use thiserror::Error;
use tracing::{debug, info, warn};

use tabula_core::{PipelineConfig, Transaction};
use tabula_ingest::{chunk_prepared, locate_header, parse_rows, prepare, read_grid, ReadError, Redactor};

use crate::orchestrator::{extract_with_fallback, ExtractError, ExtractionContext};
use crate::postprocess::flag_balance_outliers;
use crate::provider::{ChatCompletionsProvider, ExtractionProvider};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Read(#[from] ReadError),
    #[error(transparent)]
    Extraction(#[from] ExtractError),
}

/// The whole ingestion pipeline for one request: read → locate header →
/// deterministic baseline → prepared/redacted text → provider fallback →
/// post-processing.
///
/// One instance serves many requests; each call owns its inputs and shares no
/// mutable state. Dropping the returned future (caller disconnect) abandons
/// any in-flight provider call — results are all-or-nothing per request.
pub struct StatementPipeline<P> {
    config: PipelineConfig,
    providers: Vec<P>,
}

impl StatementPipeline<ChatCompletionsProvider> {
    /// Build the production pipeline; providers without API keys are skipped.
    pub fn from_config(config: PipelineConfig) -> Self {
        let providers = config
            .providers
            .iter()
            .filter_map(|p| ChatCompletionsProvider::from_config(p, config.provider_timeout_secs))
            .collect();
        Self { config, providers }
    }
}

impl<P: ExtractionProvider> StatementPipeline<P> {
    pub fn with_providers(config: PipelineConfig, providers: Vec<P>) -> Self {
        Self { config, providers }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub async fn normalize(&self, bytes: &[u8]) -> Result<Vec<Transaction>, PipelineError> {
        let grid = read_grid(bytes)?;
        let header = locate_header(&grid);
        debug!(rows = grid.len(), header_row = header.header_row, "located header");

        // The deterministic parse always runs; it is the fallback of last
        // resort and the whole answer when external calls are off.
        let baseline = parse_rows(&grid, &header, &self.config);
        debug!(transactions = baseline.len(), "deterministic baseline parsed");

        if self.config.disable_external || self.providers.is_empty() {
            info!("external extraction disabled; returning deterministic result");
            flag_balance_outliers(&baseline);
            return Ok(baseline);
        }

        let redactor = Redactor::from_config(&self.config);
        let prepared = prepare(&grid, &header, &redactor);
        let chunks = if prepared.total_chars() > self.config.chunk_threshold_chars {
            chunk_prepared(&prepared, self.config.chunk_max_chars)
        } else {
            vec![prepared.to_text()]
        };
        debug!(chunks = chunks.len(), "prepared extraction input");

        let ctx = ExtractionContext { grid: &grid, header: &header, config: &self.config };
        match extract_with_fallback(&self.providers, &chunks, ctx).await {
            Ok(txs) => Ok(txs),
            Err(err) if !baseline.is_empty() => {
                warn!(error = %err, "extraction exhausted; using deterministic result");
                flag_balance_outliers(&baseline);
                Ok(baseline)
            }
            Err(err) => Err(err.into()),
        }
    }
}
