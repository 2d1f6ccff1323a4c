use thiserror::Error;
use tracing::{info, warn};

use tabula_core::{PipelineConfig, RawGrid, Transaction};
use tabula_ingest::HeaderMap;

use crate::postprocess;
use crate::prompts::{user_prompt, SYSTEM_PROMPT};
use crate::provider::ExtractionProvider;
use crate::types::parse_payload;

/// Terminal failure: every provider and every model variant was exhausted.
/// Carries each provider's last error so the caller sees why both sides gave
/// up.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("all extraction providers failed: {0}")]
    AllProvidersFailed(String),
}

/// The result of one provider+model attempt — an explicit variant, not
/// control flow by exception. `Empty` is a soft failure that advances the
/// fallback chain.
#[derive(Debug)]
pub enum AttemptOutcome {
    Success(Vec<Transaction>),
    Empty,
    Failed(String),
}

/// Everything an attempt needs besides the chunk text: the original grid and
/// header map for date recovery, and the config for defaults.
#[derive(Clone, Copy)]
pub struct ExtractionContext<'a> {
    pub grid: &'a RawGrid,
    pub header: &'a HeaderMap,
    pub config: &'a PipelineConfig,
}

/// Drive the fallback state machine.
///
/// Providers are tried strictly in order, models within a provider strictly
/// in order; an attempt fails fast and is never retried. The first attempt
/// producing at least one post-processed transaction wins. Calls are
/// sequential throughout — across chunks, models and providers — to keep the
/// fallback ordering total and the external call volume bounded.
pub async fn extract_with_fallback<P: ExtractionProvider>(
    providers: &[P],
    chunks: &[String],
    ctx: ExtractionContext<'_>,
) -> Result<Vec<Transaction>, ExtractError> {
    let mut last_errors: Vec<String> = Vec::new();

    for provider in providers {
        let mut provider_last =
            format!("{}: no models configured", provider.name());

        for model in provider.models() {
            match attempt(provider, model, chunks, ctx).await {
                AttemptOutcome::Success(txs) => {
                    info!(
                        provider = provider.name(),
                        model = %model,
                        transactions = txs.len(),
                        "extraction succeeded"
                    );
                    return Ok(txs);
                }
                AttemptOutcome::Empty => {
                    warn!(provider = provider.name(), model = %model, "extraction returned no transactions");
                    provider_last =
                        format!("{}/{model}: returned no transactions", provider.name());
                }
                AttemptOutcome::Failed(err) => {
                    warn!(provider = provider.name(), model = %model, error = %err, "extraction attempt failed");
                    provider_last = format!("{}/{model}: {err}", provider.name());
                }
            }
        }

        last_errors.push(provider_last);
    }

    Err(ExtractError::AllProvidersFailed(last_errors.join("; ")))
}

/// One provider+model attempt over every chunk, sequentially, concatenating
/// results in chunk order. Any chunk failing fails the whole attempt so the
/// fallback decision stays uniform across chunks.
async fn attempt<P: ExtractionProvider>(
    provider: &P,
    model: &str,
    chunks: &[String],
    ctx: ExtractionContext<'_>,
) -> AttemptOutcome {
    let mut records = Vec::new();

    for chunk in chunks {
        let raw = match provider.extract(model, SYSTEM_PROMPT, &user_prompt(chunk)).await {
            Ok(raw) => raw,
            Err(e) => return AttemptOutcome::Failed(e.to_string()),
        };
        match parse_payload(&raw) {
            Ok(payload) => records.extend(payload.transactions),
            Err(e) => return AttemptOutcome::Failed(e.to_string()),
        }
    }

    let txs = postprocess::postprocess_records(records, ctx.grid, ctx.header, ctx.config);
    if txs.is_empty() {
        AttemptOutcome::Empty
    } else {
        AttemptOutcome::Success(txs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderError;
    use std::sync::Mutex;

    /// Scripted provider: pops one canned response per call and records the
    /// models it was asked for.
    struct MockProvider {
        name: String,
        models: Vec<String>,
        responses: Mutex<Vec<Result<String, ProviderError>>>,
        calls: Mutex<Vec<String>>,
    }

    impl MockProvider {
        fn new(name: &str, models: &[&str], responses: Vec<Result<String, ProviderError>>) -> Self {
            Self {
                name: name.to_string(),
                models: models.iter().map(|m| m.to_string()).collect(),
                responses: Mutex::new(responses),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl ExtractionProvider for MockProvider {
        fn name(&self) -> &str {
            &self.name
        }

        fn models(&self) -> &[String] {
            &self.models
        }

        async fn extract(&self, model: &str, _: &str, _: &str) -> Result<String, ProviderError> {
            self.calls.lock().unwrap().push(model.to_string());
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                Err(ProviderError::CallFailed("script exhausted".into()))
            } else {
                responses.remove(0)
            }
        }
    }

    fn good_payload() -> String {
        r#"{"transactions":[
            {"amount":50.0,"date":"2024-01-15","merchant":"Coffee Shop"},
            {"amount":20.0,"date":"2024-01-16","merchant":"Refund","direction":"credit"},
            {"amount":10.0,"date":"2024-02-13","merchant":"Lunch"}
        ]}"#
            .to_string()
    }

    fn empty_payload() -> String {
        r#"{"transactions":[]}"#.to_string()
    }

    fn ctx_parts() -> (RawGrid, HeaderMap, PipelineConfig) {
        (RawGrid::default(), HeaderMap::default(), PipelineConfig::default())
    }

    #[tokio::test]
    async fn first_provider_success_short_circuits() {
        let (grid, header, config) = ctx_parts();
        let ctx = ExtractionContext { grid: &grid, header: &header, config: &config };
        let p1 = MockProvider::new("primary", &["m1"], vec![Ok(good_payload())]);
        let p2 = MockProvider::new("secondary", &["m2"], vec![Ok(good_payload())]);

        let providers = vec![p1, p2];
        let txs = extract_with_fallback(&providers, &["text".to_string()], ctx).await.unwrap();

        assert_eq!(txs.len(), 3);
        assert_eq!(txs[1].amount, -20.0);
        assert_eq!(providers[0].calls(), vec!["m1"]);
        assert!(providers[1].calls().is_empty());
    }

    #[tokio::test]
    async fn empty_first_provider_falls_through_to_second() {
        let (grid, header, config) = ctx_parts();
        let ctx = ExtractionContext { grid: &grid, header: &header, config: &config };
        let p1 = MockProvider::new("primary", &["m1"], vec![Ok(empty_payload())]);
        let p2 = MockProvider::new("secondary", &["m2"], vec![Ok(good_payload())]);

        let providers = vec![p1, p2];
        let txs = extract_with_fallback(&providers, &["text".to_string()], ctx).await.unwrap();

        assert_eq!(txs.len(), 3);
        // Provider 1 was called exactly once and never again.
        assert_eq!(providers[0].calls(), vec!["m1"]);
        assert_eq!(providers[1].calls(), vec!["m2"]);
    }

    #[tokio::test]
    async fn models_tried_in_order_without_retry() {
        let (grid, header, config) = ctx_parts();
        let ctx = ExtractionContext { grid: &grid, header: &header, config: &config };
        let p1 = MockProvider::new(
            "primary",
            &["m1a", "m1b"],
            vec![Err(ProviderError::CallFailed("boom".into())), Ok(good_payload())],
        );

        let providers = vec![p1];
        let txs = extract_with_fallback(&providers, &["text".to_string()], ctx).await.unwrap();

        assert_eq!(txs.len(), 3);
        assert_eq!(providers[0].calls(), vec!["m1a", "m1b"]);
    }

    #[tokio::test]
    async fn all_failures_aggregate_both_providers_last_errors() {
        let (grid, header, config) = ctx_parts();
        let ctx = ExtractionContext { grid: &grid, header: &header, config: &config };
        let p1 = MockProvider::new(
            "primary",
            &["m1"],
            vec![Err(ProviderError::CallFailed("timeout".into()))],
        );
        let p2 = MockProvider::new("secondary", &["m2"], vec![Ok("not json".to_string())]);

        let providers = vec![p1, p2];
        let err = extract_with_fallback(&providers, &["text".to_string()], ctx).await.unwrap_err();

        let msg = err.to_string();
        assert!(msg.contains("primary/m1"), "{msg}");
        assert!(msg.contains("secondary/m2"), "{msg}");
        assert!(msg.contains("timeout"), "{msg}");
    }

    #[tokio::test]
    async fn chunks_processed_sequentially_and_concatenated() {
        let (grid, header, config) = ctx_parts();
        let ctx = ExtractionContext { grid: &grid, header: &header, config: &config };
        let chunk1 = r#"{"transactions":[{"amount":1.0,"date":"2024-01-01"}]}"#;
        let chunk2 = r#"{"transactions":[{"amount":2.0,"date":"2024-01-02"}]}"#;
        let p1 = MockProvider::new(
            "primary",
            &["m1"],
            vec![Ok(chunk1.to_string()), Ok(chunk2.to_string())],
        );

        let providers = vec![p1];
        let chunks = vec!["c1".to_string(), "c2".to_string()];
        let txs = extract_with_fallback(&providers, &chunks, ctx).await.unwrap();

        assert_eq!(txs.len(), 2);
        assert_eq!(txs[0].amount, 1.0);
        assert_eq!(txs[1].amount, 2.0);
        assert_eq!(providers[0].calls(), vec!["m1", "m1"]);
    }

    #[tokio::test]
    async fn mid_chunk_failure_fails_the_whole_attempt() {
        let (grid, header, config) = ctx_parts();
        let ctx = ExtractionContext { grid: &grid, header: &header, config: &config };
        let chunk1 = r#"{"transactions":[{"amount":1.0,"date":"2024-01-01"}]}"#;
        let p1 = MockProvider::new(
            "primary",
            &["m1"],
            vec![Ok(chunk1.to_string()), Err(ProviderError::CallFailed("boom".into()))],
        );

        let providers = vec![p1];
        let chunks = vec!["c1".to_string(), "c2".to_string()];
        let err = extract_with_fallback(&providers, &chunks, ctx).await.unwrap_err();
        assert!(err.to_string().contains("boom"));
    }
}
