pub mod orchestrator;
pub mod pipeline;
pub mod postprocess;
pub mod prompts;
pub mod provider;
pub mod types;

pub use orchestrator::{extract_with_fallback, AttemptOutcome, ExtractError, ExtractionContext};
pub use pipeline::{PipelineError, StatementPipeline};
pub use provider::{ChatCompletionsProvider, ExtractionProvider, ProviderError};
pub use types::{ExtractedRecord, ExtractionPayload};
