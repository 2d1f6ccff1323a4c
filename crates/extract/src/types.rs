use serde::Deserialize;

use tabula_core::Direction;

use crate::provider::ProviderError;

/// One transaction as returned by an extraction provider, before
/// post-processing. Everything except the amount is optional — models drop
/// fields freely and the post-processor recovers what it can.
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractedRecord {
    pub amount: f64,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub merchant: Option<String>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub direction: Option<Direction>,
    #[serde(default)]
    pub line_index: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExtractionPayload {
    #[serde(default)]
    pub transactions: Vec<ExtractedRecord>,
}

/// Decode a provider's content string, tolerating a markdown code fence
/// around the JSON body.
pub fn parse_payload(raw: &str) -> Result<ExtractionPayload, ProviderError> {
    let cleaned = strip_code_fence(raw);
    serde_json::from_str(cleaned).map_err(|e| {
        let head: String = cleaned.chars().take(120).collect();
        ProviderError::ResponseInvalid(format!("payload is not valid extraction JSON: {e} (head: {head})"))
    })
}

/// Remove a surrounding ```/```json fence if present.
pub fn strip_code_fence(raw: &str) -> &str {
    raw.trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}
