use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use tabula_core::Transaction;
use tabula_extract::{ChatCompletionsProvider, StatementPipeline};

use crate::error::ApiError;

/// Accepted multipart field names for the statement upload.
const UPLOAD_FIELDS: &[&str] = &["file", "excel", "spreadsheet"];

pub struct AppState {
    pub pipeline: StatementPipeline<ChatCompletionsProvider>,
}

pub fn router(state: Arc<AppState>) -> Router {
    // Body limit sits slightly above the configured cap so the handler can
    // return the structured 413 instead of a bare hyper error.
    let body_limit = state.pipeline.config().max_upload_bytes + 64 * 1024;

    Router::new()
        .route("/health", get(health))
        .route("/api/statements", post(normalize_statement))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

#[derive(Debug, Serialize)]
pub struct NormalizeResponse {
    pub success: bool,
    pub expenses: Vec<Transaction>,
}

/// POST /api/statements — multipart upload in, normalized transactions out.
async fn normalize_statement(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<NormalizeResponse>, ApiError> {
    let max_bytes = state.pipeline.config().max_upload_bytes;
    let mut file_data: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("malformed multipart body: {e}")))?
    {
        let name = field.name().unwrap_or("").to_string();
        if !UPLOAD_FIELDS.contains(&name.as_str()) {
            continue;
        }
        let bytes = field
            .bytes()
            .await
            .map_err(|_| ApiError::bad_request("failed to read uploaded file"))?;
        if bytes.len() > max_bytes {
            return Err(ApiError::too_large(format!(
                "file too large; the limit is {} MB",
                max_bytes / 1024 / 1024
            )));
        }
        file_data = Some(bytes.to_vec());
        break;
    }

    let file_data = file_data.ok_or_else(|| {
        ApiError::bad_request("missing file field (expected one of: file, excel, spreadsheet)")
    })?;

    info!(bytes = file_data.len(), "processing statement upload");
    let expenses = state.pipeline.normalize(&file_data).await?;
    info!(transactions = expenses.len(), "statement normalized");

    Ok(Json(NormalizeResponse { success: true, expenses }))
}
