use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use tabula_extract::PipelineError;
use tabula_ingest::ReadError;

/// A client-facing failure: a status code and a human-readable message.
/// Provider internals never pass through here verbatim.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self { status: StatusCode::BAD_REQUEST, message: message.into() }
    }

    pub fn too_large(message: impl Into<String>) -> Self {
        Self { status: StatusCode::PAYLOAD_TOO_LARGE, message: message.into() }
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self { status: StatusCode::BAD_GATEWAY, message: message.into() }
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Read(ReadError::UnreadableFile(_)) => {
                Self::bad_request("could not read the uploaded file as a spreadsheet or CSV")
            }
            PipelineError::Read(ReadError::EmptyFile) => {
                Self::bad_request("the uploaded file contains no statement rows")
            }
            PipelineError::Extraction(e) => Self::bad_gateway(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "success": false, "error": self.message }));
        (self.status, body).into_response()
    }
}
