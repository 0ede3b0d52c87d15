//! API error type mapped onto HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use docchat_rag::RagError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Failures surfaced by the REST boundary.
///
/// Every variant renders as a JSON body `{"detail": "..."}` with a status
/// matching its class. Messages carry the operation and underlying cause
/// but never credentials or raw provider payloads.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request itself was unacceptable (wrong file type, oversized
    /// upload, malformed multipart body).
    #[error("{0}")]
    Validation(String),

    /// The uploaded document could not be read as a PDF.
    #[error("invalid or unreadable PDF: {0}")]
    Extraction(String),

    /// A pipeline failure (embedding, persistence, generation setup).
    #[error(transparent)]
    Rag(#[from] RagError),

    /// Anything else that went wrong server-side.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::Extraction(_) => StatusCode::BAD_REQUEST,
            Self::Rag(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}
