//! PDF validation and text extraction boundary.

use std::path::{Path, PathBuf};

use crate::error::ApiError;

/// Check the upload before any bytes hit the pipeline: extension and size
/// only, content validity is the extractor's job.
pub fn validate_upload(filename: &str, size: usize, max_bytes: usize) -> Result<(), ApiError> {
    if !filename.to_lowercase().ends_with(".pdf") {
        return Err(ApiError::Validation("only PDF files are accepted".to_string()));
    }
    if size == 0 {
        return Err(ApiError::Validation("uploaded file is empty".to_string()));
    }
    if size > max_bytes {
        return Err(ApiError::Validation(format!(
            "file exceeds the {} MiB upload limit",
            max_bytes / (1024 * 1024)
        )));
    }
    Ok(())
}

/// Extract the text of a spooled PDF.
///
/// Extraction is CPU-bound, so it runs on the blocking pool. An unreadable
/// or corrupt file maps to [`ApiError::Extraction`]; a document with no
/// extractable text is also rejected here rather than producing an empty
/// ingestion downstream.
pub async fn extract_text(path: impl AsRef<Path>) -> Result<String, ApiError> {
    let path: PathBuf = path.as_ref().to_path_buf();
    let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text(&path))
        .await
        .map_err(|e| ApiError::Internal(format!("extraction task failed: {e}")))?
        .map_err(|e| ApiError::Extraction(e.to_string()))?;

    if text.trim().is_empty() {
        return Err(ApiError::Extraction("document contains no extractable text".to_string()));
    }
    Ok(text)
}
