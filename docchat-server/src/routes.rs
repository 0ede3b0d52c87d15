//! HTTP boundary: shared state, router, and the REST handlers.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use docchat_rag::{ChatEngine, SentenceChunker, VectorIndex};
use serde::Serialize;
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::error::ApiError;
use crate::extract;
use crate::session::SessionManager;
use crate::ws;

// Headroom for multipart framing around the document itself.
const UPLOAD_BODY_OVERHEAD: usize = 64 * 1024;

/// Everything the handlers share.
#[derive(Clone)]
pub struct AppState {
    pub chunker: SentenceChunker,
    pub index: Arc<VectorIndex>,
    pub engine: ChatEngine,
    pub sessions: SessionManager,
    pub config: Arc<ServerConfig>,
}

#[derive(Debug, Serialize)]
struct UploadResponse {
    message: String,
    file_id: Uuid,
    total_chunks: usize,
    total_characters: usize,
}

pub fn app_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let body_limit = state.config.max_upload_bytes + UPLOAD_BODY_OVERHEAD;

    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/upload-pdf", post(upload_pdf))
        .route("/documents", get(get_documents).delete(clear_documents))
        .route("/ws/chat", get(ws::ws_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn run_server(config: ServerConfig, state: AppState) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(&config.upload_dir)
        .await
        .with_context(|| format!("creating upload dir {}", config.upload_dir.display()))?;
    tokio::fs::create_dir_all(&config.data_dir)
        .await
        .with_context(|| format!("creating data dir {}", config.data_dir.display()))?;

    let app = app_router(state);
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| "invalid host/port for docchat-server")?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("docchat-server listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn index() -> impl IntoResponse {
    Json(json!({"message": "docchat RAG service is running"}))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let stats = state.index.stats().await;
    Json(json!({"status": "healthy", "vector_store": stats}))
}

/// `POST /upload-pdf`: spool the upload, extract, chunk, and index it.
///
/// The spooled file is removed on every exit path, success and failure
/// alike.
async fn upload_pdf(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("malformed multipart body: {e}")))?
    {
        if field.name() == Some("file") {
            let filename = field.file_name().unwrap_or_default().to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::Validation(format!("failed to read upload: {e}")))?;
            upload = Some((filename, bytes));
            break;
        }
    }
    let (filename, bytes) =
        upload.ok_or_else(|| ApiError::Validation("missing \"file\" field".to_string()))?;

    extract::validate_upload(&filename, bytes.len(), state.config.max_upload_bytes)?;

    let file_id = Uuid::new_v4();
    let spool_path = state.config.upload_dir.join(format!("{file_id}.pdf"));
    tokio::fs::create_dir_all(&state.config.upload_dir)
        .await
        .map_err(|e| ApiError::Internal(format!("failed to create upload dir: {e}")))?;
    tokio::fs::write(&spool_path, &bytes)
        .await
        .map_err(|e| ApiError::Internal(format!("failed to spool upload: {e}")))?;

    let result = ingest(&state, &spool_path).await;

    if let Err(e) = tokio::fs::remove_file(&spool_path).await {
        warn!(path = %spool_path.display(), error = %e, "failed to remove spooled upload");
    }

    let (total_chunks, total_characters) = result?;
    info!(%file_id, filename, total_chunks, total_characters, "document ingested");

    Ok(Json(UploadResponse {
        message: "PDF processed successfully".to_string(),
        file_id,
        total_chunks,
        total_characters,
    }))
}

/// Extract, chunk, and index one spooled document. Nothing is committed
/// unless the whole batch succeeds.
async fn ingest(state: &AppState, path: &Path) -> Result<(usize, usize), ApiError> {
    let text = extract::extract_text(path).await?;
    let total_characters = text.chars().count();

    let chunks = state.chunker.chunk(&text)?;
    let total_chunks = chunks.len();
    state.index.add(&chunks).await?;

    Ok((total_chunks, total_characters))
}

async fn get_documents(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.index.stats().await)
}

async fn clear_documents(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    state.index.clear().await?;
    info!("document index cleared");
    Ok(Json(json!({"message": "documents cleared successfully"})))
}
