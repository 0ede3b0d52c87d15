use std::sync::Arc;

use docchat_rag::{
    ChatEngine, OpenAiChatModel, OpenAiEmbeddingProvider, RagConfig, SentenceChunker, VectorIndex,
};
use docchat_server::routes::{run_server, AppState};
use docchat_server::{ServerConfig, SessionManager};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env()?;
    let rag = RagConfig::default();

    let embedder = Arc::new(OpenAiEmbeddingProvider::from_env()?);
    let index = Arc::new(VectorIndex::open(config.index_path(), embedder));
    let model = Arc::new(OpenAiChatModel::from_env()?);

    let state = AppState {
        chunker: SentenceChunker::new(rag.chunk_size, rag.chunk_overlap),
        engine: ChatEngine::new(model, index.clone(), rag),
        index,
        sessions: SessionManager::default(),
        config: Arc::new(config.clone()),
    };

    run_server(config, state).await
}
