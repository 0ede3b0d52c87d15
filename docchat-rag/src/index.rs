//! Persistent vector index with nearest-neighbor search.
//!
//! The index owns its embedding provider as the vectorization strategy:
//! [`VectorIndex::add`] embeds chunk contents in one batch call and
//! [`VectorIndex::search`] embeds the query. Entries live in memory and are
//! persisted as a single JSON blob after every successful write, so a crash
//! after `add` returns cannot lose the write.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::document::{Chunk, SimilarityResult};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};

/// One stored vector with its payload. Created on `add`, destroyed only by
/// a full [`VectorIndex::clear`].
#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexEntry {
    vector: Vec<f32>,
    chunk: Chunk,
}

/// The serialized shape of the index on disk.
#[derive(Debug, Default, Serialize, Deserialize)]
struct IndexState {
    entries: Vec<IndexEntry>,
}

/// Collection statistics reported by [`VectorIndex::stats`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexStats {
    /// Number of chunks currently searchable.
    pub total_documents: usize,
}

/// A searchable store mapping content chunks to embedding vectors.
///
/// The state is `None` until the first successful [`add`](VectorIndex::add);
/// searching a never-created index returns an empty result set rather than
/// an error. Writes hold an exclusive lock so partial persistence cannot
/// interleave; reads proceed against the last-committed state.
pub struct VectorIndex {
    embedder: Arc<dyn EmbeddingProvider>,
    storage_path: PathBuf,
    state: RwLock<Option<IndexState>>,
}

impl VectorIndex {
    /// Open the index at `storage_path`, loading any durable representation.
    ///
    /// A missing file starts the index empty. A corrupt file is logged and
    /// treated as empty, not fatal.
    pub fn open(storage_path: impl Into<PathBuf>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        let storage_path = storage_path.into();
        let state = load_state(&storage_path);
        Self { embedder, storage_path, state: RwLock::new(state) }
    }

    /// Embed and append chunks, creating the index on first use.
    ///
    /// Embeddings for all chunk contents are computed in one batch call.
    /// The index is persisted before this method returns; on any embedding
    /// or persistence failure nothing is committed and the in-memory state
    /// rolls back to the last persisted snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Embedding`] if the provider fails and
    /// [`RagError::Index`] if persistence fails.
    pub async fn add(&self, chunks: &[Chunk]) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }

        let texts: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;
        if embeddings.len() != chunks.len() {
            return Err(RagError::Index(format!(
                "provider returned {} embeddings for {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }

        let mut guard = self.state.write().await;
        let existed = guard.is_some();
        let state = guard.get_or_insert_with(IndexState::default);
        let prev_len = state.entries.len();
        state.entries.extend(
            embeddings
                .into_iter()
                .zip(chunks.iter().cloned())
                .map(|(vector, chunk)| IndexEntry { vector, chunk }),
        );

        if let Err(e) = persist_state(&self.storage_path, state).await {
            // Roll back to the last persisted snapshot.
            if existed {
                state.entries.truncate(prev_len);
            } else {
                *guard = None;
            }
            return Err(e);
        }

        info!(added = chunks.len(), total = state.entries.len(), "indexed chunks");
        Ok(())
    }

    /// Return the `k` nearest entries to `query`, ordered by increasing
    /// squared Euclidean distance.
    ///
    /// A never-created index yields an empty result set without invoking
    /// the embedding provider.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<SimilarityResult>> {
        if self.state.read().await.is_none() {
            return Ok(Vec::new());
        }

        let query_vector = self.embedder.embed(query).await?;

        let guard = self.state.read().await;
        let Some(state) = guard.as_ref() else {
            return Ok(Vec::new());
        };

        let mut results: Vec<SimilarityResult> = state
            .entries
            .iter()
            .map(|entry| SimilarityResult {
                content: entry.chunk.content.clone(),
                metadata: entry.chunk.metadata.clone(),
                distance: squared_distance(&entry.vector, &query_vector),
            })
            .collect();

        results
            .sort_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(k);
        Ok(results)
    }

    /// Report how many chunks are currently searchable.
    pub async fn stats(&self) -> IndexStats {
        let guard = self.state.read().await;
        let total_documents = guard.as_ref().map_or(0, |s| s.entries.len());
        IndexStats { total_documents }
    }

    /// Discard the in-memory index and delete its durable representation.
    ///
    /// Subsequent searches behave as "never created" until the next `add`.
    /// Clearing an already-cleared index is a no-op.
    pub async fn clear(&self) -> Result<()> {
        let mut guard = self.state.write().await;
        *guard = None;

        match tokio::fs::remove_file(&self.storage_path).await {
            Ok(()) => {
                info!(path = %self.storage_path.display(), "cleared vector index");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(RagError::Index(format!("failed to delete index blob: {e}"))),
        }
    }
}

/// Squared Euclidean distance between two vectors (lower is closer).
fn squared_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Load the durable representation, treating absent or corrupt blobs as an
/// empty index.
fn load_state(path: &Path) -> Option<IndexState> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read index blob, starting empty");
            return None;
        }
    };

    match serde_json::from_slice::<IndexState>(&bytes) {
        Ok(state) => {
            info!(path = %path.display(), entries = state.entries.len(), "loaded vector index");
            Some(state)
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "corrupt index blob, starting empty");
            None
        }
    }
}

/// Write the index blob atomically: temp file in the same directory, then
/// rename over the target.
async fn persist_state(path: &Path, state: &IndexState) -> Result<()> {
    let bytes = serde_json::to_vec(state)
        .map_err(|e| RagError::Index(format!("failed to serialize index: {e}")))?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| RagError::Index(format!("failed to create index directory: {e}")))?;
        }
    }

    let tmp_path = path.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, &bytes)
        .await
        .map_err(|e| RagError::Index(format!("failed to write index blob: {e}")))?;
    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| RagError::Index(format!("failed to commit index blob: {e}")))?;

    Ok(())
}
