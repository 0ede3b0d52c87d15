//! Integration tests for the persistent vector index: lifecycle, ordering,
//! durability, and failure handling.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use docchat_rag::{
    Chunk, ChunkMetadata, ContextAssembler, EmbeddingProvider, RagError, VectorIndex,
    NO_CONTEXT_MARKER,
};
use uuid::Uuid;

const DIM: usize = 4;

/// Deterministic embedder: known texts map to fixed vectors, anything else
/// to a stable hash-derived vector. Counts invocations so tests can assert
/// when embedding is skipped.
struct StubEmbedder {
    fixed: HashMap<String, Vec<f32>>,
    calls: AtomicUsize,
    fail: bool,
}

impl StubEmbedder {
    fn new() -> Self {
        Self { fixed: HashMap::new(), calls: AtomicUsize::new(0), fail: false }
    }

    fn failing() -> Self {
        Self { fixed: HashMap::new(), calls: AtomicUsize::new(0), fail: true }
    }

    fn with(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.fixed.insert(text.to_string(), vector);
        self
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn vector_for(&self, text: &str) -> Vec<f32> {
        if let Some(v) = self.fixed.get(text) {
            return v.clone();
        }
        let mut v = vec![0.0f32; DIM];
        for (i, b) in text.bytes().enumerate() {
            v[i % DIM] += f32::from(b) / 255.0;
        }
        v
    }
}

#[async_trait]
impl EmbeddingProvider for StubEmbedder {
    async fn embed(&self, text: &str) -> docchat_rag::Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(RagError::Embedding {
                provider: "stub".to_string(),
                message: "forced failure".to_string(),
            });
        }
        Ok(self.vector_for(text))
    }

    fn dimensions(&self) -> usize {
        DIM
    }
}

fn chunk(content: &str, chunk_index: usize) -> Chunk {
    Chunk {
        content: content.to_string(),
        metadata: ChunkMetadata {
            chunk_id: Uuid::new_v4(),
            chunk_index,
            source: "pdf_upload".to_string(),
        },
    }
}

fn index_path(dir: &tempfile::TempDir) -> std::path::PathBuf {
    dir.path().join("index.json")
}

#[tokio::test]
async fn search_on_never_created_index_is_empty_and_skips_embedding() {
    let dir = tempfile::tempdir().unwrap();
    let embedder = Arc::new(StubEmbedder::new());
    let index = VectorIndex::open(index_path(&dir), embedder.clone());

    let results = index.search("anything", 3).await.unwrap();
    assert!(results.is_empty());
    assert_eq!(embedder.call_count(), 0, "query must not be embedded");
    assert_eq!(index.stats().await.total_documents, 0);
}

#[tokio::test]
async fn add_then_search_orders_by_ascending_distance() {
    let dir = tempfile::tempdir().unwrap();
    let embedder = Arc::new(
        StubEmbedder::new()
            .with("near", vec![1.0, 0.0, 0.0, 0.0])
            .with("mid", vec![3.0, 0.0, 0.0, 0.0])
            .with("far", vec![9.0, 0.0, 0.0, 0.0])
            .with("query", vec![0.0, 0.0, 0.0, 0.0]),
    );
    let index = VectorIndex::open(index_path(&dir), embedder);

    let chunks = vec![chunk("far", 0), chunk("near", 1), chunk("mid", 2)];
    index.add(&chunks).await.unwrap();

    let results = index.search("query", 3).await.unwrap();
    let contents: Vec<&str> = results.iter().map(|r| r.content.as_str()).collect();
    assert_eq!(contents, ["near", "mid", "far"]);
    for window in results.windows(2) {
        assert!(window[0].distance <= window[1].distance);
    }
}

#[tokio::test]
async fn search_truncates_to_k() {
    let dir = tempfile::tempdir().unwrap();
    let embedder = Arc::new(StubEmbedder::new());
    let index = VectorIndex::open(index_path(&dir), embedder);

    let chunks: Vec<Chunk> =
        (0..5).map(|i| chunk(&format!("chunk number {i}"), i)).collect();
    index.add(&chunks).await.unwrap();

    let results = index.search("some query", 2).await.unwrap();
    assert_eq!(results.len(), 2);
}

#[tokio::test]
async fn adding_empty_slice_is_a_noop() {
    let dir = tempfile::tempdir().unwrap();
    let embedder = Arc::new(StubEmbedder::new());
    let index = VectorIndex::open(index_path(&dir), embedder.clone());

    index.add(&[]).await.unwrap();
    assert_eq!(embedder.call_count(), 0);
    assert_eq!(index.stats().await.total_documents, 0);
    assert!(!index_path(&dir).exists(), "no blob should be written");
}

#[tokio::test]
async fn index_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = index_path(&dir);

    {
        let embedder = Arc::new(StubEmbedder::new());
        let index = VectorIndex::open(&path, embedder);
        index.add(&[chunk("persisted content", 0)]).await.unwrap();
    }

    let embedder = Arc::new(StubEmbedder::new());
    let reopened = VectorIndex::open(&path, embedder);
    assert_eq!(reopened.stats().await.total_documents, 1);

    let results = reopened.search("persisted content", 1).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].content, "persisted content");
}

#[tokio::test]
async fn corrupt_blob_opens_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = index_path(&dir);
    std::fs::write(&path, b"{ not valid json").unwrap();

    let embedder = Arc::new(StubEmbedder::new());
    let index = VectorIndex::open(&path, embedder);
    assert_eq!(index.stats().await.total_documents, 0);
    assert!(index.search("anything", 3).await.unwrap().is_empty());
}

#[tokio::test]
async fn embedding_failure_leaves_index_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let path = index_path(&dir);
    let embedder = Arc::new(StubEmbedder::failing());
    let index = VectorIndex::open(&path, embedder);

    let err = index.add(&[chunk("doomed", 0)]).await.unwrap_err();
    assert!(matches!(err, RagError::Embedding { .. }));
    assert_eq!(index.stats().await.total_documents, 0);
    assert!(!path.exists(), "failed add must not persist anything");
}

#[tokio::test]
async fn clear_removes_blob_and_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = index_path(&dir);
    let embedder = Arc::new(StubEmbedder::new());
    let index = VectorIndex::open(&path, embedder);

    index.add(&[chunk("to be cleared", 0)]).await.unwrap();
    assert!(path.exists());

    index.clear().await.unwrap();
    assert!(!path.exists());
    assert_eq!(index.stats().await.total_documents, 0);
    assert!(index.search("to be cleared", 1).await.unwrap().is_empty());

    // Clearing again must not fail.
    index.clear().await.unwrap();
}

#[tokio::test]
async fn assemble_on_empty_index_is_not_relevant() {
    let dir = tempfile::tempdir().unwrap();
    let embedder = Arc::new(StubEmbedder::new());
    let index = Arc::new(VectorIndex::open(index_path(&dir), embedder));

    let assembled = ContextAssembler::new(index).assemble("anything", 3).await.unwrap();
    assert!(!assembled.is_relevant);
    assert_eq!(assembled.context, NO_CONTEXT_MARKER);
}

#[tokio::test]
async fn assemble_formats_numbered_blocks_in_rank_order() {
    let dir = tempfile::tempdir().unwrap();
    let embedder = Arc::new(
        StubEmbedder::new()
            .with("closest passage", vec![1.0, 0.0, 0.0, 0.0])
            .with("further passage", vec![5.0, 0.0, 0.0, 0.0])
            .with("query", vec![0.0, 0.0, 0.0, 0.0]),
    );
    let index = Arc::new(VectorIndex::open(index_path(&dir), embedder));
    index.add(&[chunk("further passage", 0), chunk("closest passage", 1)]).await.unwrap();

    let assembled = ContextAssembler::new(index).assemble("query", 2).await.unwrap();
    assert!(assembled.is_relevant);
    assert_eq!(
        assembled.context,
        "Document 1:\nclosest passage\n\nDocument 2:\nfurther passage\n"
    );
}

#[tokio::test]
async fn stats_accumulate_across_adds() {
    let dir = tempfile::tempdir().unwrap();
    let embedder = Arc::new(StubEmbedder::new());
    let index = VectorIndex::open(index_path(&dir), embedder);

    index.add(&[chunk("first batch one", 0), chunk("first batch two", 1)]).await.unwrap();
    index.add(&[chunk("second batch", 0)]).await.unwrap();
    assert_eq!(index.stats().await.total_documents, 3);
}
