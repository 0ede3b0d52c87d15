//! Data types for chunks and search results.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Positional metadata attached to every [`Chunk`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkMetadata {
    /// Unique identifier for the chunk.
    pub chunk_id: Uuid,
    /// Zero-based position of the chunk within its source document.
    pub chunk_index: usize,
    /// Tag identifying where the chunk came from.
    pub source: String,
}

/// A bounded, overlap-linked segment of a source document's text.
///
/// Chunks are immutable once created: the chunker produces them from one
/// document's extracted text and they persist as vector index entries until
/// the collection is cleared.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// The text content of the chunk. Non-empty, whitespace-normalized.
    pub content: String,
    /// Positional metadata for the chunk.
    pub metadata: ChunkMetadata,
}

/// A retrieved [`Chunk`] paired with its distance to the query vector.
///
/// Ephemeral: produced per query, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarityResult {
    /// The retrieved chunk content.
    pub content: String,
    /// Metadata of the retrieved chunk.
    pub metadata: ChunkMetadata,
    /// Squared Euclidean distance to the query vector (lower is closer).
    pub distance: f32,
}
