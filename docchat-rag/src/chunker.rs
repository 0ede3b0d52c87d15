//! Sentence-aware document chunking.
//!
//! Splits normalized text into overlapping segments, preferring to cut at
//! sentence-terminal punctuation, then clause separators, then spaces.

use uuid::Uuid;

use crate::document::{Chunk, ChunkMetadata};
use crate::error::{RagError, Result};

/// Source tag attached to chunks produced from uploaded documents.
pub const SOURCE_PDF_UPLOAD: &str = "pdf_upload";

/// Splits text into overlapping chunks bounded at natural break points.
///
/// The input is whitespace-normalized first. Each chunk targets
/// `chunk_size` characters; before cutting, the chunker searches backward
/// from the target boundary for the nearest sentence-terminal punctuation
/// (`.` `!` `?`), then clause separators (`,` `;`), then falls back to the
/// nearest space. The search window is bounded so no cut point produces a
/// degenerately small chunk. Consecutive chunks share `chunk_overlap`
/// characters.
///
/// # Example
///
/// ```rust,ignore
/// use docchat_rag::SentenceChunker;
///
/// let chunker = SentenceChunker::new(1000, 200);
/// let chunks = chunker.chunk("Some extracted document text.")?;
/// ```
#[derive(Debug, Clone)]
pub struct SentenceChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl SentenceChunker {
    /// Create a new `SentenceChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size` - target number of characters per chunk
    /// * `chunk_overlap` - number of overlapping characters between consecutive chunks
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self { chunk_size, chunk_overlap }
    }

    /// Split extracted text into chunks with sequential metadata.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmptyDocument`] if the text is empty after
    /// whitespace normalization.
    pub fn chunk(&self, text: &str) -> Result<Vec<Chunk>> {
        let normalized = normalize_whitespace(text);
        if normalized.is_empty() {
            return Err(RagError::EmptyDocument);
        }

        let chars: Vec<char> = normalized.chars().collect();
        let len = chars.len();
        let mut segments: Vec<String> = Vec::new();
        let mut start = 0;

        while start < len {
            let mut end = (start + self.chunk_size).min(len);

            if end < len {
                end = self.natural_boundary(&chars, start, end);
            }

            let segment: String = chars[start..end].iter().collect();
            let segment = segment.trim();
            if !segment.is_empty() {
                segments.push(segment.to_string());
            }

            if end >= len {
                break;
            }

            // Advance with overlap; stop if the window no longer moves forward.
            let next_start = end.saturating_sub(self.chunk_overlap);
            if next_start <= start {
                break;
            }
            start = next_start;
        }

        Ok(segments
            .into_iter()
            .enumerate()
            .map(|(chunk_index, content)| Chunk {
                content,
                metadata: ChunkMetadata {
                    chunk_id: Uuid::new_v4(),
                    chunk_index,
                    source: SOURCE_PDF_UPLOAD.to_string(),
                },
            })
            .collect())
    }

    /// Find a natural cut point before `end`, searching backward.
    ///
    /// Sentence-terminal punctuation wins over clause separators, which win
    /// over plain spaces. Punctuation cuts are inclusive; space cuts are
    /// exclusive. The scan stops below `end` so an inclusive cut never
    /// pushes a chunk past its target length. Returns `end` unchanged if
    /// the window holds no break point.
    fn natural_boundary(&self, chars: &[char], start: usize, end: usize) -> usize {
        // The window floor keeps cuts from collapsing the chunk below half
        // its target size.
        let floor = start
            + std::cmp::max(self.chunk_size / 2, self.chunk_size.saturating_sub(100));
        let floor = floor.min(end);

        for i in (floor..end).rev() {
            if matches!(chars[i], '.' | '!' | '?') {
                return i + 1;
            }
        }
        for i in (floor..end).rev() {
            if matches!(chars[i], ',' | ';') {
                return i + 1;
            }
        }
        for i in (floor..end).rev() {
            if chars[i] == ' ' {
                return i;
            }
        }

        end
    }
}

/// Collapse whitespace runs to single spaces and trim the ends.
fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
