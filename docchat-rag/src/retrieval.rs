//! Retrieval and context assembly.
//!
//! Queries the vector index and formats the retrieved chunks into a single
//! context block for prompting, applying the relevance gate.

use std::sync::Arc;

use tracing::debug;

use crate::error::Result;
use crate::index::VectorIndex;

/// Marker used as context when retrieval found nothing; callers must
/// short-circuit generation when they see `is_relevant == false`.
pub const NO_CONTEXT_MARKER: &str = "No relevant information was found in the loaded documents.";

/// The formatted context block for one query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledContext {
    /// Retrieved chunk contents formatted as numbered blocks, or the
    /// [`NO_CONTEXT_MARKER`] when nothing was retrieved.
    pub context: String,
    /// True iff retrieval returned at least one result.
    pub is_relevant: bool,
}

/// Retrieves passages for a query and assembles the prompt context.
#[derive(Clone)]
pub struct ContextAssembler {
    index: Arc<VectorIndex>,
}

impl ContextAssembler {
    /// Create an assembler over the given index.
    pub fn new(index: Arc<VectorIndex>) -> Self {
        Self { index }
    }

    /// Search the index for `query` and format the `k` best chunks.
    ///
    /// Results keep the index's ascending-distance order, each rendered as
    /// `Document N:` followed by the chunk content. Any non-empty retrieval
    /// counts as relevant.
    ///
    /// # Errors
    ///
    /// Propagates embedding failures from the underlying search.
    pub async fn assemble(&self, query: &str, k: usize) -> Result<AssembledContext> {
        let results = self.index.search(query, k).await?;

        if results.is_empty() {
            debug!("no results retrieved, context marked not relevant");
            return Ok(AssembledContext {
                context: NO_CONTEXT_MARKER.to_string(),
                is_relevant: false,
            });
        }

        debug!(result_count = results.len(), "assembled retrieval context");

        let context = results
            .iter()
            .enumerate()
            .map(|(i, result)| format!("Document {}:\n{}\n", i + 1, result.content))
            .collect::<Vec<_>>()
            .join("\n");

        Ok(AssembledContext { context, is_relevant: true })
    }
}
