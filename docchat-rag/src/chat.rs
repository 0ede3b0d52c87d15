//! Generation orchestrator.
//!
//! [`ChatEngine`] ties retrieval and generation together: it assembles the
//! prompt (system instruction, bounded history, retrieved context, query),
//! invokes the chat model in streaming mode, and forwards fragments as they
//! arrive. Failures are surfaced as content so the client always receives a
//! well-formed terminal fragment.

use std::pin::Pin;
use std::sync::Arc;

use async_stream::stream;
use futures::{Stream, StreamExt};
use tracing::{error, info};

use crate::config::RagConfig;
use crate::index::VectorIndex;
use crate::model::{ChatModel, ChatTurn, GenerationRequest};
use crate::retrieval::ContextAssembler;

/// Fixed reply when retrieval found nothing relevant. The system instruction
/// tells the model to emit this exact string when the context is
/// insufficient, so the empty-index path and the model's own refusal agree.
pub const NO_INFORMATION_REPLY: &str =
    "I do not have information about that topic in the loaded documents.";

/// System instruction constraining the model to the supplied context.
const SYSTEM_INSTRUCTION: &str = "You are a helpful assistant that answers questions based ONLY \
     on the documents provided. Use only the information in the context to answer. If the context \
     does not contain the relevant information, reply exactly: \"I do not have information about \
     that topic in the loaded documents.\"\n\nAnswer clearly and concisely.";

/// A finite sequence of response fragments, errors already folded into text.
pub type ResponseStream = Pin<Box<dyn Stream<Item = String> + Send>>;

/// Orchestrates retrieval-augmented generation over one vector index.
#[derive(Clone)]
pub struct ChatEngine {
    model: Arc<dyn ChatModel>,
    assembler: ContextAssembler,
    config: RagConfig,
}

impl ChatEngine {
    /// Create an engine over the given model and index.
    pub fn new(model: Arc<dyn ChatModel>, index: Arc<VectorIndex>, config: RagConfig) -> Self {
        Self { model, assembler: ContextAssembler::new(index), config }
    }

    /// Stream a response to `query`, grounding it in retrieved context.
    ///
    /// The produced sequence is lazy, finite, and non-restartable. When
    /// retrieval finds nothing, it is exactly one fragment (the fixed
    /// [`NO_INFORMATION_REPLY`]) and the model is never invoked. Any
    /// failure, including mid-stream, ends the sequence with one formatted
    /// error fragment.
    pub fn stream_response(&self, query: &str, history: &[ChatTurn]) -> ResponseStream {
        let engine = self.clone();
        let query = query.to_string();
        let history = history.to_vec();

        Box::pin(stream! {
            let assembled = match engine.assembler.assemble(&query, engine.config.top_k).await {
                Ok(assembled) => assembled,
                Err(e) => {
                    error!(error = %e, "retrieval failed");
                    yield format!("Error generating response: {e}");
                    return;
                }
            };

            if !assembled.is_relevant {
                info!("no relevant context, short-circuiting generation");
                yield NO_INFORMATION_REPLY.to_string();
                return;
            }

            let request = engine.build_request(&query, &history, &assembled.context);
            let mut fragments = match engine.model.stream(request).await {
                Ok(fragments) => fragments,
                Err(e) => {
                    error!(model = engine.model.name(), error = %e, "generation failed to start");
                    yield format!("Error generating response: {e}");
                    return;
                }
            };

            while let Some(item) = fragments.next().await {
                match item {
                    Ok(fragment) => yield fragment,
                    Err(e) => {
                        error!(model = engine.model.name(), error = %e, "generation failed mid-stream");
                        yield format!("Error generating response: {e}");
                        return;
                    }
                }
            }
        })
    }

    /// Non-streaming variant: same assembly, one complete string.
    pub async fn respond(&self, query: &str, history: &[ChatTurn]) -> String {
        let assembled = match self.assembler.assemble(query, self.config.top_k).await {
            Ok(assembled) => assembled,
            Err(e) => {
                error!(error = %e, "retrieval failed");
                return format!("Error generating response: {e}");
            }
        };

        if !assembled.is_relevant {
            return NO_INFORMATION_REPLY.to_string();
        }

        let request = self.build_request(query, history, &assembled.context);
        match self.model.complete(request).await {
            Ok(response) => response,
            Err(e) => {
                error!(model = self.model.name(), error = %e, "generation failed");
                format!("Error generating response: {e}")
            }
        }
    }

    /// Build the full prompt: system instruction, up to the last
    /// `history_turns` of supplied history in original order, then a final
    /// user turn holding the context and the literal query.
    fn build_request(&self, query: &str, history: &[ChatTurn], context: &str) -> GenerationRequest {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatTurn::system(SYSTEM_INSTRUCTION));

        let tail_start = history.len().saturating_sub(self.config.history_turns);
        messages.extend_from_slice(&history[tail_start..]);

        messages.push(ChatTurn::user(format!(
            "Context from the documents:\n{context}\n\nQuestion: {query}"
        )));

        GenerationRequest {
            messages,
            temperature: self.config.temperature,
            max_output_tokens: self.config.max_output_tokens,
        }
    }
}
