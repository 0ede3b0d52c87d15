//! Chat model trait for streaming text generation.

use std::pin::Pin;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Who authored a chat turn.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions that constrain the model.
    System,
    /// A message from the human user.
    User,
    /// A previous model reply.
    Assistant,
}

/// One turn of a conversation. Ephemeral: supplied per request, never
/// persisted server-side.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatTurn {
    /// The author of the turn.
    pub role: Role,
    /// The text of the turn.
    pub content: String,
}

impl ChatTurn {
    /// Construct a system turn.
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    /// Construct a user turn.
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    /// Construct an assistant turn.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// A fully assembled generation request.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Prompt messages in order: system instruction, history, final user turn.
    pub messages: Vec<ChatTurn>,
    /// Sampling temperature.
    pub temperature: f32,
    /// Upper bound on generated tokens.
    pub max_output_tokens: u32,
}

/// A lazy, finite, non-restartable sequence of generated text fragments.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// A generative language model invoked in streaming mode.
///
/// Implementations wrap specific chat backends behind a unified async
/// interface. Fragments arrive in generation order with no buffering beyond
/// one fragment; failures mid-stream surface as an `Err` item and end the
/// stream.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// The model identifier, for logging and error messages.
    fn name(&self) -> &str;

    /// Start a streaming completion for the request.
    async fn stream(&self, request: GenerationRequest) -> Result<TextStream>;

    /// Wait for the full completion and return it as one string.
    ///
    /// The default implementation drains [`stream`](ChatModel::stream).
    async fn complete(&self, request: GenerationRequest) -> Result<String> {
        let mut stream = self.stream(request).await?;
        let mut full = String::new();
        while let Some(fragment) = stream.next().await {
            full.push_str(&fragment?);
        }
        Ok(full)
    }
}
