//! OpenAI chat completion client with streaming.

use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_stream::try_stream;
use async_trait::async_trait;
use futures::StreamExt;
use tracing::debug;

use crate::error::{RagError, Result};
use crate::model::{ChatModel, ChatTurn, GenerationRequest, Role, TextStream};

/// The default chat completion model.
const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// A [`ChatModel`] backed by the OpenAI chat completions API.
///
/// # Example
///
/// ```rust,ignore
/// use docchat_rag::openai_chat::OpenAiChatModel;
///
/// let model = OpenAiChatModel::new("sk-...")?;
/// let mut stream = model.stream(request).await?;
/// ```
pub struct OpenAiChatModel {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiChatModel {
    /// Create a new client with the given API key and the default model.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(RagError::Generation {
                provider: "OpenAI".into(),
                message: "API key must not be empty".into(),
            });
        }

        let config = OpenAIConfig::new().with_api_key(api_key);
        Ok(Self { client: Client::with_config(config), model: DEFAULT_MODEL.into() })
    }

    /// Create a new client using the `OPENAI_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| RagError::Generation {
            provider: "OpenAI".into(),
            message: "OPENAI_API_KEY environment variable not set".into(),
        })?;
        Self::new(api_key)
    }

    /// Set the model name (e.g. `gpt-4o`).
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

/// Convert a [`ChatTurn`] into the OpenAI request message shape.
fn turn_to_message(turn: &ChatTurn) -> Result<ChatCompletionRequestMessage> {
    let message = match turn.role {
        Role::System => ChatCompletionRequestSystemMessageArgs::default()
            .content(turn.content.as_str())
            .build()
            .map(ChatCompletionRequestMessage::System),
        Role::User => ChatCompletionRequestUserMessageArgs::default()
            .content(turn.content.as_str())
            .build()
            .map(ChatCompletionRequestMessage::User),
        Role::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
            .content(turn.content.as_str())
            .build()
            .map(ChatCompletionRequestMessage::Assistant),
    };
    message.map_err(|e| RagError::Generation {
        provider: "OpenAI".into(),
        message: format!("failed to build message: {e}"),
    })
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn stream(&self, request: GenerationRequest) -> Result<TextStream> {
        let model = self.model.clone();
        let client = self.client.clone();

        debug!(%model, message_count = request.messages.len(), "starting chat stream");

        let stream = try_stream! {
            let messages = request
                .messages
                .iter()
                .map(turn_to_message)
                .collect::<Result<Vec<_>>>()?;

            let openai_request = CreateChatCompletionRequestArgs::default()
                .model(&model)
                .messages(messages)
                .temperature(request.temperature)
                .max_tokens(request.max_output_tokens)
                .build()
                .map_err(|e| RagError::Generation {
                    provider: "OpenAI".into(),
                    message: format!("failed to build request: {e}"),
                })?;

            let mut stream = client
                .chat()
                .create_stream(openai_request)
                .await
                .map_err(|e| RagError::Generation {
                    provider: "OpenAI".into(),
                    message: format!("API error: {e}"),
                })?;

            while let Some(result) = stream.next().await {
                let chunk = result.map_err(|e| RagError::Generation {
                    provider: "OpenAI".into(),
                    message: format!("stream error: {e}"),
                })?;

                if let Some(fragment) =
                    chunk.choices.first().and_then(|c| c.delta.content.as_deref())
                {
                    if !fragment.is_empty() {
                        yield fragment.to_string();
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }
}
