//! Integration tests for the generation orchestrator: relevance gating,
//! prompt shape, streaming forwarding, and error folding.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use docchat_rag::{
    ChatEngine, ChatModel, ChatTurn, Chunk, ChunkMetadata, EmbeddingProvider,
    GenerationRequest, RagConfig, RagError, Role, TextStream, VectorIndex,
    NO_INFORMATION_REPLY,
};
use futures::StreamExt;
use uuid::Uuid;

/// Embedder that maps every text to the same vector, so any indexed chunk
/// is retrievable by any query.
struct FlatEmbedder;

#[async_trait]
impl EmbeddingProvider for FlatEmbedder {
    async fn embed(&self, _text: &str) -> docchat_rag::Result<Vec<f32>> {
        Ok(vec![1.0, 0.0])
    }

    fn dimensions(&self) -> usize {
        2
    }
}

/// A chat model that replays scripted fragments and records what it was
/// asked for.
struct ScriptedModel {
    fragments: Vec<Result<String, String>>,
    fail_on_start: bool,
    calls: AtomicUsize,
    last_request: Mutex<Option<GenerationRequest>>,
}

impl ScriptedModel {
    fn new(fragments: &[&str]) -> Self {
        Self {
            fragments: fragments.iter().map(|f| Ok(f.to_string())).collect(),
            fail_on_start: false,
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    fn erroring_after(fragments: &[&str], message: &str) -> Self {
        let mut scripted: Vec<Result<String, String>> =
            fragments.iter().map(|f| Ok(f.to_string())).collect();
        scripted.push(Err(message.to_string()));
        Self {
            fragments: scripted,
            fail_on_start: false,
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    fn failing_on_start() -> Self {
        Self {
            fragments: Vec::new(),
            fail_on_start: true,
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn captured_request(&self) -> GenerationRequest {
        self.last_request.lock().unwrap().clone().unwrap()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn stream(&self, request: GenerationRequest) -> docchat_rag::Result<TextStream> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request);

        if self.fail_on_start {
            return Err(RagError::Generation {
                provider: "scripted".to_string(),
                message: "connection refused".to_string(),
            });
        }

        let items: Vec<docchat_rag::Result<String>> = self
            .fragments
            .iter()
            .map(|item| match item {
                Ok(f) => Ok(f.clone()),
                Err(m) => Err(RagError::Generation {
                    provider: "scripted".to_string(),
                    message: m.clone(),
                }),
            })
            .collect();
        Ok(Box::pin(futures::stream::iter(items)))
    }
}

fn chunk(content: &str) -> Chunk {
    Chunk {
        content: content.to_string(),
        metadata: ChunkMetadata {
            chunk_id: Uuid::new_v4(),
            chunk_index: 0,
            source: "pdf_upload".to_string(),
        },
    }
}

/// Engine over an empty index (nothing ever added).
fn engine_without_documents(model: Arc<ScriptedModel>) -> ChatEngine {
    let dir = tempfile::tempdir().unwrap();
    let index = Arc::new(VectorIndex::open(dir.path().join("index.json"), Arc::new(FlatEmbedder)));
    ChatEngine::new(model, index, RagConfig::default())
}

/// Engine over an index holding the given chunk contents. Keeps the temp
/// dir alive for the test's duration.
async fn engine_with_documents(
    model: Arc<ScriptedModel>,
    contents: &[&str],
) -> (ChatEngine, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let index = Arc::new(VectorIndex::open(dir.path().join("index.json"), Arc::new(FlatEmbedder)));
    let chunks: Vec<Chunk> = contents.iter().map(|c| chunk(c)).collect();
    index.add(&chunks).await.unwrap();
    (ChatEngine::new(model, index, RagConfig::default()), dir)
}

async fn collect(stream: docchat_rag::ResponseStream) -> Vec<String> {
    stream.collect().await
}

#[tokio::test]
async fn empty_index_yields_fixed_refusal_without_invoking_model() {
    let model = Arc::new(ScriptedModel::new(&["should never appear"]));
    let engine = engine_without_documents(model.clone());

    let fragments = collect(engine.stream_response("what is this about?", &[])).await;
    assert_eq!(fragments, [NO_INFORMATION_REPLY]);
    assert_eq!(model.call_count(), 0, "model must not be invoked without context");
}

#[tokio::test]
async fn fragments_are_forwarded_in_order() {
    let model = Arc::new(ScriptedModel::new(&["Hello", ", ", "world"]));
    let (engine, _dir) = engine_with_documents(model, &["greeting conventions"]).await;

    let fragments = collect(engine.stream_response("how do we greet?", &[])).await;
    assert_eq!(fragments, ["Hello", ", ", "world"]);
}

#[tokio::test]
async fn prompt_holds_system_context_and_query() {
    let model = Arc::new(ScriptedModel::new(&["ok"]));
    let (engine, _dir) =
        engine_with_documents(model.clone(), &["first passage", "second passage"]).await;

    collect(engine.stream_response("the question", &[])).await;

    let request = model.captured_request();
    assert_eq!(request.temperature, 0.7);
    assert_eq!(request.max_output_tokens, 1000);

    let first = &request.messages[0];
    assert_eq!(first.role, Role::System);
    assert!(first.content.contains(NO_INFORMATION_REPLY));

    let last = request.messages.last().unwrap();
    assert_eq!(last.role, Role::User);
    assert!(last.content.contains("Context from the documents:"));
    assert!(last.content.contains("Document 1:\nfirst passage"));
    assert!(last.content.contains("Document 2:\nsecond passage"));
    assert!(last.content.ends_with("Question: the question"));
}

#[tokio::test]
async fn history_is_truncated_to_most_recent_turns() {
    let model = Arc::new(ScriptedModel::new(&["ok"]));
    let (engine, _dir) = engine_with_documents(model.clone(), &["some passage"]).await;

    let history: Vec<ChatTurn> = (0..8)
        .map(|i| {
            if i % 2 == 0 {
                ChatTurn::user(format!("user turn {i}"))
            } else {
                ChatTurn::assistant(format!("assistant turn {i}"))
            }
        })
        .collect();

    collect(engine.stream_response("latest question", &history)).await;

    let request = model.captured_request();
    // system + 5 most recent history turns + final user turn
    assert_eq!(request.messages.len(), 7);
    assert_eq!(request.messages[1].content, "assistant turn 3");
    assert_eq!(request.messages[5].content, "assistant turn 7");
}

#[tokio::test]
async fn mid_stream_failure_ends_with_one_error_fragment() {
    let model = Arc::new(ScriptedModel::erroring_after(&["partial answer"], "rate limited"));
    let (engine, _dir) = engine_with_documents(model, &["some passage"]).await;

    let fragments = collect(engine.stream_response("question", &[])).await;
    assert_eq!(fragments.len(), 2);
    assert_eq!(fragments[0], "partial answer");
    assert!(fragments[1].starts_with("Error generating response:"));
    assert!(fragments[1].contains("rate limited"));
}

#[tokio::test]
async fn startup_failure_yields_single_error_fragment() {
    let model = Arc::new(ScriptedModel::failing_on_start());
    let (engine, _dir) = engine_with_documents(model, &["some passage"]).await;

    let fragments = collect(engine.stream_response("question", &[])).await;
    assert_eq!(fragments.len(), 1);
    assert!(fragments[0].starts_with("Error generating response:"));
}

#[tokio::test]
async fn respond_concatenates_the_stream() {
    let model = Arc::new(ScriptedModel::new(&["one ", "two ", "three"]));
    let (engine, _dir) = engine_with_documents(model, &["some passage"]).await;

    let reply = engine.respond("question", &[]).await;
    assert_eq!(reply, "one two three");
}

#[tokio::test]
async fn respond_refuses_without_context() {
    let model = Arc::new(ScriptedModel::new(&["unused"]));
    let engine = engine_without_documents(model.clone());

    let reply = engine.respond("question", &[]).await;
    assert_eq!(reply, NO_INFORMATION_REPLY);
    assert_eq!(model.call_count(), 0);
}
