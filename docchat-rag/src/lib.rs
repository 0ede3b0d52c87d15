//! # docchat-rag
//!
//! Retrieval-augmented generation over PDF-extracted text.
//!
//! ## Overview
//!
//! This crate implements the document side of the chat service:
//!
//! - [`SentenceChunker`] - sentence-aware overlapping text chunking
//! - [`EmbeddingProvider`] - pluggable text embedding (OpenAI included)
//! - [`VectorIndex`] - persistent brute-force nearest-neighbour index
//! - [`ContextAssembler`] - retrieval and prompt-context assembly
//! - [`ChatModel`] - pluggable streaming chat generation (OpenAI included)
//! - [`ChatEngine`] - the full retrieve-then-generate pipeline
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use docchat_rag::{
//!     ChatEngine, OpenAiChatModel, OpenAiEmbeddingProvider, RagConfig,
//!     SentenceChunker, VectorIndex,
//! };
//!
//! # async fn run() -> docchat_rag::Result<()> {
//! let config = RagConfig::default();
//! let embedder = Arc::new(OpenAiEmbeddingProvider::from_env()?);
//! let index = Arc::new(VectorIndex::open("data/index.json", embedder));
//!
//! let chunker = SentenceChunker::new(config.chunk_size, config.chunk_overlap);
//! let chunks = chunker.chunk("document text...")?;
//! index.add(&chunks).await?;
//!
//! let model = Arc::new(OpenAiChatModel::from_env()?);
//! let engine = ChatEngine::new(model, index, config);
//! let reply = engine.respond("What does the document say?", &[]).await;
//! # Ok(())
//! # }
//! ```

pub mod chat;
pub mod chunker;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod index;
pub mod model;
pub mod openai;
pub mod openai_chat;
pub mod retrieval;

pub use chat::{ChatEngine, ResponseStream, NO_INFORMATION_REPLY};
pub use chunker::{SentenceChunker, SOURCE_PDF_UPLOAD};
pub use config::{RagConfig, RagConfigBuilder};
pub use document::{Chunk, ChunkMetadata, SimilarityResult};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use index::{IndexStats, VectorIndex};
pub use model::{ChatModel, ChatTurn, GenerationRequest, Role, TextStream};
pub use openai::OpenAiEmbeddingProvider;
pub use openai_chat::OpenAiChatModel;
pub use retrieval::{AssembledContext, ContextAssembler, NO_CONTEXT_MARKER};
