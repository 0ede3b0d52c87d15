//! Wire types for the chat WebSocket.
//!
//! The client sends one JSON object per query; the server replies with a
//! sequence of typed messages discriminated by a `type` field:
//! `processing`, zero or more `chunk`, then exactly one `complete`, or an
//! `error` in place of the sequence when the query never starts.

use docchat_rag::ChatTurn;
use serde::{Deserialize, Serialize};

/// Acknowledgement text sent before generation starts.
pub const PROCESSING_NOTICE: &str = "Processing...";
/// Text attached to the terminal `complete` message.
pub const COMPLETE_NOTICE: &str = "Response complete";
/// Error text for a blank or whitespace-only query.
pub const EMPTY_QUERY_ERROR: &str = "Empty query";
/// Error text for a frame that does not parse as a query.
pub const MALFORMED_QUERY_ERROR: &str = "Malformed query message";

/// One inbound chat request.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct QueryRequest {
    pub query: String,
    /// Prior turns supplied by the client; the server keeps no history.
    #[serde(default)]
    pub history: Vec<ChatTurn>,
}

impl QueryRequest {
    /// Parse and validate one inbound text frame.
    ///
    /// Rejects frames that are not a JSON query object and queries that
    /// are blank after trimming. The returned error text is sent back to
    /// the client verbatim; the connection stays open either way.
    pub fn parse(raw: &str) -> Result<Self, &'static str> {
        let request: Self = serde_json::from_str(raw).map_err(|_| MALFORMED_QUERY_ERROR)?;
        if request.query.trim().is_empty() {
            return Err(EMPTY_QUERY_ERROR);
        }
        Ok(request)
    }
}

/// One outbound message on the chat socket.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// The query was accepted and generation is starting.
    Processing { message: String },
    /// One incremental fragment plus the cumulative text so far.
    Chunk { content: String, full_response: String },
    /// Generation finished; `full_response` is the complete reply.
    Complete { message: String, full_response: String },
    /// The query was rejected or failed before generation began.
    Error { message: String },
}

impl ServerMessage {
    pub fn processing() -> Self {
        Self::Processing { message: PROCESSING_NOTICE.to_string() }
    }

    pub fn chunk(content: impl Into<String>, full_response: impl Into<String>) -> Self {
        Self::Chunk { content: content.into(), full_response: full_response.into() }
    }

    pub fn complete(full_response: impl Into<String>) -> Self {
        Self::Complete {
            message: COMPLETE_NOTICE.to_string(),
            full_response: full_response.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error { message: message.into() }
    }
}
