//! docchat-server: HTTP/WebSocket transport for retrieval-augmented chat
//! over uploaded PDF documents.
//!
//! REST routes handle ingestion (`POST /upload-pdf`), index inspection
//! (`GET /documents`, `GET /health`), and teardown (`DELETE /documents`);
//! `GET /ws/chat` upgrades to the streaming chat protocol defined in
//! [`protocol`].

pub mod config;
pub mod error;
pub mod extract;
pub mod protocol;
pub mod routes;
pub mod session;
pub mod ws;

pub use config::ServerConfig;
pub use error::ApiError;
pub use protocol::{QueryRequest, ServerMessage};
pub use routes::{app_router, run_server, AppState};
pub use session::{SessionId, SessionManager};
