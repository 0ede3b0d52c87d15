//! The chat WebSocket: session lifecycle and the per-query message loop.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use docchat_rag::{ChatEngine, ChatTurn};
use futures::{SinkExt, StreamExt};
use tracing::{debug, info, warn};

use crate::protocol::{QueryRequest, ServerMessage};
use crate::routes::AppState;
use crate::session::{SessionId, SessionManager};

/// `GET /ws/chat` upgrade handler.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Drive one connection: register a session, forward its outbound channel
/// to the socket, and process inbound queries one at a time.
///
/// Queries are strictly serialized per session; a frame arriving while a
/// response streams waits in the socket buffer until the current query
/// finishes. The session is unregistered on every exit path.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (session_id, mut rx) = state.sessions.register().await;
    info!(%session_id, "chat session opened");

    let (mut sink, mut inbound) = socket.split();
    let mut forward = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let Ok(text) = serde_json::to_string(&message) else {
                break;
            };
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    loop {
        tokio::select! {
            frame = inbound.next() => {
                let Some(Ok(frame)) = frame else {
                    debug!(%session_id, "socket closed");
                    break;
                };
                match frame {
                    Message::Text(text) => {
                        let request = match QueryRequest::parse(text.as_str()) {
                            Ok(request) => request,
                            Err(reason) => {
                                warn!(%session_id, reason, "rejected query frame");
                                if !state.sessions.send(&session_id, ServerMessage::error(reason)).await {
                                    break;
                                }
                                continue;
                            }
                        };
                        let delivered = run_query(
                            &state.engine,
                            &state.sessions,
                            &session_id,
                            &request.query,
                            &request.history,
                        )
                        .await;
                        if !delivered {
                            debug!(%session_id, "client gone mid-response");
                            break;
                        }
                    }
                    Message::Close(_) => break,
                    // Pings are answered by axum; ignore everything else.
                    _ => {}
                }
            }
            // The forward task only exits when the socket is unwritable.
            _ = &mut forward => break,
        }
    }

    forward.abort();
    state.sessions.remove(&session_id).await;
    info!(%session_id, "chat session closed");
}

/// Run one query and deliver its full message sequence to the session:
/// `processing`, one `chunk` per fragment with the cumulative text, then
/// `complete`.
///
/// Returns `false` as soon as delivery fails, dropping the response stream
/// so any in-flight provider call is abandoned.
pub async fn run_query(
    engine: &ChatEngine,
    sessions: &SessionManager,
    session_id: &SessionId,
    query: &str,
    history: &[ChatTurn],
) -> bool {
    if !sessions.send(session_id, ServerMessage::processing()).await {
        return false;
    }

    let mut full_response = String::new();
    let mut fragments = engine.stream_response(query, history);
    while let Some(fragment) = fragments.next().await {
        full_response.push_str(&fragment);
        let chunk = ServerMessage::chunk(fragment, full_response.clone());
        if !sessions.send(session_id, chunk).await {
            return false;
        }
    }

    sessions.send(session_id, ServerMessage::complete(full_response)).await
}
