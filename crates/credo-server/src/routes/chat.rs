//! Streaming chat endpoint.
//!
//! Each connection becomes an independent session task: authenticate, then
//! loop turns until the peer disconnects. Faults in one session never reach
//! another.

use axum::extract::ws::WebSocket;
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::Response;
use serde::Deserialize;
use tracing::info;

use credo_core::session::ChatSession;

use crate::state::AppState;
use crate::transport::WsTransport;

#[derive(Debug, Deserialize)]
pub struct ChatQuery {
    token: String,
}

pub async fn connect(
    ws: WebSocketUpgrade,
    Query(query): Query<ChatQuery>,
    State(state): State<AppState>,
) -> Response {
    ws.on_upgrade(move |socket| serve_session(socket, state, query.token))
}

async fn serve_session(socket: WebSocket, state: AppState, token: String) {
    let mut transport = WsTransport::new(socket);

    let Ok(mut session) = ChatSession::open(
        state.auth.as_ref(),
        &token,
        &mut transport,
        state.gateway.clone(),
    )
    .await
    else {
        // The session already closed the transport with a policy-violation
        // signal; nothing else to do.
        return;
    };

    // Errors are surfaced to the peer by the session itself; the task just
    // ends and takes the history with it.
    let _ = session.run(&mut transport).await;
    info!(subject = %session.principal().subject, "chat session ended");
}
