//! WebSocket-backed chat transport.

use axum::extract::ws::{CloseFrame, Message, WebSocket, close_code};

use credo_core::error::{CredoError, Result};
use credo_core::session::{ChatTransport, CloseReason};

/// Adapts an axum WebSocket to the session's transport port.
pub struct WsTransport {
    socket: WebSocket,
}

impl WsTransport {
    pub fn new(socket: WebSocket) -> Self {
        Self { socket }
    }
}

#[async_trait::async_trait]
impl ChatTransport for WsTransport {
    async fn receive(&mut self) -> Result<Option<String>> {
        loop {
            match self.socket.recv().await {
                None => return Ok(None),
                Some(Ok(Message::Text(text))) => return Ok(Some(text)),
                Some(Ok(Message::Close(_))) => return Ok(None),
                // Control frames are handled by the protocol layer.
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
                Some(Ok(Message::Binary(_))) => {
                    return Err(CredoError::transport("binary frames are not supported"));
                }
                Some(Err(err)) => {
                    return Err(CredoError::transport(format!("receive failed: {err}")));
                }
            }
        }
    }

    async fn send_chunk(&mut self, chunk: &str) -> Result<()> {
        self.socket
            .send(Message::Text(chunk.to_string()))
            .await
            .map_err(|err| CredoError::transport(format!("send failed: {err}")))
    }

    async fn close(&mut self, reason: CloseReason) -> Result<()> {
        let (code, reason_text) = match reason {
            CloseReason::PolicyViolation => (close_code::POLICY, "Invalid token"),
            CloseReason::InternalError => (close_code::ERROR, "Internal error"),
        };
        self.socket
            .send(Message::Close(Some(CloseFrame {
                code,
                reason: reason_text.into(),
            })))
            .await
            .map_err(|err| CredoError::transport(format!("close failed: {err}")))
    }
}
