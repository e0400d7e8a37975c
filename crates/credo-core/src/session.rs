//! Chat session state machine.
//!
//! One session per client connection. The session owns the conversation
//! history, mediates between the transport and the gateway's streaming
//! call, and processes exactly one generation at a time: no chunk of turn
//! N+1 is sent before turn N's stream is exhausted.

use std::sync::Arc;

use futures::StreamExt;
use tracing::{error, info, warn};

use crate::conversation::{ConversationHistory, Turn};
use crate::error::{CredoError, Result};
use crate::gateway::ModelGateway;

/// Close signal delivered to the peer when a session ends abnormally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Authentication was rejected before the session opened.
    PolicyViolation,
    /// A fault occurred while serving the session.
    InternalError,
}

/// Authenticated identity attached to a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// Stable subject identifier (the underwriter's email).
    pub subject: String,
}

/// Exchanges an opaque token for an authenticated principal.
#[async_trait::async_trait]
pub trait TokenVerifier: Send + Sync {
    /// `None` means the token is invalid or expired.
    async fn verify(&self, token: &str) -> Option<Principal>;
}

/// The session's view of the bidirectional connection.
#[async_trait::async_trait]
pub trait ChatTransport: Send {
    /// Next inbound text payload; `None` once the peer disconnected.
    async fn receive(&mut self) -> Result<Option<String>>;

    /// Delivers one response fragment to the peer.
    async fn send_chunk(&mut self, chunk: &str) -> Result<()>;

    /// Closes the connection with an explicit reason.
    async fn close(&mut self, reason: CloseReason) -> Result<()>;
}

/// Lifecycle of a chat session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Ready for the next user message.
    Open,
    /// A generation stream is being forwarded.
    StreamingTurn,
    /// The connection is gone; the history is discarded with the session.
    Closed,
}

/// Per-connection conversation state.
///
/// History lives only as long as the session; nothing is persisted across
/// process restarts, and faults local to one session never affect others.
pub struct ChatSession {
    principal: Principal,
    history: ConversationHistory,
    gateway: Arc<dyn ModelGateway>,
    state: SessionState,
}

impl ChatSession {
    /// Verifies the token and opens a session.
    ///
    /// On a rejected token the transport is closed with a policy-violation
    /// signal and the session never reaches `Open`; no message is echoed.
    pub async fn open<T: ChatTransport>(
        verifier: &dyn TokenVerifier,
        token: &str,
        transport: &mut T,
        gateway: Arc<dyn ModelGateway>,
    ) -> Result<Self> {
        let Some(principal) = verifier.verify(token).await else {
            warn!("rejected chat connection: invalid token");
            let _ = transport.close(CloseReason::PolicyViolation).await;
            return Err(CredoError::auth("invalid session token"));
        };

        info!(subject = %principal.subject, "chat session authenticated");
        Ok(Self {
            principal,
            history: ConversationHistory::new(),
            gateway,
            state: SessionState::Open,
        })
    }

    /// The authenticated identity this session serves.
    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    /// The turns finalized so far.
    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Runs the per-connection loop until the peer disconnects or a fault
    /// closes the session.
    ///
    /// Each inbound message appends a USER turn, streams the model's answer
    /// chunk by chunk to the transport, and appends one MODEL turn equal to
    /// the concatenation of the chunks. A fault mid-stream closes the
    /// transport with an internal-error signal; chunks already flushed are
    /// not retracted, and no partial MODEL turn is recorded.
    pub async fn run<T: ChatTransport>(&mut self, transport: &mut T) -> Result<()> {
        loop {
            let message = match transport.receive().await {
                Ok(Some(message)) => message,
                Ok(None) => {
                    info!(subject = %self.principal.subject, "chat peer disconnected");
                    self.state = SessionState::Closed;
                    return Ok(());
                }
                Err(err) => {
                    warn!(error = %err, "chat transport fault");
                    self.state = SessionState::Closed;
                    return Err(err);
                }
            };

            self.history.push(Turn::user(message));

            if let Err(err) = self.stream_model_turn(transport).await {
                error!(error = %err, "chat stream failed");
                let _ = transport.close(CloseReason::InternalError).await;
                self.state = SessionState::Closed;
                return Err(err);
            }
        }
    }

    async fn stream_model_turn<T: ChatTransport>(&mut self, transport: &mut T) -> Result<()> {
        self.state = SessionState::StreamingTurn;

        let mut stream = self.gateway.complete_streaming(self.history.turns()).await?;
        let mut buffered = String::new();
        while let Some(chunk) = stream.next().await {
            // An Err item or a failed send abandons the turn: the stream is
            // dropped, which cancels the outstanding backend read, and the
            // partial buffer never becomes a MODEL turn.
            let chunk = chunk?;
            transport.send_chunk(&chunk).await?;
            buffered.push_str(&chunk);
        }

        self.history.push(Turn::model(buffered));
        self.state = SessionState::Open;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::TurnRole;
    use crate::schema::SchemaNode;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct MockGateway {
        // One chunk script per streaming call, consumed in order.
        scripts: Mutex<VecDeque<Vec<Result<String>>>>,
        seen_turn_counts: Mutex<Vec<usize>>,
    }

    impl MockGateway {
        fn streaming(scripts: Vec<Vec<Result<String>>>) -> Arc<Self> {
            Arc::new(Self {
                scripts: Mutex::new(scripts.into()),
                seen_turn_counts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait::async_trait]
    impl ModelGateway for MockGateway {
        async fn complete_once(&self, _context: &str, _turns: &[Turn]) -> Result<String> {
            unimplemented!("not used by session tests")
        }

        async fn complete_structured(
            &self,
            _context: &str,
            _instruction: &str,
            _schema: &SchemaNode,
        ) -> Result<serde_json::Value> {
            unimplemented!("not used by session tests")
        }

        async fn complete_streaming(&self, turns: &[Turn]) -> Result<crate::gateway::ChunkStream> {
            self.seen_turn_counts.lock().unwrap().push(turns.len());
            let script = self
                .scripts
                .lock()
                .unwrap()
                .pop_front()
                .expect("no chunk script queued");
            Ok(Box::pin(futures::stream::iter(script)))
        }
    }

    #[derive(Default)]
    struct MockTransport {
        inbound: VecDeque<String>,
        sent: Vec<String>,
        closes: Vec<CloseReason>,
    }

    impl MockTransport {
        fn with_inbound(messages: &[&str]) -> Self {
            Self {
                inbound: messages.iter().map(|m| m.to_string()).collect(),
                ..Self::default()
            }
        }
    }

    #[async_trait::async_trait]
    impl ChatTransport for MockTransport {
        async fn receive(&mut self) -> Result<Option<String>> {
            Ok(self.inbound.pop_front())
        }

        async fn send_chunk(&mut self, chunk: &str) -> Result<()> {
            self.sent.push(chunk.to_string());
            Ok(())
        }

        async fn close(&mut self, reason: CloseReason) -> Result<()> {
            self.closes.push(reason);
            Ok(())
        }
    }

    struct StaticVerifier(Option<Principal>);

    #[async_trait::async_trait]
    impl TokenVerifier for StaticVerifier {
        async fn verify(&self, _token: &str) -> Option<Principal> {
            self.0.clone()
        }
    }

    fn verified() -> StaticVerifier {
        StaticVerifier(Some(Principal {
            subject: "analyst@example.com".to_string(),
        }))
    }

    #[tokio::test]
    async fn test_chunks_forwarded_in_order_then_one_model_turn() {
        let gateway = MockGateway::streaming(vec![vec![
            Ok("The ".to_string()),
            Ok("DSCR is ".to_string()),
            Ok("1.54x.".to_string()),
        ]]);
        let mut transport = MockTransport::with_inbound(&["What is the DSCR?"]);

        let mut session = ChatSession::open(&verified(), "token", &mut transport, gateway)
            .await
            .unwrap();
        session.run(&mut transport).await.unwrap();

        assert_eq!(transport.sent, vec!["The ", "DSCR is ", "1.54x."]);
        let turns = session.history().turns();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, TurnRole::User);
        assert_eq!(turns[0].text, "What is the DSCR?");
        assert_eq!(turns[1].role, TurnRole::Model);
        assert_eq!(turns[1].text, "The DSCR is 1.54x.");
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[tokio::test]
    async fn test_second_turn_streams_with_full_history() {
        let gateway = MockGateway::streaming(vec![
            vec![Ok("first".to_string())],
            vec![Ok("second".to_string())],
        ]);
        let mut transport = MockTransport::with_inbound(&["one", "two"]);

        let mut session =
            ChatSession::open(&verified(), "token", &mut transport, gateway.clone())
                .await
                .unwrap();
        session.run(&mut transport).await.unwrap();

        // First call sees 1 turn, second call sees 3 (user, model, user).
        assert_eq!(*gateway.seen_turn_counts.lock().unwrap(), vec![1, 3]);
        assert_eq!(session.history().len(), 4);
    }

    #[tokio::test]
    async fn test_invalid_token_closes_with_policy_violation() {
        let gateway = MockGateway::streaming(Vec::new());
        let mut transport = MockTransport::with_inbound(&["never echoed"]);

        let result =
            ChatSession::open(&StaticVerifier(None), "bad", &mut transport, gateway).await;

        assert!(result.is_err());
        assert_eq!(transport.closes, vec![CloseReason::PolicyViolation]);
        assert!(transport.sent.is_empty());
    }

    #[tokio::test]
    async fn test_disconnect_closes_session_cleanly() {
        let gateway = MockGateway::streaming(Vec::new());
        let mut transport = MockTransport::with_inbound(&[]);

        let mut session = ChatSession::open(&verified(), "token", &mut transport, gateway)
            .await
            .unwrap();
        let result = session.run(&mut transport).await;

        assert!(result.is_ok());
        assert_eq!(session.state(), SessionState::Closed);
        assert!(session.history().is_empty());
    }

    #[tokio::test]
    async fn test_broken_stream_closes_with_internal_error_and_no_partial_turn() {
        let gateway = MockGateway::streaming(vec![vec![
            Ok("partial ".to_string()),
            Err(CredoError::gateway("stream broke")),
        ]]);
        let mut transport = MockTransport::with_inbound(&["question"]);

        let mut session = ChatSession::open(&verified(), "token", &mut transport, gateway)
            .await
            .unwrap();
        let result = session.run(&mut transport).await;

        assert!(result.is_err());
        // The flushed chunk is not retracted...
        assert_eq!(transport.sent, vec!["partial "]);
        // ...but no MODEL turn was recorded for the broken stream.
        assert_eq!(session.history().len(), 1);
        assert_eq!(session.history().turns()[0].role, TurnRole::User);
        assert_eq!(transport.closes, vec![CloseReason::InternalError]);
        assert_eq!(session.state(), SessionState::Closed);
    }
}
