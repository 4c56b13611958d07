//! Scripted transport for exercising the session machine without I/O

use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::oneshot;

use super::Transport;
use crate::error::TransportError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CreateSession,
    SendMessage { session_id: String, message: String },
}

type ReplyResult = Result<Value, TransportError>;

enum ScriptedReply {
    Ready(ReplyResult),
    /// Resolves only once the test sends a result through the gate
    Gated(oneshot::Receiver<ReplyResult>),
}

#[derive(Default)]
pub struct MockTransport {
    sessions: Mutex<VecDeque<Result<String, TransportError>>>,
    replies: Mutex<VecDeque<ScriptedReply>>,
    calls: Mutex<Vec<Call>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_session(&self, result: Result<String, TransportError>) {
        self.sessions.lock().unwrap().push_back(result);
    }

    pub fn queue_reply(&self, result: ReplyResult) {
        self.replies.lock().unwrap().push_back(ScriptedReply::Ready(result));
    }

    /// Queue a reply that stays in flight until the returned sender fires
    pub fn queue_gated_reply(&self) -> oneshot::Sender<ReplyResult> {
        let (tx, rx) = oneshot::channel();
        self.replies.lock().unwrap().push_back(ScriptedReply::Gated(rx));
        tx
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn create_session(&self) -> Result<String, TransportError> {
        self.calls.lock().unwrap().push(Call::CreateSession);
        self.sessions
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Other("no session queued".to_string())))
    }

    async fn send_message(&self, session_id: &str, message: &str) -> Result<Value, TransportError> {
        self.calls.lock().unwrap().push(Call::SendMessage {
            session_id: session_id.to_string(),
            message: message.to_string(),
        });
        let scripted = self.replies.lock().unwrap().pop_front();
        match scripted {
            Some(ScriptedReply::Ready(result)) => result,
            Some(ScriptedReply::Gated(gate)) => gate
                .await
                .unwrap_or_else(|_| Err(TransportError::Other("gate dropped".to_string()))),
            None => Err(TransportError::Other("no reply queued".to_string())),
        }
    }
}
