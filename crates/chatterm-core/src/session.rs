//! Session/conversation state machine
//!
//! Owns the session identifier, the message log, and the busy/error flags.
//! Commands are split into a synchronous `begin_*` half that validates and
//! updates local state, a self-contained request that performs the network
//! call, and a `finish_*` half that applies the outcome. Front ends that run
//! requests on background tasks use the halves directly; `start_session` and
//! `send_message` chain them for callers that can simply await.

use std::collections::VecDeque;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{ChatError, TransportError};
use crate::state::{ChatMessage, Notice, SessionPhase};
use crate::store::SessionStore;
use crate::transport::{extract_reply, HttpTransport, Transport};

pub struct ChatSession {
    transport: Option<Arc<dyn Transport>>,
    store: Box<dyn SessionStore>,

    session_id: Option<String>,
    phase: SessionPhase,
    messages: Vec<ChatMessage>,
    is_loading: bool,
    session_error: Option<ChatError>,
    last_send_error: Option<ChatError>,
    notices: VecDeque<Notice>,

    // Bumped on every reset; outcomes issued under an older epoch are dropped.
    epoch: u64,
    next_send_seq: u64,
    in_flight_send: Option<u64>,
}

/// Pending session-creation call
pub struct StartRequest {
    transport: Arc<dyn Transport>,
    epoch: u64,
}

impl StartRequest {
    pub async fn execute(self) -> StartOutcome {
        let result = self.transport.create_session().await;
        StartOutcome {
            epoch: self.epoch,
            result,
        }
    }
}

pub struct StartOutcome {
    epoch: u64,
    result: Result<String, TransportError>,
}

/// Pending message round-trip
pub struct SendRequest {
    transport: Arc<dyn Transport>,
    epoch: u64,
    seq: u64,
    session_id: String,
    text: String,
}

impl SendRequest {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub async fn execute(self) -> SendOutcome {
        let result = self
            .transport
            .send_message(&self.session_id, &self.text)
            .await;
        SendOutcome {
            epoch: self.epoch,
            seq: self.seq,
            session_id: self.session_id,
            result,
        }
    }
}

pub struct SendOutcome {
    epoch: u64,
    seq: u64,
    session_id: String,
    result: Result<Value, TransportError>,
}

impl ChatSession {
    /// Build the machine and rehydrate the persisted session, if any.
    ///
    /// `transport` is `None` when no endpoint is configured.
    pub fn new(transport: Option<Arc<dyn Transport>>, store: Box<dyn SessionStore>) -> Self {
        let session_id = match store.get() {
            Ok(id) => id,
            Err(e) => {
                warn!(error = %e, "Could not read persisted session, starting without one");
                None
            }
        };

        let phase = if session_id.is_some() {
            info!(session_id = ?session_id, "Rehydrated persisted session");
            SessionPhase::SessionActive
        } else {
            SessionPhase::NoSession
        };

        Self {
            transport,
            store,
            session_id,
            phase,
            messages: Vec::new(),
            is_loading: false,
            session_error: None,
            last_send_error: None,
            notices: VecDeque::new(),
            epoch: 0,
            next_send_seq: 0,
            in_flight_send: None,
        }
    }

    /// Build with an HTTP transport for `api_base`, or none when unset
    pub fn with_api_base(api_base: Option<&str>, store: Box<dyn SessionStore>) -> Self {
        let transport = api_base.map(|base| Arc::new(HttpTransport::new(base)) as Arc<dyn Transport>);
        Self::new(transport, store)
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn is_initializing(&self) -> bool {
        self.phase == SessionPhase::CreatingSession
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// Inline error from the last failed session start
    pub fn session_error(&self) -> Option<&ChatError> {
        self.session_error.as_ref()
    }

    pub fn last_send_error(&self) -> Option<&ChatError> {
        self.last_send_error.as_ref()
    }

    pub fn has_transport(&self) -> bool {
        self.transport.is_some()
    }

    pub fn can_start(&self) -> bool {
        matches!(self.phase, SessionPhase::NoSession | SessionPhase::SessionError)
    }

    pub fn can_send(&self) -> bool {
        self.phase == SessionPhase::SessionActive && self.in_flight_send.is_none()
    }

    /// Drain queued notifications, oldest first
    pub fn take_notices(&mut self) -> Vec<Notice> {
        self.notices.drain(..).collect()
    }

    pub async fn start_session(&mut self) {
        if let Some(request) = self.begin_start_session() {
            let outcome = request.execute().await;
            self.finish_start_session(outcome);
        }
    }

    pub fn begin_start_session(&mut self) -> Option<StartRequest> {
        if !self.can_start() {
            debug!(phase = ?self.phase, "Ignoring start: session active or already starting");
            return None;
        }

        let Some(transport) = self.transport.clone() else {
            warn!("Cannot start session: API base URL not configured");
            self.phase = SessionPhase::SessionError;
            self.session_error = Some(ChatError::Configuration);
            self.notify(Notice::error("Configuration Error", "API base URL is not configured."));
            return None;
        };

        self.phase = SessionPhase::CreatingSession;
        self.session_error = None;
        Some(StartRequest {
            transport,
            epoch: self.epoch,
        })
    }

    pub fn finish_start_session(&mut self, outcome: StartOutcome) {
        if outcome.epoch != self.epoch || self.phase != SessionPhase::CreatingSession {
            debug!("Dropping session-creation result issued before a reset");
            return;
        }

        match outcome.result {
            Ok(session_id) => {
                if let Err(e) = self.store.set(&session_id) {
                    warn!(error = %e, "Could not persist session identifier");
                }
                info!(session_id = %session_id, "Session started");
                self.session_id = Some(session_id);
                self.phase = SessionPhase::SessionActive;
                self.session_error = None;
                self.notify(Notice::info("Success", "Session started successfully!"));
            }
            Err(e) => {
                let description = describe_creation_failure(&e);
                warn!(error = %e, "Session start failed");
                self.session_id = None;
                self.phase = SessionPhase::SessionError;
                self.notify(Notice::error("Error", description.clone()));
                self.session_error = Some(ChatError::SessionCreation(description));
            }
        }
    }

    pub async fn send_message(&mut self, text: &str) {
        if let Some(request) = self.begin_send(text) {
            let outcome = request.execute().await;
            self.finish_send(outcome);
        }
    }

    /// Append the user message and hand back the request to run.
    ///
    /// Returns `None` without touching state for blank text, when no session
    /// is active, or while another message is in flight.
    pub fn begin_send(&mut self, text: &str) -> Option<SendRequest> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        if self.phase != SessionPhase::SessionActive {
            debug!(phase = ?self.phase, "Ignoring send: no active session");
            return None;
        }
        let session_id = self.session_id.clone()?;
        if self.in_flight_send.is_some() {
            debug!("Ignoring send: a message is already in flight");
            return None;
        }

        self.messages.push(ChatMessage::user(text));

        let Some(transport) = self.transport.clone() else {
            warn!("Cannot send message: API base URL not configured");
            self.last_send_error = Some(ChatError::Configuration);
            self.notify(Notice::error("Configuration Error", "API base URL is not configured."));
            return None;
        };

        let seq = self.next_send_seq;
        self.next_send_seq += 1;
        self.in_flight_send = Some(seq);
        self.is_loading = true;

        Some(SendRequest {
            transport,
            epoch: self.epoch,
            seq,
            session_id,
            text: text.to_string(),
        })
    }

    pub fn finish_send(&mut self, outcome: SendOutcome) {
        let current = outcome.epoch == self.epoch
            && self.session_id.as_deref() == Some(outcome.session_id.as_str())
            && self.in_flight_send == Some(outcome.seq);
        if !current {
            debug!(session_id = %outcome.session_id, "Dropping stale message reply");
            return;
        }

        self.in_flight_send = None;
        self.is_loading = false;

        match outcome.result {
            Ok(body) => {
                self.last_send_error = None;
                self.messages.push(ChatMessage::assistant(extract_reply(&body)));
            }
            Err(e) => {
                warn!(error = %e, "Message send failed");
                self.last_send_error = Some(ChatError::MessageSend(e.to_string()));
                self.notify(Notice::error("Error", "Failed to send message. Please try again."));
            }
        }
    }

    /// Forget the session and conversation. Safe to call in any state.
    pub fn reset_session(&mut self) {
        if let Err(e) = self.store.remove() {
            warn!(error = %e, "Could not remove persisted session identifier");
        }

        self.epoch += 1;
        self.session_id = None;
        self.phase = SessionPhase::NoSession;
        self.messages.clear();
        self.is_loading = false;
        self.in_flight_send = None;
        self.session_error = None;
        self.last_send_error = None;

        info!("Session reset");
        self.notify(Notice::info("Session reset", "The current session has been cleared."));
    }

    fn notify(&mut self, notice: Notice) {
        self.notices.push_back(notice);
    }
}

fn describe_creation_failure(error: &TransportError) -> String {
    match error {
        TransportError::Status(status) => format!("Failed to create session: {}", status),
        other => other.to_string(),
    }
}
