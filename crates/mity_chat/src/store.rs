//! Session state store.
//!
//! Holds the transcript, the pending question, and the loading/progress/error
//! flags, and applies decoded envelopes through a single dispatch `match`.
//!
//! `is_loading` is set by a user send and cleared only by an assistant
//! `message` or a `question`. There is no timeout: a backend that never
//! answers leaves the session loading.

use chrono::Utc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::attachment::Attachment;
use crate::connection::ConnectionState;
use crate::envelope::Envelope;
use crate::types::{Message, MessageRole, Question};

/// Outcome of applying an envelope that the session owner must act on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionSignal {
    /// The agent finished the spec; carries the result path
    Completed { spec_path: String },
    /// The server reported an error
    Error(String),
}

/// Generates transcript ids: a per-store counter plus a millisecond suffix.
#[derive(Debug, Default)]
pub struct MessageIdGenerator {
    counter: u64,
}

impl MessageIdGenerator {
    pub fn next_id(&mut self) -> String {
        self.counter += 1;
        format!("msg-{}-{}", self.counter, Utc::now().timestamp_millis())
    }
}

/// Observable state of one chat session.
#[derive(Debug, Default)]
pub struct SessionStore {
    transcript: Vec<Message>,
    current_question: Option<Question>,
    is_loading: bool,
    progress: Option<String>,
    error: Option<String>,
    spec_path: Option<String>,
    ids: MessageIdGenerator,
    connection: Option<watch::Receiver<ConnectionState>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Follow a connection's state so [`SessionStore::is_connected`] tracks it.
    pub fn attach_connection(&mut self, states: watch::Receiver<ConnectionState>) {
        self.connection = Some(states);
    }

    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.current_question.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn progress(&self) -> Option<&str> {
        self.progress.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Path reported by the last `complete` envelope.
    pub fn spec_path(&self) -> Option<&str> {
        self.spec_path.as_deref()
    }

    pub fn is_complete(&self) -> bool {
        self.spec_path.is_some()
    }

    pub fn is_connected(&self) -> bool {
        self.connection
            .as_ref()
            .map(|rx| rx.borrow().is_open())
            .unwrap_or(false)
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    /// Apply an inbound envelope.
    pub fn apply(&mut self, envelope: Envelope) -> Option<SessionSignal> {
        match envelope {
            Envelope::Message {
                role,
                content,
                attachments,
            } => {
                self.push(role, content, attachments);
                if role == MessageRole::Assistant {
                    self.is_loading = false;
                }
                None
            }
            Envelope::Progress { message } => {
                debug!(progress = %message, "Progress update");
                self.progress = Some(message);
                None
            }
            Envelope::Question(question) => {
                if let Some(previous) = &self.current_question {
                    debug!(
                        previous = %previous.question_id,
                        next = %question.question_id,
                        "Replacing pending question"
                    );
                }
                self.current_question = Some(question);
                self.is_loading = false;
                None
            }
            Envelope::Complete { spec_path } => {
                info!(spec_path = %spec_path, "Spec session complete");
                self.spec_path = Some(spec_path.clone());
                Some(SessionSignal::Completed { spec_path })
            }
            Envelope::Error { message } => {
                warn!(error = %message, "Server reported error");
                self.error = Some(message.clone());
                Some(SessionSignal::Error(message))
            }
            Envelope::Answer(_) | Envelope::Ping | Envelope::Pong => {
                debug!(kind = envelope.kind(), "Ignoring control envelope");
                None
            }
        }
    }

    /// Optimistically record an outgoing user message and mark the session loading.
    pub fn record_user_message(
        &mut self,
        content: impl Into<String>,
        attachments: Vec<Attachment>,
    ) -> &Message {
        self.is_loading = true;
        self.push(MessageRole::User, content.into(), attachments)
    }

    /// Clear the pending question. Returns `true` if it had `question_id`.
    pub fn resolve_question(&mut self, question_id: &str) -> bool {
        match self.current_question.take() {
            Some(q) if q.question_id == question_id => true,
            Some(q) => {
                debug!(
                    pending = %q.question_id,
                    answered = question_id,
                    "Discarding answer to stale question"
                );
                false
            }
            None => {
                debug!(answered = question_id, "No pending question to answer");
                false
            }
        }
    }

    /// Forget everything except the connection subscription.
    pub fn reset(&mut self) {
        let connection = self.connection.take();
        *self = Self {
            connection,
            ..Self::default()
        };
    }

    fn push(&mut self, role: MessageRole, content: String, attachments: Vec<Attachment>) -> &Message {
        let message = Message {
            id: self.ids.next_id(),
            role,
            content,
            attachments,
            timestamp: Utc::now(),
        };
        self.transcript.push(message);
        &self.transcript[self.transcript.len() - 1]
    }
}
