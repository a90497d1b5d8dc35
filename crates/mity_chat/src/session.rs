//! Chat session.
//!
//! A `ChatSession` belongs to one project and owns exactly one
//! [`ConnectionManager`]. Inbound frames are decoded first and only valid
//! envelopes reach the [`SessionStore`]; malformed frames are logged and
//! dropped. Dropping the session closes its channel.

use std::time::Duration;

use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::attachment::{encode_attachments, AttachmentInput};
use crate::codec;
use crate::connection::{ConnectionManager, ConnectionState, Connector, Endpoint};
use crate::envelope::Envelope;
use crate::error::{ChatError, ChatResult};
use crate::store::{SessionSignal, SessionStore};
use crate::types::Answer;

/// What happened while waiting on the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// An envelope was applied to the store
    Updated { kind: &'static str },
    /// The agent finished the spec
    Completed { spec_path: String },
    /// The server reported an error; the session stays open
    ServerError(String),
    /// The channel is gone
    Disconnected,
}

/// One live spec conversation for a project.
pub struct ChatSession {
    project: String,
    connection: ConnectionManager,
    store: SessionStore,
    keepalive_every: Option<Duration>,
    keepalive: Option<Interval>,
}

impl ChatSession {
    pub fn new(project: impl Into<String>, connector: Box<dyn Connector>, endpoint: Endpoint) -> Self {
        let connection = ConnectionManager::new(connector, endpoint);
        let mut store = SessionStore::new();
        store.attach_connection(connection.subscribe());

        Self {
            project: project.into(),
            connection,
            store,
            keepalive_every: None,
            keepalive: None,
        }
    }

    /// Send a `ping` envelope at this interval while open. Zero disables.
    pub fn with_keepalive(mut self, every: Duration) -> Self {
        self.keepalive_every = if every.is_zero() { None } else { Some(every) };
        self
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn is_connected(&self) -> bool {
        self.store.is_connected()
    }

    /// Transport failure reason, if the channel died.
    pub fn last_error(&self) -> Option<&str> {
        self.connection.last_error()
    }

    /// Open (or re-open) the channel for this session's project.
    pub async fn open(&mut self) -> ChatResult<()> {
        self.connection.open(&self.project).await?;
        self.keepalive = self.keepalive_every.map(|every| {
            let mut ticker = interval_at(Instant::now() + every, every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });
        Ok(())
    }

    /// Close the channel. The transcript is kept.
    pub fn close(&mut self) {
        self.keepalive = None;
        self.connection.close();
    }

    /// Send a user message.
    ///
    /// Fails with [`ChatError::NotConnected`] without touching the transcript
    /// when the channel is not open. Otherwise the message is appended
    /// immediately and the session is marked loading before the frame is sent.
    ///
    /// If the write itself fails the entry stays in the transcript, the
    /// session stays loading and the channel is closed. The returned
    /// [`ChatError::SendFailed`] names the entry so callers can mark it.
    pub fn send_message(
        &mut self,
        content: impl Into<String>,
        attachments: Vec<AttachmentInput>,
    ) -> ChatResult<()> {
        if !self.connection.is_connected() {
            return Err(ChatError::NotConnected);
        }

        let content = content.into();
        let attachments = encode_attachments(attachments);
        let payload = codec::encode(&Envelope::user_message(content.clone(), attachments.clone()))?;

        let id = self.store.record_user_message(content, attachments).id.clone();
        debug!(project = %self.project, message_id = %id, "Sending user message");

        if self.connection.send(payload) {
            Ok(())
        } else {
            warn!(project = %self.project, message_id = %id, "User message not delivered");
            Err(ChatError::SendFailed { message_id: id })
        }
    }

    /// Answer the pending question.
    ///
    /// The pending question is cleared either way; an `answer` envelope is only
    /// sent when `question_id` is the pending one. Returns whether it was sent.
    pub fn answer_question<I, S>(&mut self, question_id: &str, selected_option_ids: I) -> ChatResult<bool>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if !self.store.resolve_question(question_id) {
            return Ok(false);
        }

        let payload = codec::encode(&Envelope::Answer(Answer::new(question_id, selected_option_ids)))?;
        Ok(self.connection.send(payload))
    }

    /// Feed one raw inbound frame through decode and dispatch.
    ///
    /// Returns `None` when the frame was dropped.
    pub fn handle_frame(&mut self, frame: &str) -> Option<SessionEvent> {
        let envelope = match codec::decode(frame) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(project = %self.project, error = %e, "Dropping inbound frame");
                return None;
            }
        };

        let kind = envelope.kind();
        match self.store.apply(envelope) {
            Some(SessionSignal::Completed { spec_path }) => Some(SessionEvent::Completed { spec_path }),
            Some(SessionSignal::Error(message)) => Some(SessionEvent::ServerError(message)),
            None => Some(SessionEvent::Updated { kind }),
        }
    }

    /// Wait for the next meaningful event, sending keepalives while idle.
    pub async fn next_event(&mut self) -> SessionEvent {
        loop {
            let wake = {
                let connection = &mut self.connection;
                let keepalive = &mut self.keepalive;
                tokio::select! {
                    frame = connection.next_frame() => Wake::Frame(frame),
                    _ = tick(keepalive) => Wake::Keepalive,
                }
            };

            match wake {
                Wake::Frame(Some(frame)) => {
                    if let Some(event) = self.handle_frame(&frame) {
                        return event;
                    }
                }
                Wake::Frame(None) => {
                    self.keepalive = None;
                    info!(project = %self.project, "Chat session disconnected");
                    return SessionEvent::Disconnected;
                }
                Wake::Keepalive => {
                    if let Ok(payload) = codec::encode(&Envelope::Ping) {
                        self.connection.send(payload);
                    }
                }
            }
        }
    }
}

enum Wake {
    Frame(Option<String>),
    Keepalive,
}

async fn tick(keepalive: &mut Option<Interval>) {
    match keepalive {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
