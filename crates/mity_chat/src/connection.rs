//! Connection manager for the spec chat channel.
//!
//! Owns at most one duplex channel at a time. State moves
//! `Idle -> Connecting -> Open -> Closed`, and `Closed` is reachable from any
//! state. Transitions are published on a `watch` channel so observers see
//! them as soon as they happen.
//!
//! There is no reconnect logic here: a transport failure lands in `Closed`
//! with [`ConnectionManager::last_error`] set, and the owner decides what to do.

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::error::ChatResult;

/// Lifecycle of the duplex channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Connecting,
    Open,
    Closed,
}

impl ConnectionState {
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }
}

/// Events produced by the receiving half of a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// Inbound text frame
    Frame(String),
    /// Remote side closed the channel
    Closed { reason: Option<String> },
    /// Transport-level failure
    Failed(String),
}

/// Send half of an established channel.
pub trait Channel: Send {
    /// Queue a text frame for delivery.
    fn send(&mut self, payload: String) -> ChatResult<()>;

    /// Tear the channel down. Must be safe to call more than once.
    fn close(&mut self);
}

/// Receiving half of an established channel.
pub type ChannelEvents = mpsc::UnboundedReceiver<ChannelEvent>;

/// Establishes duplex channels to a target address.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, target: &str) -> ChatResult<(Box<dyn Channel>, ChannelEvents)>;
}

/// Server address for spec chat channels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    base_url: String,
}

impl Endpoint {
    /// `base_url` may use http(s) or ws(s); http schemes are mapped to ws.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        let base_url = if let Some(rest) = base_url.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = base_url.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            base_url
        };
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Channel address for one project; the project is part of the path so
    /// sessions for different projects never share a channel.
    pub fn session_url(&self, project: &str) -> String {
        format!(
            "{}/api/spec/ws/{}",
            self.base_url,
            urlencoding::encode(project)
        )
    }
}

/// Owns the single channel of a chat session.
pub struct ConnectionManager {
    connector: Box<dyn Connector>,
    endpoint: Endpoint,
    session_key: Option<String>,
    channel: Option<Box<dyn Channel>>,
    events: Option<ChannelEvents>,
    state_tx: watch::Sender<ConnectionState>,
    last_error: Option<String>,
}

impl ConnectionManager {
    pub fn new(connector: Box<dyn Connector>, endpoint: Endpoint) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Idle);
        Self {
            connector,
            endpoint,
            session_key: None,
            channel: None,
            events: None,
            state_tx,
            last_error: None,
        }
    }

    /// Current state.
    pub fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.state().is_open()
    }

    /// Observe state transitions.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// Key of the channel currently owned, if any.
    pub fn session_key(&self) -> Option<&str> {
        self.session_key.as_deref()
    }

    /// Reason for the most recent transport failure.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Open the channel for `session_key`.
    ///
    /// A no-op when already open for the same key. A different key closes the
    /// existing channel first.
    pub async fn open(&mut self, session_key: &str) -> ChatResult<()> {
        if self.session_key.as_deref() == Some(session_key) && self.state().is_open() {
            debug!(session = session_key, "Channel already open");
            return Ok(());
        }

        if self.channel.is_some() {
            info!(
                from = self.session_key.as_deref().unwrap_or(""),
                to = session_key,
                "Switching session, closing previous channel"
            );
            self.close();
        }

        let target = self.endpoint.session_url(session_key);
        self.session_key = Some(session_key.to_string());
        self.last_error = None;
        self.transition(ConnectionState::Connecting);

        match self.connector.connect(&target).await {
            Ok((channel, events)) => {
                self.channel = Some(channel);
                self.events = Some(events);
                self.transition(ConnectionState::Open);
                info!(session = session_key, target = %target, "Channel open");
                Ok(())
            }
            Err(e) => {
                warn!(session = session_key, target = %target, error = %e, "Channel connect failed");
                self.last_error = Some(e.to_string());
                self.transition(ConnectionState::Closed);
                Err(e)
            }
        }
    }

    /// Send a text frame. Returns `false` (and never touches the transport)
    /// unless the channel is open. Nothing is queued for later delivery.
    pub fn send(&mut self, payload: String) -> bool {
        if !self.state().is_open() {
            debug!(state = ?self.state(), "Dropping outbound frame, channel not open");
            return false;
        }

        let Some(channel) = self.channel.as_mut() else {
            return false;
        };

        match channel.send(payload) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Channel write failed");
                self.fail(e.to_string());
                false
            }
        }
    }

    /// Wait for the next inbound frame.
    ///
    /// Returns `None` once the channel is gone; the state is `Closed` by then.
    pub async fn next_frame(&mut self) -> Option<String> {
        let events = self.events.as_mut()?;

        match events.recv().await {
            Some(ChannelEvent::Frame(frame)) => Some(frame),
            Some(ChannelEvent::Closed { reason }) => {
                info!(reason = reason.as_deref().unwrap_or(""), "Channel closed by remote");
                self.drop_channel();
                self.transition(ConnectionState::Closed);
                None
            }
            Some(ChannelEvent::Failed(reason)) => {
                warn!(error = %reason, "Channel transport error");
                self.fail(reason);
                None
            }
            None => {
                self.drop_channel();
                self.transition(ConnectionState::Closed);
                None
            }
        }
    }

    /// Close the channel. Safe to call in any state.
    pub fn close(&mut self) {
        if let Some(mut channel) = self.channel.take() {
            channel.close();
            debug!(session = self.session_key.as_deref().unwrap_or(""), "Channel closed");
        }
        self.events = None;
        self.transition(ConnectionState::Closed);
    }

    fn fail(&mut self, reason: String) {
        self.last_error = Some(reason);
        self.drop_channel();
        self.transition(ConnectionState::Closed);
    }

    fn drop_channel(&mut self) {
        if let Some(mut channel) = self.channel.take() {
            channel.close();
        }
        self.events = None;
    }

    fn transition(&self, next: ConnectionState) {
        let previous = self.state_tx.send_replace(next);
        if previous != next {
            debug!(from = ?previous, to = ?next, "Connection state changed");
        }
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        if let Some(mut channel) = self.channel.take() {
            channel.close();
        }
    }
}
