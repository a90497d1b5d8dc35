//! Mock connector for testing.
//!
//! Records every connect, outbound frame and close, and lets tests play the
//! server side by injecting inbound frames, remote closes and transport
//! failures into the most recently opened channel.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::mpsc;

use crate::codec;
use crate::connection::{Channel, ChannelEvent, ChannelEvents, Connector};
use crate::envelope::Envelope;
use crate::error::{ChatError, ChatResult};

#[derive(Default)]
struct MockState {
    targets: RwLock<Vec<String>>,
    sent: RwLock<Vec<String>>,
    closes: AtomicUsize,
    inbound: RwLock<Option<mpsc::UnboundedSender<ChannelEvent>>>,
    connect_failure: RwLock<Option<String>>,
    fail_sends: AtomicBool,
}

/// In-memory stand-in for the WebSocket connector.
#[derive(Clone, Default)]
pub struct MockConnector {
    state: Arc<MockState>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent connect attempt fail.
    pub fn fail_connect(self, message: impl Into<String>) -> Self {
        *self.state.connect_failure.write() = Some(message.into());
        self
    }

    /// Let connect attempts succeed again.
    pub fn allow_connect(&self) {
        *self.state.connect_failure.write() = None;
    }

    /// Make channel writes fail.
    pub fn fail_sends(&self, fail: bool) {
        self.state.fail_sends.store(fail, Ordering::SeqCst);
    }

    /// Deliver an inbound frame on the current channel.
    pub fn push_frame(&self, frame: impl Into<String>) {
        self.push_event(ChannelEvent::Frame(frame.into()));
    }

    /// Deliver an inbound envelope on the current channel.
    pub fn push_envelope(&self, envelope: &Envelope) {
        if let Ok(frame) = codec::encode(envelope) {
            self.push_frame(frame);
        }
    }

    /// Simulate the server closing the channel.
    pub fn remote_close(&self, reason: Option<&str>) {
        self.push_event(ChannelEvent::Closed {
            reason: reason.map(str::to_string),
        });
    }

    /// Simulate a transport failure.
    pub fn fail_transport(&self, reason: impl Into<String>) {
        self.push_event(ChannelEvent::Failed(reason.into()));
    }

    /// Targets passed to every successful or failed connect.
    pub fn connected_targets(&self) -> Vec<String> {
        self.state.targets.read().clone()
    }

    pub fn connect_count(&self) -> usize {
        self.state.targets.read().len()
    }

    pub fn close_count(&self) -> usize {
        self.state.closes.load(Ordering::SeqCst)
    }

    /// Raw frames handed to the transport.
    pub fn sent_payloads(&self) -> Vec<String> {
        self.state.sent.read().clone()
    }

    /// Outbound frames that decode as envelopes.
    pub fn sent_envelopes(&self) -> Vec<Envelope> {
        self.state
            .sent
            .read()
            .iter()
            .filter_map(|frame| codec::decode(frame).ok())
            .collect()
    }

    pub fn clear_sent(&self) {
        self.state.sent.write().clear();
    }

    fn push_event(&self, event: ChannelEvent) {
        if let Some(tx) = self.state.inbound.read().as_ref() {
            let _ = tx.send(event);
        }
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, target: &str) -> ChatResult<(Box<dyn Channel>, ChannelEvents)> {
        self.state.targets.write().push(target.to_string());

        if let Some(reason) = self.state.connect_failure.read().clone() {
            return Err(ChatError::ConnectFailed {
                target: target.to_string(),
                reason,
            });
        }

        let (tx, rx) = mpsc::unbounded_channel();
        *self.state.inbound.write() = Some(tx);

        let channel = MockChannel {
            state: Arc::clone(&self.state),
            closed: false,
        };
        Ok((Box::new(channel), rx))
    }
}

struct MockChannel {
    state: Arc<MockState>,
    closed: bool,
}

impl Channel for MockChannel {
    fn send(&mut self, payload: String) -> ChatResult<()> {
        if self.closed || self.state.fail_sends.load(Ordering::SeqCst) {
            return Err(ChatError::ChannelClosed);
        }
        self.state.sent.write().push(payload);
        Ok(())
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.state.closes.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_records_traffic() {
        let connector = MockConnector::new();
        let (mut channel, mut events) = connector.connect("ws://test/x").await.unwrap();

        channel.send("frame".to_string()).unwrap();
        connector.push_frame("inbound");
        channel.close();
        channel.close();

        assert_eq!(connector.sent_payloads(), vec!["frame".to_string()]);
        assert_eq!(connector.close_count(), 1);
        assert_eq!(events.recv().await, Some(ChannelEvent::Frame("inbound".to_string())));
        assert!(channel.send("late".to_string()).is_err());
    }

    #[tokio::test]
    async fn test_mock_connect_failure() {
        let connector = MockConnector::new().fail_connect("refused");
        assert!(connector.connect("ws://test/x").await.is_err());
        assert_eq!(connector.connect_count(), 1);

        connector.allow_connect();
        assert!(connector.connect("ws://test/x").await.is_ok());
    }
}
