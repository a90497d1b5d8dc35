//! WebSocket connector.
//!
//! Each channel gets a writer task fed by an unbounded queue and a reader
//! task that forwards text frames as [`ChannelEvent`]s.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, warn};

use crate::connection::{Channel, ChannelEvent, ChannelEvents, Connector};
use crate::error::{ChatError, ChatResult};

enum Outbound {
    Text(String),
    Close,
}

/// Connector backed by `tokio-tungstenite`.
#[derive(Debug, Clone, Default)]
pub struct WsConnector;

impl WsConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, target: &str) -> ChatResult<(Box<dyn Channel>, ChannelEvents)> {
        let (stream, _response) =
            connect_async(target)
                .await
                .map_err(|e| ChatError::ConnectFailed {
                    target: target.to_string(),
                    reason: e.to_string(),
                })?;

        let (mut sink, mut source) = stream.split();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Outbound>();
        let (event_tx, event_rx) = mpsc::unbounded_channel::<ChannelEvent>();

        tokio::spawn(async move {
            while let Some(outbound) = out_rx.recv().await {
                match outbound {
                    Outbound::Text(text) => {
                        if let Err(e) = sink.send(WsMessage::Text(text.into())).await {
                            warn!(error = %e, "WebSocket write failed");
                            break;
                        }
                    }
                    Outbound::Close => {
                        let _ = sink.send(WsMessage::Close(None)).await;
                        break;
                    }
                }
            }
            let _ = sink.close().await;
        });

        tokio::spawn(async move {
            while let Some(next) = source.next().await {
                let event = match next {
                    Ok(WsMessage::Text(text)) => ChannelEvent::Frame(text.as_str().to_string()),
                    Ok(WsMessage::Binary(bytes)) => match String::from_utf8(bytes.to_vec()) {
                        Ok(text) => ChannelEvent::Frame(text),
                        Err(_) => {
                            debug!(len = bytes.len(), "Ignoring non-UTF-8 binary frame");
                            continue;
                        }
                    },
                    Ok(WsMessage::Close(frame)) => {
                        let reason = frame.map(|f| f.reason.as_str().to_string()).filter(|r| !r.is_empty());
                        let _ = event_tx.send(ChannelEvent::Closed { reason });
                        return;
                    }
                    // Ping/pong frames are answered by tungstenite itself
                    Ok(_) => continue,
                    Err(e) => {
                        let _ = event_tx.send(ChannelEvent::Failed(e.to_string()));
                        return;
                    }
                };

                if event_tx.send(event).is_err() {
                    // Owner dropped the channel
                    return;
                }
            }
            let _ = event_tx.send(ChannelEvent::Closed { reason: None });
        });

        Ok((Box::new(WsChannel { out_tx }), event_rx))
    }
}

struct WsChannel {
    out_tx: mpsc::UnboundedSender<Outbound>,
}

impl Channel for WsChannel {
    fn send(&mut self, payload: String) -> ChatResult<()> {
        self.out_tx
            .send(Outbound::Text(payload))
            .map_err(|_| ChatError::ChannelClosed)
    }

    fn close(&mut self) {
        let _ = self.out_tx.send(Outbound::Close);
    }
}
