//! # mity_chat - Spec Chat Protocol for mITyFactory
//!
//! This crate provides the client side of the spec authoring conversation:
//! - Typed wire envelopes and a codec that never panics on bad input
//! - Attachment encoding (images and text files) for outgoing messages
//! - A connection manager owning exactly one duplex channel per session
//! - A session state store driven by inbound envelopes
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐  frames  ┌─────────────────┐  envelopes  ┌─────────────────┐
//! │   Connection    │─────────▶│      Codec      │────────────▶│  Session Store  │
//! │    Manager      │◀─────────│                 │◀────────────│  (transcript,   │
//! └────────┬────────┘          └─────────────────┘             │   question)     │
//!          │                           ▲                       └─────────────────┘
//!          ▼                           │
//! ┌─────────────────┐          ┌─────────────────┐
//! │  WsConnector /  │          │   Attachment    │
//! │  MockConnector  │          │    Encoder      │
//! └─────────────────┘          └─────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use mity_chat::{ChatSession, Endpoint, SessionEvent, WsConnector};
//!
//! # async fn run() -> mity_chat::ChatResult<()> {
//! let mut chat = ChatSession::new(
//!     "demo-app",
//!     Box::new(WsConnector::new()),
//!     Endpoint::new("http://127.0.0.1:8888"),
//! );
//! chat.open().await?;
//! chat.send_message("A CLI that tracks my reading list", Vec::new())?;
//!
//! loop {
//!     match chat.next_event().await {
//!         SessionEvent::Completed { spec_path } => {
//!             println!("spec written to {}", spec_path);
//!             break;
//!         }
//!         SessionEvent::Disconnected => break,
//!         _ => {}
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod attachment;
pub mod codec;
pub mod connection;
pub mod envelope;
pub mod error;
pub mod mock;
pub mod session;
pub mod store;
pub mod types;
pub mod ws;

pub use attachment::{encode_attachments, Attachment, AttachmentInput, ImageData};
pub use codec::{decode, encode, DecodeError};
pub use connection::{
    Channel, ChannelEvent, ChannelEvents, ConnectionManager, ConnectionState, Connector, Endpoint,
};
pub use envelope::Envelope;
pub use error::{ChatError, ChatResult};
pub use mock::MockConnector;
pub use session::{ChatSession, SessionEvent};
pub use store::{MessageIdGenerator, SessionSignal, SessionStore};
pub use types::{Answer, Message, MessageRole, Question, QuestionOption};
pub use ws::WsConnector;
