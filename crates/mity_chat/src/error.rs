//! Error types for the chat protocol.

use std::fmt;

/// Chat protocol errors
#[derive(Debug)]
pub enum ChatError {
    /// The duplex channel could not be established
    ConnectFailed { target: String, reason: String },
    /// An operation needed an open channel
    NotConnected,
    /// The channel went away while writing
    ChannelClosed,
    /// A user message was recorded but its frame never reached the transport
    SendFailed { message_id: String },
    /// Outgoing envelope could not be serialized
    SerializationError(String),
    /// Attachment source could not be read
    AttachmentError(String),
    /// File system error
    IoError(std::io::Error),
}

impl fmt::Display for ChatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectFailed { target, reason } => {
                write!(f, "Failed to connect to {}: {}", target, reason)
            }
            Self::NotConnected => write!(f, "Not connected to server"),
            Self::ChannelClosed => write!(f, "Connection closed"),
            Self::SendFailed { message_id } => {
                write!(f, "Message {} was not delivered, connection closed", message_id)
            }
            Self::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            Self::AttachmentError(msg) => write!(f, "Attachment error: {}", msg),
            Self::IoError(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for ChatError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ChatError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError(err)
    }
}

impl From<serde_json::Error> for ChatError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

/// Result type for chat operations
pub type ChatResult<T> = Result<T, ChatError>;
