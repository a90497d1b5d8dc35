//! Wire envelopes exchanged over the spec chat channel.
//!
//! One JSON object per frame, tagged by `type`.

use serde::{Deserialize, Serialize};

use crate::attachment::Attachment;
use crate::types::{Answer, MessageRole, Question};

/// Typed message unit carried over the duplex channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Envelope {
    /// Conversation turn from either side
    Message {
        role: MessageRole,
        content: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        attachments: Vec<Attachment>,
    },
    /// Human-readable progress line from the agent
    Progress { message: String },
    /// Structured question awaiting an answer
    Question(Question),
    /// Outbound answer to the current question
    Answer(Answer),
    /// Spec authoring finished
    Complete { spec_path: String },
    /// Server-side error; the channel stays open
    Error { message: String },
    /// Outbound keepalive
    Ping,
    /// Keepalive reply
    Pong,
}

impl Envelope {
    /// Every `type` tag this codec understands.
    pub const KINDS: &'static [&'static str] = &[
        "message", "progress", "question", "answer", "complete", "error", "ping", "pong",
    ];

    /// Outgoing user message.
    pub fn user_message(content: impl Into<String>, attachments: Vec<Attachment>) -> Self {
        Self::Message {
            role: MessageRole::User,
            content: content.into(),
            attachments,
        }
    }

    /// The wire tag of this envelope.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Message { .. } => "message",
            Self::Progress { .. } => "progress",
            Self::Question(_) => "question",
            Self::Answer(_) => "answer",
            Self::Complete { .. } => "complete",
            Self::Error { .. } => "error",
            Self::Ping => "ping",
            Self::Pong => "pong",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::QuestionOption;
    use serde_json::json;

    #[test]
    fn test_question_is_flattened_under_tag() {
        let envelope = Envelope::Question(Question {
            question_id: "q-1".to_string(),
            text: "Which stack?".to_string(),
            options: vec![QuestionOption::new("rust", "Rust")],
            multi_select: true,
        });

        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({
                "type": "question",
                "question_id": "q-1",
                "text": "Which stack?",
                "options": [{"id": "rust", "label": "Rust"}],
                "multi_select": true
            })
        );
    }

    #[test]
    fn test_message_without_attachments_omits_field() {
        let value = serde_json::to_value(Envelope::user_message("hi", Vec::new())).unwrap();
        assert_eq!(value, json!({"type": "message", "role": "user", "content": "hi"}));
    }

    #[test]
    fn test_kind_matches_tag() {
        let envelopes = vec![
            Envelope::user_message("x", Vec::new()),
            Envelope::Progress { message: "p".into() },
            Envelope::Answer(Answer::new("q", ["a"])),
            Envelope::Complete { spec_path: "/s".into() },
            Envelope::Error { message: "e".into() },
            Envelope::Ping,
            Envelope::Pong,
        ];

        for envelope in envelopes {
            let value = serde_json::to_value(&envelope).unwrap();
            assert_eq!(value["type"], envelope.kind());
            assert!(Envelope::KINDS.contains(&envelope.kind()));
        }
    }
}
