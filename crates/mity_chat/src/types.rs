//! Core types for the spec chat: transcript entries, questions and answers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::attachment::Attachment;

/// Message role in a conversation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// A single transcript entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique within the owning session
    pub id: String,
    /// Role of the message sender
    pub role: MessageRole,
    /// Message content
    pub content: String,
    /// Attachments sent with a user message (display only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
    /// When the message was sent or received
    pub timestamp: DateTime<Utc>,
}

/// One selectable option of a structured question
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuestionOption {
    pub id: String,
    pub label: String,
}

impl QuestionOption {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

/// A structured question asked by the agent
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Question {
    pub question_id: String,
    #[serde(default)]
    pub text: String,
    pub options: Vec<QuestionOption>,
    #[serde(default)]
    pub multi_select: bool,
}

impl Question {
    /// Look up an option by its position (0-based).
    pub fn option_at(&self, index: usize) -> Option<&QuestionOption> {
        self.options.get(index)
    }

    /// Check whether an option id belongs to this question.
    pub fn has_option(&self, option_id: &str) -> bool {
        self.options.iter().any(|o| o.id == option_id)
    }
}

/// The user's answer to a structured question
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Answer {
    pub question_id: String,
    pub selected_option_ids: Vec<String>,
}

impl Answer {
    /// Build an answer; duplicate option ids are dropped, first occurrence wins.
    pub fn new<I, S>(question_id: impl Into<String>, selected: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut selected_option_ids: Vec<String> = Vec::new();
        for id in selected {
            let id = id.into();
            if !selected_option_ids.contains(&id) {
                selected_option_ids.push(id);
            }
        }
        Self {
            question_id: question_id.into(),
            selected_option_ids,
        }
    }
}
