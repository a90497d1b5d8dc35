//! Envelope codec.
//!
//! `decode` never panics. Anything that is not a well-formed envelope of a
//! known kind comes back as a [`DecodeError`], which the session layer logs
//! and drops before any state is touched.

use std::fmt;

use serde_json::{Map, Value};

use crate::envelope::Envelope;
use crate::error::ChatResult;

/// Why an inbound payload was ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Payload is not valid JSON
    InvalidJson(String),
    /// Payload is JSON but not an object
    NotAnObject,
    /// Object has no string `type` field
    MissingKind,
    /// `type` is not one of [`Envelope::KINDS`]
    UnknownKind(String),
    /// Known kind, but required fields are missing or mistyped
    InvalidShape { kind: String, reason: String },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidJson(msg) => write!(f, "invalid JSON: {}", msg),
            Self::NotAnObject => write!(f, "payload is not a JSON object"),
            Self::MissingKind => write!(f, "missing `type` field"),
            Self::UnknownKind(kind) => write!(f, "unknown envelope type `{}`", kind),
            Self::InvalidShape { kind, reason } => {
                write!(f, "malformed `{}` envelope: {}", kind, reason)
            }
        }
    }
}

impl std::error::Error for DecodeError {}

/// Serialize an envelope into a text frame.
pub fn encode(envelope: &Envelope) -> ChatResult<String> {
    Ok(serde_json::to_string(envelope)?)
}

/// Parse and validate an inbound text frame.
pub fn decode(payload: &str) -> Result<Envelope, DecodeError> {
    let value: Value =
        serde_json::from_str(payload).map_err(|e| DecodeError::InvalidJson(e.to_string()))?;

    let object = value.as_object().ok_or(DecodeError::NotAnObject)?;

    let kind = object
        .get("type")
        .and_then(Value::as_str)
        .ok_or(DecodeError::MissingKind)?
        .to_string();

    if !Envelope::KINDS.contains(&kind.as_str()) {
        return Err(DecodeError::UnknownKind(kind));
    }

    check_shape(&kind, object)?;

    serde_json::from_value(value).map_err(|e| DecodeError::InvalidShape {
        kind,
        reason: e.to_string(),
    })
}

type FieldCheck = (&'static str, fn(&Value) -> bool);

const MESSAGE_FIELDS: &[FieldCheck] = &[("role", Value::is_string), ("content", Value::is_string)];
const QUESTION_FIELDS: &[FieldCheck] = &[("question_id", Value::is_string), ("options", Value::is_array)];
const ANSWER_FIELDS: &[FieldCheck] = &[
    ("question_id", Value::is_string),
    ("selected_option_ids", Value::is_array),
];
const COMPLETE_FIELDS: &[FieldCheck] = &[("spec_path", Value::is_string)];
const TEXT_FIELDS: &[FieldCheck] = &[("message", Value::is_string)];

/// Minimal per-kind field checks, run before typed deserialization so the
/// rejection reason names the missing field.
fn check_shape(kind: &str, object: &Map<String, Value>) -> Result<(), DecodeError> {
    let required = match kind {
        "message" => MESSAGE_FIELDS,
        "question" => QUESTION_FIELDS,
        "answer" => ANSWER_FIELDS,
        "complete" => COMPLETE_FIELDS,
        "progress" | "error" => TEXT_FIELDS,
        _ => &[],
    };

    for (field, is_expected_type) in required {
        match object.get(*field) {
            Some(v) if is_expected_type(v) => {}
            Some(_) => {
                return Err(DecodeError::InvalidShape {
                    kind: kind.to_string(),
                    reason: format!("field `{}` has the wrong type", field),
                })
            }
            None => {
                return Err(DecodeError::InvalidShape {
                    kind: kind.to_string(),
                    reason: format!("missing field `{}`", field),
                })
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attachment::Attachment;
    use crate::types::{Answer, MessageRole};

    #[test]
    fn test_decode_assistant_message() {
        let envelope = decode(r#"{"type":"message","role":"assistant","content":"Hello"}"#).unwrap();
        assert_eq!(
            envelope,
            Envelope::Message {
                role: MessageRole::Assistant,
                content: "Hello".to_string(),
                attachments: Vec::new(),
            }
        );
    }

    #[test]
    fn test_decode_question_defaults() {
        let envelope = decode(r#"{"type":"question","question_id":"q1","options":[]}"#).unwrap();
        match envelope {
            Envelope::Question(q) => {
                assert_eq!(q.question_id, "q1");
                assert!(q.text.is_empty());
                assert!(!q.multi_select);
            }
            other => panic!("expected question, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_rejects_non_json() {
        assert!(matches!(decode("not json"), Err(DecodeError::InvalidJson(_))));
        assert!(matches!(decode(""), Err(DecodeError::InvalidJson(_))));
    }

    #[test]
    fn test_decode_rejects_non_object() {
        assert_eq!(decode("[1,2,3]"), Err(DecodeError::NotAnObject));
        assert_eq!(decode("\"message\""), Err(DecodeError::NotAnObject));
    }

    #[test]
    fn test_decode_rejects_missing_and_unknown_kind() {
        assert_eq!(decode(r#"{"content":"x"}"#), Err(DecodeError::MissingKind));
        assert_eq!(decode(r#"{"type":7}"#), Err(DecodeError::MissingKind));
        assert_eq!(
            decode(r#"{"type":"file_written","path":"x"}"#),
            Err(DecodeError::UnknownKind("file_written".to_string()))
        );
    }

    #[test]
    fn test_decode_question_requires_id_and_options() {
        let missing_id = decode(r#"{"type":"question","options":[]}"#);
        assert!(matches!(
            missing_id,
            Err(DecodeError::InvalidShape { ref reason, .. }) if reason.contains("question_id")
        ));

        let missing_options = decode(r#"{"type":"question","question_id":"q"}"#);
        assert!(matches!(
            missing_options,
            Err(DecodeError::InvalidShape { ref reason, .. }) if reason.contains("options")
        ));

        let bad_options = decode(r#"{"type":"question","question_id":"q","options":"a,b"}"#);
        assert!(matches!(bad_options, Err(DecodeError::InvalidShape { .. })));
    }

    #[test]
    fn test_decode_rejects_unknown_role() {
        let result = decode(r#"{"type":"message","role":"system","content":"x"}"#);
        assert!(matches!(result, Err(DecodeError::InvalidShape { ref kind, .. }) if kind == "message"));
    }

    #[test]
    fn test_decode_rejects_malformed_option_entries() {
        let result = decode(r#"{"type":"question","question_id":"q","options":[{"id":"a"}]}"#);
        assert!(matches!(result, Err(DecodeError::InvalidShape { .. })));
    }

    #[test]
    fn test_decode_complete_and_pong() {
        assert_eq!(
            decode(r#"{"type":"complete","spec_path":"/x/spec.md"}"#).unwrap(),
            Envelope::Complete {
                spec_path: "/x/spec.md".to_string()
            }
        );
        assert_eq!(decode(r#"{"type":"pong"}"#).unwrap(), Envelope::Pong);
        assert!(decode(r#"{"type":"complete"}"#).is_err());
    }

    #[test]
    fn test_encode_is_stable() {
        let envelope = Envelope::user_message(
            "See attached",
            vec![Attachment::Text {
                filename: "a.txt".to_string(),
                content: "A".to_string(),
            }],
        );

        let first = encode(&envelope).unwrap();
        let second = encode(&envelope).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            first,
            r#"{"type":"message","role":"user","content":"See attached","attachments":[{"type":"text","filename":"a.txt","content":"A"}]}"#
        );
    }

    #[test]
    fn test_encode_answer() {
        let payload = encode(&Envelope::Answer(Answer::new("q9", ["x", "y"]))).unwrap();
        assert_eq!(
            payload,
            r#"{"type":"answer","question_id":"q9","selected_option_ids":["x","y"]}"#
        );
    }
}
