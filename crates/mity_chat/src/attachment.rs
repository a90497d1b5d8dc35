//! Attachment encoding for outgoing messages.
//!
//! Images travel as base64 with their media type; text files travel inline.
//! The encoder is total: every well-typed input produces a wire attachment,
//! and the output order is the input order.

use std::fs;
use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::{ChatError, ChatResult};

const DEFAULT_IMAGE_MEDIA_TYPE: &str = "image/png";

/// Wire representation carried in a `message` envelope's `attachments` field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Attachment {
    Image { media_type: String, data: String },
    Text { filename: String, content: String },
}

/// Image payload as handed over by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageData {
    /// Raw image bytes
    Bytes(Vec<u8>),
    /// Already base64-encoded payload
    Base64(String),
    /// `data:<media>;base64,<payload>` URI, as produced by browsers and pasteboards
    DataUri(String),
}

/// Typed description of an attachment before encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentInput {
    Image { media_type: String, data: ImageData },
    Text { filename: String, content: String },
}

impl AttachmentInput {
    pub fn image(media_type: impl Into<String>, data: ImageData) -> Self {
        Self::Image {
            media_type: media_type.into(),
            data,
        }
    }

    pub fn text(filename: impl Into<String>, content: impl Into<String>) -> Self {
        Self::Text {
            filename: filename.into(),
            content: content.into(),
        }
    }

    /// Read a file from disk. Known image extensions become images, anything
    /// else is read as (lossy) UTF-8 text.
    pub fn from_path(path: impl AsRef<Path>) -> ChatResult<Self> {
        let path = path.as_ref();
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| ChatError::AttachmentError(format!("not a file: {}", path.display())))?;

        let bytes = fs::read(path)?;

        match image_media_type_for(path) {
            Some(media_type) => Ok(Self::image(media_type, ImageData::Bytes(bytes))),
            None => Ok(Self::text(
                filename,
                String::from_utf8_lossy(&bytes).into_owned(),
            )),
        }
    }

    /// Encode into the wire representation.
    pub fn encode(self) -> Attachment {
        match self {
            Self::Image { media_type, data } => {
                let (media_type, data) = encode_image(media_type, data);
                Attachment::Image { media_type, data }
            }
            Self::Text { filename, content } => Attachment::Text { filename, content },
        }
    }
}

/// Encode a list of attachments, preserving order.
pub fn encode_attachments<I>(inputs: I) -> Vec<Attachment>
where
    I: IntoIterator<Item = AttachmentInput>,
{
    inputs.into_iter().map(AttachmentInput::encode).collect()
}

fn encode_image(media_type: String, data: ImageData) -> (String, String) {
    match data {
        ImageData::Bytes(bytes) => (media_type, STANDARD.encode(bytes)),
        ImageData::Base64(payload) => (media_type, payload),
        ImageData::DataUri(uri) => match split_data_uri(&uri) {
            Some((uri_media, payload)) => {
                let media_type = if media_type.is_empty() {
                    uri_media.unwrap_or(DEFAULT_IMAGE_MEDIA_TYPE).to_string()
                } else {
                    media_type
                };
                (media_type, payload.to_string())
            }
            // Not a base64 data URI: pass the string through as the payload
            None => (media_type, uri),
        },
    }
}

/// Split `data:image/png;base64,AAAA` into (`Some("image/png")`, `"AAAA"`).
fn split_data_uri(uri: &str) -> Option<(Option<&str>, &str)> {
    let rest = uri.strip_prefix("data:")?;
    let (meta, payload) = rest.split_once(',')?;
    let media = meta.strip_suffix(";base64")?;
    let media = if media.is_empty() { None } else { Some(media) };
    Some((media, payload))
}

fn image_media_type_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_string_lossy().to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}
