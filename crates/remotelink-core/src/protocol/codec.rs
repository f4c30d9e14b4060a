//! JSON codec for encoding and decoding RemoteLink wire frames.
//!
//! Wire format: one UTF-8 JSON document per WebSocket text frame,
//! `{"type": <TAG>, "payload": <any>}`. No compression, no framing beyond
//! what the transport provides, no protocol version field.

use thiserror::Error;

use crate::protocol::messages::Message;

/// Errors that can occur while decoding or encoding a wire frame.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The frame is not valid JSON, or lacks the required `"type"` field.
    #[error("malformed frame: {0}")]
    MalformedFrame(#[from] serde_json::Error),
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Decodes one frame into a [`Message`].
///
/// Decoding is deliberately permissive: any JSON object carrying a `"type"`
/// field parses, with unrecognized tags landing in [`Message::Unknown`].
/// Only frames that are not JSON at all, or that lack the type tag, fail.
///
/// # Errors
///
/// Returns [`ProtocolError::MalformedFrame`] for non-JSON input or a frame
/// without a `"type"` field.
///
/// # Examples
///
/// ```rust
/// use remotelink_core::protocol::{decode_message, Message};
///
/// let msg = decode_message(r#"{"type":"KEY_PRESS","payload":"A"}"#).unwrap();
/// assert_eq!(msg.tag(), "KEY_PRESS");
///
/// assert!(decode_message("not json").is_err());
/// ```
pub fn decode_message(raw: &str) -> Result<Message, ProtocolError> {
    Ok(serde_json::from_str(raw)?)
}

/// Encodes a [`Message`] into its wire frame.
///
/// # Errors
///
/// Returns [`ProtocolError::MalformedFrame`] if serialization fails.
///
/// # Examples
///
/// ```rust
/// use remotelink_core::protocol::{decode_message, encode_message};
///
/// let msg = decode_message(r#"{"type":"MEDIA_CMD","payload":"next"}"#).unwrap();
/// let frame = encode_message(&msg).unwrap();
/// assert_eq!(frame, r#"{"type":"MEDIA_CMD","payload":"next"}"#);
/// ```
pub fn encode_message(msg: &Message) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(msg)?)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
