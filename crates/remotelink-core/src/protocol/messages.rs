//! Wire message types for the RemoteLink JSON protocol.
//!
//! Every frame on the wire is a JSON object with a `"type"` tag drawn from a
//! fixed enumeration and a `"payload"` whose shape depends on the tag:
//!
//! ```json
//! {"type":"KEY_PRESS","payload":"A"}
//! {"type":"CURSOR_POS","payload":{"x":42.5,"y":10.0}}
//! {"type":"SYSTEM_STATS","payload":{"cpu":12,"ram":48,"battery":100.0,"isCharging":false}}
//! ```
//!
//! # Design
//!
//! The relay is a dumb pipe: it never transforms or validates payload
//! contents, it only needs the envelope to be parseable. [`Message`] is
//! therefore a tagged union where the command tags carry free-form
//! [`serde_json::Value`] payloads, the two structured tags (`CURSOR_POS`,
//! `SYSTEM_STATS`) carry typed records, and everything else lands in an
//! explicit [`Message::Unknown`] fallback that preserves the original tag
//! and payload verbatim. A frame with a known tag but an unexpected payload
//! shape also degrades to `Unknown` rather than failing, so forwarding
//! stays byte-faithful and an ill-behaved client can never crash the relay.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::trace;

// ── Wire envelope ─────────────────────────────────────────────────────────────

/// The raw `{"type": ..., "payload": ...}` shape of every frame.
///
/// [`Message`] converts to and from this envelope via `#[serde(from/into)]`,
/// so serde sees the exact wire layout while the rest of the code works with
/// the typed enum. A missing `"payload"` field defaults to JSON `null`; a
/// missing `"type"` field is a deserialization error (the frame is
/// malformed).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct WireEnvelope {
    #[serde(rename = "type")]
    tag: String,
    #[serde(default)]
    payload: Value,
}

// ── Message ───────────────────────────────────────────────────────────────────

/// One wire frame, keyed by its `"type"` tag.
///
/// Command variants (`MouseMove` through `GamepadInput`) carry their payload
/// as free-form JSON: the relay forwards them untouched and only the
/// consuming client interprets them. `CursorPos` and `SystemStats` carry the
/// two payload shapes the protocol fixes. `Unknown` preserves any tag
/// outside the enumeration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "WireEnvelope", into = "WireEnvelope")]
pub enum Message {
    /// Relative pointer movement from a Remote (`MOUSE_MOVE`).
    MouseMove(Value),
    /// Pointer button press from a Remote (`MOUSE_CLICK`).
    MouseClick(Value),
    /// A key press from a Remote, e.g. `"A"` (`KEY_PRESS`).
    KeyPress(Value),
    /// Media transport command, e.g. `"prev"`, `"play_pause"`, `"next"`
    /// (`MEDIA_CMD`).
    MediaCmd(Value),
    /// Power command such as sleep or shutdown (`POWER_CMD`).
    PowerCmd(Value),
    /// Gamepad direction / button state from a Remote (`GAMEPAD_INPUT`).
    GamepadInput(Value),
    /// Absolute cursor position as screen percentages (`CURSOR_POS`).
    CursorPos(CursorPos),
    /// Periodic host health sample pushed by the server (`SYSTEM_STATS`).
    SystemStats(TelemetrySample),
    /// Any tag outside the enumeration, or a known tag whose payload did
    /// not match the expected shape. Forwarded verbatim.
    Unknown {
        /// The original `"type"` value.
        tag: String,
        /// The original payload, untouched.
        payload: Value,
    },
}

impl Message {
    /// Returns the wire tag for this message.
    ///
    /// Used in log messages; payload contents are deliberately not included.
    pub fn tag(&self) -> &str {
        match self {
            Message::MouseMove(_) => "MOUSE_MOVE",
            Message::MouseClick(_) => "MOUSE_CLICK",
            Message::KeyPress(_) => "KEY_PRESS",
            Message::MediaCmd(_) => "MEDIA_CMD",
            Message::PowerCmd(_) => "POWER_CMD",
            Message::GamepadInput(_) => "GAMEPAD_INPUT",
            Message::CursorPos(_) => "CURSOR_POS",
            Message::SystemStats(_) => "SYSTEM_STATS",
            Message::Unknown { tag, .. } => tag,
        }
    }
}

impl From<WireEnvelope> for Message {
    fn from(env: WireEnvelope) -> Self {
        let WireEnvelope { tag, payload } = env;
        match tag.as_str() {
            "MOUSE_MOVE" => Message::MouseMove(payload),
            "MOUSE_CLICK" => Message::MouseClick(payload),
            "KEY_PRESS" => Message::KeyPress(payload),
            "MEDIA_CMD" => Message::MediaCmd(payload),
            "POWER_CMD" => Message::PowerCmd(payload),
            "GAMEPAD_INPUT" => Message::GamepadInput(payload),
            "CURSOR_POS" => match serde_json::from_value(payload.clone()) {
                Ok(pos) => Message::CursorPos(pos),
                Err(e) => {
                    trace!("CURSOR_POS payload did not match {{x,y}}: {e}");
                    Message::Unknown { tag, payload }
                }
            },
            "SYSTEM_STATS" => match serde_json::from_value(payload.clone()) {
                Ok(sample) => Message::SystemStats(sample),
                Err(e) => {
                    trace!("SYSTEM_STATS payload did not match the stats record: {e}");
                    Message::Unknown { tag, payload }
                }
            },
            _ => Message::Unknown { tag, payload },
        }
    }
}

impl From<Message> for WireEnvelope {
    fn from(msg: Message) -> Self {
        let (tag, payload) = match msg {
            Message::MouseMove(payload) => ("MOUSE_MOVE".to_string(), payload),
            Message::MouseClick(payload) => ("MOUSE_CLICK".to_string(), payload),
            Message::KeyPress(payload) => ("KEY_PRESS".to_string(), payload),
            Message::MediaCmd(payload) => ("MEDIA_CMD".to_string(), payload),
            Message::PowerCmd(payload) => ("POWER_CMD".to_string(), payload),
            Message::GamepadInput(payload) => ("GAMEPAD_INPUT".to_string(), payload),
            Message::CursorPos(pos) => (
                "CURSOR_POS".to_string(),
                serde_json::to_value(pos).unwrap_or_default(),
            ),
            Message::SystemStats(sample) => (
                "SYSTEM_STATS".to_string(),
                serde_json::to_value(sample).unwrap_or_default(),
            ),
            Message::Unknown { tag, payload } => (tag, payload),
        };
        WireEnvelope { tag, payload }
    }
}

// ── CursorPos ─────────────────────────────────────────────────────────────────

/// Absolute cursor position as percentages of the PC screen, both axes in
/// `[0, 100]`.
///
/// The `[0, 100]` range is a producer-side contract: build values with
/// [`CursorPos::clamped`] and out-of-range coordinates are pinned to the
/// boundary before they reach the wire. The relay does not re-validate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CursorPos {
    /// Horizontal position, percent of screen width.
    pub x: f64,
    /// Vertical position, percent of screen height.
    pub y: f64,
}

impl CursorPos {
    /// Builds a position with both axes clamped into `[0, 100]`.
    pub fn clamped(x: f64, y: f64) -> Self {
        Self {
            x: x.clamp(0.0, 100.0),
            y: y.clamp(0.0, 100.0),
        }
    }
}

// ── TelemetrySample ───────────────────────────────────────────────────────────

/// One host health sample, recomputed every telemetry tick.
///
/// No history is retained; each tick's sample replaces the last. The wire
/// field names (`cpu`, `ram`, `battery`, `isCharging`) are part of the
/// protocol and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetrySample {
    /// Current CPU load, rounded to a whole percent (0–100).
    pub cpu: u8,
    /// Memory utilization as `round(used / total * 100)` (0–100).
    pub ram: u8,
    /// Battery charge percent. Hosts without a battery report `100.0`.
    pub battery: f32,
    /// Whether the battery is currently charging. `false` without a battery.
    pub is_charging: bool,
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_key_press_serializes_to_exact_wire_shape() {
        let msg = Message::KeyPress(json!("A"));
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"type":"KEY_PRESS","payload":"A"}"#);
    }

    #[test]
    fn test_key_press_deserializes_from_wire_shape() {
        let msg: Message = serde_json::from_str(r#"{"type":"KEY_PRESS","payload":"A"}"#).unwrap();
        assert_eq!(msg, Message::KeyPress(json!("A")));
    }

    #[test]
    fn test_media_cmd_free_form_payload_is_preserved() {
        let msg: Message =
            serde_json::from_str(r#"{"type":"MEDIA_CMD","payload":"play_pause"}"#).unwrap();
        assert_eq!(msg.tag(), "MEDIA_CMD");
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"type":"MEDIA_CMD","payload":"play_pause"}"#);
    }

    #[test]
    fn test_cursor_pos_deserializes_typed() {
        let msg: Message =
            serde_json::from_str(r#"{"type":"CURSOR_POS","payload":{"x":42.5,"y":10.0}}"#).unwrap();
        match msg {
            Message::CursorPos(pos) => {
                assert_eq!(pos.x, 42.5);
                assert_eq!(pos.y, 10.0);
            }
            other => panic!("expected CursorPos, got {other:?}"),
        }
    }

    #[test]
    fn test_stats_wire_field_names_match_protocol() {
        let msg = Message::SystemStats(TelemetrySample {
            cpu: 12,
            ram: 48,
            battery: 87.5,
            is_charging: true,
        });
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""type":"SYSTEM_STATS""#));
        assert!(json.contains(r#""cpu":12"#));
        assert!(json.contains(r#""ram":48"#));
        assert!(json.contains(r#""battery":87.5"#));
        // camelCase on the wire, snake_case in Rust.
        assert!(json.contains(r#""isCharging":true"#));
    }

    #[test]
    fn test_unknown_tag_round_trips_verbatim() {
        let raw = r#"{"type":"FUTURE_THING","payload":{"a":1}}"#;
        let msg: Message = serde_json::from_str(raw).unwrap();
        match &msg {
            Message::Unknown { tag, payload } => {
                assert_eq!(tag, "FUTURE_THING");
                assert_eq!(payload, &json!({"a": 1}));
            }
            other => panic!("expected Unknown, got {other:?}"),
        }
        assert_eq!(serde_json::to_string(&msg).unwrap(), raw);
    }

    #[test]
    fn test_malformed_cursor_payload_degrades_to_unknown() {
        // A CURSOR_POS whose payload is not {x,y}. The relay must still be
        // able to forward it verbatim rather than rejecting the frame.
        let raw = r#"{"type":"CURSOR_POS","payload":"oops"}"#;
        let msg: Message = serde_json::from_str(raw).unwrap();
        match &msg {
            Message::Unknown { tag, payload } => {
                assert_eq!(tag, "CURSOR_POS");
                assert_eq!(payload, &json!("oops"));
            }
            other => panic!("expected Unknown fallback, got {other:?}"),
        }
        assert_eq!(serde_json::to_string(&msg).unwrap(), raw);
    }

    #[test]
    fn test_missing_type_field_is_an_error() {
        let result: Result<Message, _> = serde_json::from_str(r#"{"payload":"A"}"#);
        assert!(result.is_err(), "a frame without a type tag is malformed");
    }

    #[test]
    fn test_missing_payload_defaults_to_null() {
        let msg: Message = serde_json::from_str(r#"{"type":"POWER_CMD"}"#).unwrap();
        assert_eq!(msg, Message::PowerCmd(Value::Null));
    }

    #[test]
    fn test_tag_helper_reports_unknown_tags() {
        let msg = Message::Unknown {
            tag: "MYSTERY".to_string(),
            payload: Value::Null,
        };
        assert_eq!(msg.tag(), "MYSTERY");
    }

    // ── Clamping ─────────────────────────────────────────────────────────────

    #[test]
    fn test_clamped_passes_in_range_values_through() {
        let pos = CursorPos::clamped(50.0, 99.9);
        assert_eq!(pos.x, 50.0);
        assert_eq!(pos.y, 99.9);
    }

    #[test]
    fn test_clamped_keeps_boundary_values() {
        let pos = CursorPos::clamped(0.0, 100.0);
        assert_eq!(pos.x, 0.0);
        assert_eq!(pos.y, 100.0);
    }

    #[test]
    fn test_clamped_pins_out_of_range_values() {
        let pos = CursorPos::clamped(150.0, -20.0);
        assert_eq!(pos.x, 100.0);
        assert_eq!(pos.y, 0.0);
    }
}
