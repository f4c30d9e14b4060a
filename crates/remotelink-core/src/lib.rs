//! # remotelink-core
//!
//! Shared library for RemoteLink containing the wire protocol types and the
//! JSON codec.
//!
//! RemoteLink turns a phone into a remote control for a PC: the phone (the
//! "Remote") sends input commands (pointer movement, key presses, media and
//! power commands) and the PC pushes back cursor position and periodic
//! system-health telemetry. A small relay server fans messages out between
//! every connected client.
//!
//! This crate is the shared foundation used by the relay server and by any
//! native client. It defines:
//!
//! - **`protocol`** – How frames travel over the wire. Every frame is one
//!   UTF-8 JSON document `{"type": <TAG>, "payload": <any>}`; the `type`
//!   tag alone determines the payload shape.
//!
//! It has zero dependencies on OS APIs, sockets, or an async runtime.

pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `remotelink_core::Message` instead of the longer path.
pub use protocol::codec::{decode_message, encode_message, ProtocolError};
pub use protocol::messages::{CursorPos, Message, TelemetrySample};

use uuid::Uuid;

/// Identifier for one open client connection.
///
/// Generated per accept (UUID v4), so it only needs to disambiguate
/// concurrently-open sockets; collisions across the process lifetime are
/// tolerable and, with v4 UUIDs, effectively impossible.
pub type ConnectionId = Uuid;
