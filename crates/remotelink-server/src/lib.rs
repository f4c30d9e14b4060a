//! remotelink-server library crate.
//!
//! This crate provides the RemoteLink relay: a single-port server that
//! accepts WebSocket connections from Remote and PC clients, fans every
//! inbound frame out to all *other* connected clients, and periodically
//! samples host telemetry (CPU, RAM, battery) to broadcast to *all* clients.
//! The same port answers plain HTTP GETs with the static client bundle.
//!
//! # Architecture
//!
//! ```text
//! Remote / PC clients (JSON over WebSocket)
//!         ↕
//! [remotelink-server]
//!   ├── domain/           Pure types: ServerConfig
//!   ├── application/      Relay policy, connection registry, telemetry loop
//!   └── infrastructure/
//!         ├── ws_server/     Accept loop, per-session tasks (tokio-tungstenite)
//!         ├── host_stats/    sysinfo + starship-battery probe
//!         └── static_files/  Pass-through file responder for the UI bundle
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no external dependencies (no I/O, no async, no frameworks).
//! - `application` depends on `domain`, `remotelink-core`, and `tokio::sync`
//!   primitives only; policy, never sockets.
//! - `infrastructure` depends on all other layers plus `tokio` and
//!   `tungstenite`, and is the only layer that touches the network or host
//!   sensors.

/// Domain layer: pure configuration types (no I/O).
pub mod domain;

/// Application layer: relay policy, registry, and the telemetry tick loop.
pub mod application;

/// Infrastructure layer: WebSocket server, host sensors, static files.
pub mod infrastructure;
