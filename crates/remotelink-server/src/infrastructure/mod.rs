//! Infrastructure layer for remotelink-server.
//!
//! Everything that touches the outside world lives here: the TCP/WebSocket
//! accept loop, the host sensor probe, and the static-file responder.
//!
//! # Responsibilities
//!
//! - Binding the TCP listener and accepting connections
//! - Performing the WebSocket HTTP upgrade handshake
//! - Routing non-upgrade requests to the static-file responder
//! - Spawning per-session reader/writer Tokio tasks
//! - Gathering CPU, memory, and battery readings from the host
//!
//! # What does NOT belong here?
//!
//! - Broadcast policy and the registry (application layer)
//! - Wire message types (remotelink-core)
//! - Configuration parsing (main.rs)

pub mod host_stats;
pub mod static_files;
pub mod ws_server;

// Re-export the primary entry points so `main.rs` can call them concisely.
pub use host_stats::SystemProbe;
pub use ws_server::{bind_server, run_server};
