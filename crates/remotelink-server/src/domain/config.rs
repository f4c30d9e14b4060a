//! Server configuration types.
//!
//! [`ServerConfig`] is the single source of truth for all runtime settings.
//! It is constructed from CLI arguments in `main.rs` (preferred for
//! production) or from defaults (local development and tests). The struct
//! itself never reads the environment; the infrastructure layer populates
//! it.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// All runtime configuration for the relay server.
///
/// Build this once at startup and wrap it in an `Arc` so it can be shared
/// cheaply across all session tasks.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// The address and port the server binds to.
    ///
    /// One port carries both the WebSocket relay and plain HTTP requests
    /// for the static client bundle. `0.0.0.0` accepts connections from any
    /// interface; `127.0.0.1` confines the relay to the local host. With
    /// no authentication in the protocol, the bind address is the only
    /// operator control over who can join the broadcast domain.
    pub bind_addr: SocketAddr,

    /// Interval between host telemetry samples.
    ///
    /// Each tick gathers CPU, memory, and battery concurrently and
    /// broadcasts one `SYSTEM_STATS` frame to every connected client.
    pub stats_interval: Duration,

    /// Directory holding the static client bundle (the built PWA).
    ///
    /// Unknown paths fall back to `index.html` in this directory so
    /// client-side routing works after a page refresh.
    pub static_dir: PathBuf,
}

impl Default for ServerConfig {
    /// Returns a `ServerConfig` matching the reference deployment:
    ///
    /// | Field          | Default       |
    /// |----------------|---------------|
    /// | bind_addr      | `0.0.0.0:3000`|
    /// | stats_interval | 2000 ms       |
    /// | static_dir     | `dist`        |
    fn default() -> Self {
        Self {
            // Known-valid socket address literal.
            bind_addr: "0.0.0.0:3000".parse().unwrap(),
            stats_interval: Duration::from_millis(2000),
            static_dir: PathBuf::from("dist"),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
