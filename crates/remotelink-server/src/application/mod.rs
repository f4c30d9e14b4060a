//! Application layer for remotelink-server.
//!
//! Policy, not plumbing: this layer decides *who* receives *what*: the
//! connection registry, the all-but-sender relay rule, and the telemetry
//! tick loop. It never touches sockets; delivery happens through per-session
//! outbound channels that the infrastructure layer drains into the network.

pub mod registry;
pub mod relay;
pub mod telemetry;

pub use registry::ConnectionRegistry;
pub use relay::{BroadcastReport, Relay};
pub use telemetry::{run_stats_loop, HostProbe, ProbeError};
