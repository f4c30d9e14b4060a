//! RemoteLink relay server entry point.
//!
//! This binary accepts WebSocket connections from Remote and PC clients on
//! one port, relays every inbound frame to all other connected clients,
//! broadcasts periodic host telemetry, and serves the static client bundle
//! over plain HTTP on the same port.
//!
//! # Usage
//!
//! ```text
//! remotelink-server [OPTIONS]
//!
//! Options:
//!   --port              <PORT>  Listener port [default: 3000]
//!   --bind              <ADDR>  Bind address [default: 0.0.0.0]
//!   --stats-interval-ms <MS>    Telemetry period [default: 2000]
//!   --static-dir        <DIR>   Client bundle directory [default: dist]
//! ```
//!
//! # Environment variable overrides
//!
//! CLI args take precedence when both are present.
//!
//! | Variable                         | Default   |
//! |----------------------------------|-----------|
//! | `REMOTELINK_PORT`                | `3000`    |
//! | `REMOTELINK_BIND`                | `0.0.0.0` |
//! | `REMOTELINK_STATS_INTERVAL_MS`   | `2000`    |
//! | `REMOTELINK_STATIC_DIR`          | `dist`    |
//!
//! `RUST_LOG` controls log filtering (e.g. `RUST_LOG=debug`).

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use remotelink_server::application::telemetry::run_stats_loop;
use remotelink_server::application::{ConnectionRegistry, Relay};
use remotelink_server::domain::ServerConfig;
use remotelink_server::infrastructure::{bind_server, run_server, SystemProbe};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// RemoteLink relay server.
///
/// All connected clients share one broadcast domain with no
/// authentication; bind to 127.0.0.1 to confine the relay to this host.
#[derive(Debug, Parser)]
#[command(
    name = "remotelink-server",
    about = "WebSocket relay and telemetry server for RemoteLink remote control",
    version
)]
struct Cli {
    /// TCP port to listen on (WebSocket relay + static bundle).
    #[arg(long, default_value_t = 3000, env = "REMOTELINK_PORT")]
    port: u16,

    /// IP address to bind to.
    ///
    /// `0.0.0.0` accepts connections from any interface; `127.0.0.1`
    /// accepts only local connections.
    #[arg(long, default_value = "0.0.0.0", env = "REMOTELINK_BIND")]
    bind: String,

    /// Milliseconds between host telemetry samples.
    #[arg(long, default_value_t = 2000, env = "REMOTELINK_STATS_INTERVAL_MS")]
    stats_interval_ms: u64,

    /// Directory holding the built client bundle.
    #[arg(long, default_value = "dist", env = "REMOTELINK_STATIC_DIR")]
    static_dir: PathBuf,
}

impl Cli {
    /// Converts the parsed CLI arguments into a [`ServerConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error if `--bind` is not a valid IP address.
    fn into_server_config(self) -> anyhow::Result<ServerConfig> {
        let bind_addr: SocketAddr = format!("{}:{}", self.bind, self.port)
            .parse()
            .with_context(|| format!("invalid bind address: '{}:{}'", self.bind, self.port))?;

        Ok(ServerConfig {
            bind_addr,
            stats_interval: Duration::from_millis(self.stats_interval_ms),
            static_dir: self.static_dir,
        })
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.into_server_config()?;

    info!(
        "RemoteLink relay starting: addr={}, stats every {:?}",
        config.bind_addr, config.stats_interval
    );

    // Shared shutdown flag, set by Ctrl+C. The accept loop and the
    // telemetry loop both poll it and wind down cleanly.
    let running = Arc::new(AtomicBool::new(true));
    let running_signal = Arc::clone(&running);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C, shutting down");
                running_signal.store(false, Ordering::Relaxed);
            }
            Err(e) => {
                tracing::error!("failed to listen for Ctrl+C signal: {e}");
            }
        }
    });

    // The registry is owned here and handed to both the server (which
    // mutates it on accept/close) and the relay (which reads snapshots).
    let registry = Arc::new(ConnectionRegistry::new());
    let relay = Relay::new(Arc::clone(&registry));

    // Bind before spawning anything: a taken port is an operator error and
    // the process must exit non-zero instead of limping along.
    let listener = bind_server(&config).await?;

    let stats_task = tokio::spawn(run_stats_loop(
        SystemProbe::new(),
        relay.clone(),
        config.stats_interval,
        Arc::clone(&running),
    ));

    run_server(listener, config, registry, relay, running).await?;

    stats_task.abort();
    info!("RemoteLink relay stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
