//! Transport server: accept loop and per-session task management.
//!
//! One TCP port carries both halves of the product:
//!
//! 1. WebSocket upgrade requests become relay sessions. There is no
//!    handshake beyond the upgrade itself; the first successful accept is
//!    immediately live, with no capability negotiation or versioning.
//! 2. Any other HTTP request is handed to the static-file responder, which
//!    serves the client bundle.
//!
//! Per connection the server runs two tasks: a reader that feeds inbound
//! text frames to the relay, and a writer that drains the session's
//! outbound channel into the WebSocket sink. Frames from one sender are
//! therefore delivered to each peer in the order received; there is no
//! ordering across senders.
//!
//! A session's registry entry is removed when either task ends, whichever
//! way it ends: peer close, transport error, or server shutdown all take
//! the same path.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::{
    accept_async,
    tungstenite::{Error as WsError, Message as WsMessage},
};
use tracing::{debug, error, info, warn};

use crate::application::registry::ConnectionRegistry;
use crate::application::relay::Relay;
use crate::domain::config::ServerConfig;
use crate::infrastructure::static_files::serve_static;

/// Longest we wait for a client to finish sending its request head before
/// giving up on the connection.
const REQUEST_HEAD_TIMEOUT: Duration = Duration::from_secs(5);

// ── Public API ────────────────────────────────────────────────────────────────

/// Binds the server's TCP listener.
///
/// Kept separate from [`run_server`] so callers (and tests) can learn the
/// bound address before the accept loop starts; binding to port 0 yields
/// an ephemeral port.
///
/// # Errors
///
/// Returns an error if the port cannot be bound (already in use, or the
/// process lacks permission). This is fatal: the server cannot run without
/// its port, and `main` exits non-zero with this context attached.
pub async fn bind_server(config: &ServerConfig) -> anyhow::Result<TcpListener> {
    TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind listener on {}", config.bind_addr))
}

/// Runs the accept loop until `running` is cleared.
///
/// Each accepted connection is handed off to a dedicated Tokio task so one
/// slow client never blocks others. The loop polls the shutdown flag
/// between accept attempts.
pub async fn run_server(
    listener: TcpListener,
    config: ServerConfig,
    registry: Arc<ConnectionRegistry>,
    relay: Relay,
    running: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    info!(
        "relay listening on {}",
        listener.local_addr().context("listener has no local addr")?
    );

    let config = Arc::new(config);

    loop {
        if !running.load(Ordering::Relaxed) {
            info!("shutdown flag set; stopping accept loop");
            break;
        }

        // Short timeout so the loop can re-check the flag while idle.
        let accept_result = timeout(Duration::from_millis(200), listener.accept()).await;

        match accept_result {
            Ok(Ok((stream, peer_addr))) => {
                debug!("new connection from {peer_addr}");
                let cfg = Arc::clone(&config);
                let registry = Arc::clone(&registry);
                let relay = relay.clone();
                tokio::spawn(async move {
                    handle_connection(stream, peer_addr, cfg, registry, relay).await;
                });
            }
            Ok(Err(e)) => {
                // Transient accept error (e.g. file descriptor exhaustion).
                // Keep serving the connections we already have.
                error!("accept error: {e}");
            }
            Err(_) => {
                // Timeout with no new connection; loop back to check the flag.
            }
        }
    }

    Ok(())
}

// ── Per-connection handling ───────────────────────────────────────────────────

/// Outer handler for one TCP connection: routes it, then logs the outcome.
async fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    config: Arc<ServerConfig>,
    registry: Arc<ConnectionRegistry>,
    relay: Relay,
) {
    match dispatch_connection(stream, peer_addr, config, registry, relay).await {
        Ok(()) => debug!("connection {peer_addr} closed"),
        Err(e) => warn!("connection {peer_addr} closed with error: {e:#}"),
    }
}

/// Decides whether a fresh connection is a WebSocket upgrade or a plain
/// file request, without consuming any bytes: the head is only peeked, so
/// the upgrade handshake (or the file responder) still sees the full
/// request.
async fn dispatch_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    config: Arc<ServerConfig>,
    registry: Arc<ConnectionRegistry>,
    relay: Relay,
) -> anyhow::Result<()> {
    let mut head = [0u8; 1024];
    let n = timeout(REQUEST_HEAD_TIMEOUT, peek_request_head(&stream, &mut head))
        .await
        .with_context(|| format!("{peer_addr} sent no complete request head"))?
        .context("failed to peek request head")?;

    if n == 0 {
        // Connected and went away without sending anything.
        return Ok(());
    }

    if is_websocket_upgrade(&head[..n]) {
        run_ws_session(stream, peer_addr, registry, relay).await
    } else {
        serve_static(stream, &config.static_dir).await
    }
}

/// Peeks until the header block is complete (`\r\n\r\n`), the buffer is
/// full, or the peer closes. Routing on a partially-arrived head could
/// misclassify an upgrade request as a file request.
async fn peek_request_head(stream: &TcpStream, buf: &mut [u8]) -> std::io::Result<usize> {
    loop {
        let n = stream.peek(buf).await?;
        let complete = buf[..n].windows(4).any(|w| w == b"\r\n\r\n");
        if n == 0 || complete || n == buf.len() {
            return Ok(n);
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Returns true if the request head carries an `Upgrade: websocket` header.
fn is_websocket_upgrade(head: &[u8]) -> bool {
    let text = String::from_utf8_lossy(head);
    text.lines().any(|line| {
        let mut parts = line.splitn(2, ':');
        matches!(
            (parts.next(), parts.next()),
            (Some(name), Some(value))
                if name.trim().eq_ignore_ascii_case("upgrade")
                    && value.trim().eq_ignore_ascii_case("websocket")
        )
    })
}

// ── Relay session ─────────────────────────────────────────────────────────────

/// Runs the complete lifecycle of one relay session.
///
/// 1. Completes the WebSocket upgrade handshake.
/// 2. Registers the connection; from here on it receives broadcasts.
/// 3. Runs the writer task (outbound channel → sink) and the reader loop
///    (inbound frames → relay) until either side finishes.
/// 4. Unregisters the connection on the way out, whatever happened.
async fn run_ws_session(
    stream: TcpStream,
    peer_addr: SocketAddr,
    registry: Arc<ConnectionRegistry>,
    relay: Relay,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(stream)
        .await
        .with_context(|| format!("WebSocket handshake failed with {peer_addr}"))?;

    let (mut ws_tx, mut ws_rx) = ws_stream.split();

    // The writer task is the only owner of the sink; broadcasts reach it
    // through this channel. The registry holds the sending half.
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();
    let id = registry.register(outbound_tx).await;

    let mut writer_task = tokio::spawn(async move {
        while let Some(frame) = outbound_rx.recv().await {
            if ws_tx.send(WsMessage::Text(frame)).await.is_err() {
                debug!("connection {id}: send failed (peer gone)");
                break;
            }
        }
    });

    let mut reader_task = tokio::spawn(async move {
        loop {
            let ws_msg = match ws_rx.next().await {
                Some(Ok(msg)) => msg,
                Some(Err(WsError::ConnectionClosed | WsError::Protocol(_))) => {
                    debug!("connection {id}: peer closed");
                    break;
                }
                Some(Err(e)) => {
                    warn!("connection {id}: WebSocket error: {e}");
                    break;
                }
                None => {
                    debug!("connection {id}: stream ended");
                    break;
                }
            };

            match ws_msg {
                WsMessage::Text(raw) => {
                    // The relay drops malformed frames internally; a bad
                    // frame never ends the session.
                    relay.on_inbound(id, &raw).await;
                }
                WsMessage::Binary(_) => {
                    // The protocol is JSON text only.
                    warn!("connection {id}: unexpected binary frame (ignored)");
                }
                WsMessage::Ping(data) => {
                    // tokio-tungstenite answers the pong on the next sink
                    // write; nothing to do here.
                    debug!("connection {id}: ping ({} bytes)", data.len());
                }
                WsMessage::Pong(_) => {
                    debug!("connection {id}: pong");
                }
                WsMessage::Close(_) => {
                    debug!("connection {id}: close frame");
                    break;
                }
                WsMessage::Frame(_) => {
                    debug!("connection {id}: raw frame (ignored)");
                }
            }
        }
    });

    // Whichever task finishes first ends the session; the other is
    // aborted rather than left running against a dead socket.
    tokio::select! {
        _ = &mut writer_task => {
            debug!("connection {id}: writer task ended");
            reader_task.abort();
        }
        _ = &mut reader_task => {
            debug!("connection {id}: reader task ended");
            writer_task.abort();
        }
    }

    registry.unregister(id).await;
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
