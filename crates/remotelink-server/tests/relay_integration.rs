//! Integration tests for the relay over real WebSocket connections.
//!
//! # Purpose
//!
//! These tests exercise the server through its *public* surface the same
//! way browser clients do: open a TCP connection, complete the WebSocket
//! upgrade, exchange JSON text frames. They verify:
//!
//! - The happy path: a frame from one client reaches every other client
//!   exactly once, and never echoes back to the sender.
//! - The error path: a non-JSON frame neither disconnects its sender nor
//!   produces any broadcast.
//! - Telemetry fan-out: every connected client receives stats frames,
//!   including a client that connects between two ticks.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use remotelink_core::TelemetrySample;
use remotelink_server::application::telemetry::{run_stats_loop, HostProbe, ProbeError};
use remotelink_server::application::{ConnectionRegistry, Relay};
use remotelink_server::domain::ServerConfig;
use remotelink_server::infrastructure::run_server;

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Everything a test needs to talk to a freshly started relay.
struct TestRelay {
    addr: SocketAddr,
    registry: Arc<ConnectionRegistry>,
    relay: Relay,
    running: Arc<AtomicBool>,
}

impl Drop for TestRelay {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
    }
}

/// Starts a relay on an ephemeral loopback port.
async fn start_relay() -> TestRelay {
    let config = ServerConfig {
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        ..ServerConfig::default()
    };
    let listener = TcpListener::bind(config.bind_addr).await.expect("bind");
    let addr = listener.local_addr().expect("local addr");

    let registry = Arc::new(ConnectionRegistry::new());
    let relay = Relay::new(Arc::clone(&registry));
    let running = Arc::new(AtomicBool::new(true));

    tokio::spawn(run_server(
        listener,
        config,
        Arc::clone(&registry),
        relay.clone(),
        Arc::clone(&running),
    ));

    TestRelay {
        addr,
        registry,
        relay,
        running,
    }
}

async fn connect_client(addr: SocketAddr) -> Client {
    let (ws, _resp) = connect_async(format!("ws://{addr}"))
        .await
        .expect("WebSocket connect");
    ws
}

/// Waits until the registry sees `n` open connections, so a test never
/// broadcasts before all its clients are registered.
async fn wait_for_clients(registry: &ConnectionRegistry, n: usize) {
    timeout(Duration::from_secs(2), async {
        while registry.open_count().await != n {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("{n} clients never registered"));
}

/// Receives the next text frame within two seconds.
async fn recv_text(client: &mut Client) -> String {
    let msg = timeout(Duration::from_secs(2), client.next())
        .await
        .expect("a frame within the deadline")
        .expect("stream still open")
        .expect("no transport error");
    match msg {
        WsMessage::Text(text) => text,
        other => panic!("expected a text frame, got {other:?}"),
    }
}

/// Asserts that no frame arrives within `quiet`; used to prove exclusion.
async fn assert_silent(client: &mut Client, quiet: Duration) {
    let result = timeout(quiet, client.next()).await;
    assert!(result.is_err(), "unexpected frame: {result:?}");
}

// ── Relay fan-out ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_key_press_reaches_all_other_clients_and_never_the_sender() {
    let server = start_relay().await;
    let mut c1 = connect_client(server.addr).await;
    let mut c2 = connect_client(server.addr).await;
    let mut c3 = connect_client(server.addr).await;
    wait_for_clients(&server.registry, 3).await;

    let frame = r#"{"type":"KEY_PRESS","payload":"A"}"#;
    c1.send(WsMessage::Text(frame.to_string()))
        .await
        .expect("send");

    // C2 and C3 each receive exactly this frame.
    assert_eq!(recv_text(&mut c2).await, frame);
    assert_eq!(recv_text(&mut c3).await, frame);

    // C1 receives nothing from its own send.
    assert_silent(&mut c1, Duration::from_millis(300)).await;
}

#[tokio::test]
async fn test_two_clients_relay_in_both_directions() {
    let server = start_relay().await;
    let mut remote = connect_client(server.addr).await;
    let mut pc = connect_client(server.addr).await;
    wait_for_clients(&server.registry, 2).await;

    let cursor = r#"{"type":"CURSOR_POS","payload":{"x":50.0,"y":25.0}}"#;
    remote
        .send(WsMessage::Text(cursor.to_string()))
        .await
        .expect("send");
    assert_eq!(recv_text(&mut pc).await, cursor);

    let media = r#"{"type":"MEDIA_CMD","payload":"play_pause"}"#;
    pc.send(WsMessage::Text(media.to_string()))
        .await
        .expect("send");
    assert_eq!(recv_text(&mut remote).await, media);
}

#[tokio::test]
async fn test_disconnected_client_is_removed_from_the_broadcast_domain() {
    let server = start_relay().await;
    let mut c1 = connect_client(server.addr).await;
    let c2 = connect_client(server.addr).await;
    let mut c3 = connect_client(server.addr).await;
    wait_for_clients(&server.registry, 3).await;

    drop(c2);
    wait_for_clients(&server.registry, 2).await;

    let frame = r#"{"type":"POWER_CMD","payload":"sleep"}"#;
    c1.send(WsMessage::Text(frame.to_string()))
        .await
        .expect("send");
    assert_eq!(recv_text(&mut c3).await, frame);
}

// ── Malformed input ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_malformed_frame_is_dropped_and_the_sender_stays_connected() {
    let server = start_relay().await;
    let mut c1 = connect_client(server.addr).await;
    let mut c2 = connect_client(server.addr).await;
    wait_for_clients(&server.registry, 2).await;

    c1.send(WsMessage::Text("definitely not json".to_string()))
        .await
        .expect("send");

    // Nothing is broadcast for the garbage frame.
    assert_silent(&mut c2, Duration::from_millis(300)).await;

    // The sender was not disconnected: a valid frame still relays.
    let frame = r#"{"type":"KEY_PRESS","payload":"B"}"#;
    c1.send(WsMessage::Text(frame.to_string()))
        .await
        .expect("send after garbage");
    assert_eq!(recv_text(&mut c2).await, frame);
}

// ── Telemetry fan-out ─────────────────────────────────────────────────────────

/// Probe returning the same fixed sample every tick.
struct FixedProbe(TelemetrySample);

impl HostProbe for FixedProbe {
    fn sample(&self) -> impl Future<Output = Result<TelemetrySample, ProbeError>> + Send {
        let sample = self.0;
        async move { Ok(sample) }
    }
}

#[tokio::test]
async fn test_stats_ticks_reach_every_client_including_late_joiners() {
    let server = start_relay().await;
    let running = Arc::new(AtomicBool::new(true));
    tokio::spawn(run_stats_loop(
        FixedProbe(TelemetrySample {
            cpu: 7,
            ram: 55,
            battery: 100.0,
            is_charging: false,
        }),
        server.relay.clone(),
        Duration::from_millis(25),
        Arc::clone(&running),
    ));

    let mut c1 = connect_client(server.addr).await;
    let mut c2 = connect_client(server.addr).await;
    wait_for_clients(&server.registry, 2).await;

    for client in [&mut c1, &mut c2] {
        let frame = recv_text(client).await;
        let value: serde_json::Value = serde_json::from_str(&frame).expect("stats frame is JSON");
        assert_eq!(value["type"], "SYSTEM_STATS");
        assert_eq!(value["payload"]["cpu"], 7);
        assert_eq!(value["payload"]["ram"], 55);
        assert_eq!(value["payload"]["isCharging"], false);
    }

    // A client connecting between ticks receives the next tick.
    let mut late = connect_client(server.addr).await;
    wait_for_clients(&server.registry, 3).await;
    let frame = recv_text(&mut late).await;
    assert!(frame.contains(r#""type":"SYSTEM_STATS""#));

    running.store(false, Ordering::Relaxed);
}
