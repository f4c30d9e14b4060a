//! Relay broadcast policy.
//!
//! The relay is a dumb pipe keyed only on "not the sender": an inbound
//! frame from connection S is delivered to every *other* open connection;
//! a telemetry sample is delivered to *all* open connections. Payload
//! contents are never transformed, validated, or authorized; every
//! connected client shares one implicit broadcast domain.
//!
//! Delivery is fire-and-forget. Each attempt yields an explicit
//! [`DeliveryOutcome`]; a failed attempt is logged and never escalated, so
//! one closed peer can neither block nor fail delivery to the rest, and the
//! sender is never told about it.

use std::sync::Arc;

use remotelink_core::protocol::codec::{decode_message, encode_message};
use remotelink_core::{ConnectionId, Message, TelemetrySample};
use tracing::{debug, error, warn};

use crate::application::registry::{ConnectionRegistry, OutboundSender};

// ── Delivery bookkeeping ──────────────────────────────────────────────────────

/// Result of one delivery attempt to one recipient.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The frame was handed to the recipient's outbound channel.
    Delivered,
    /// The recipient's session was gone at delivery time; the frame was
    /// skipped for this recipient only.
    Closed,
}

/// Summary of one broadcast, for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Recipients the broadcast attempted to reach.
    pub attempted: usize,
    /// Recipients whose outbound channel accepted the frame.
    pub delivered: usize,
}

// ── Relay ─────────────────────────────────────────────────────────────────────

/// The message-dispatch policy, holding a shared handle to the registry.
///
/// Cheap to clone; clones share the same registry.
#[derive(Clone)]
pub struct Relay {
    registry: Arc<ConnectionRegistry>,
}

impl Relay {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Handles one inbound frame from `sender_id`.
    ///
    /// A frame that fails to decode is dropped with a local warning. The
    /// sender stays connected, no other peer hears about it, and nothing is
    /// broadcast. A decodable frame is re-serialized once and delivered to
    /// every open connection except the sender.
    ///
    /// Returns `None` when the frame was dropped, otherwise the broadcast
    /// summary.
    pub async fn on_inbound(&self, sender_id: ConnectionId, raw: &str) -> Option<BroadcastReport> {
        let msg = match decode_message(raw) {
            Ok(msg) => msg,
            Err(e) => {
                warn!("dropping malformed frame from {sender_id}: {e}");
                return None;
            }
        };

        let frame = match encode_message(&msg) {
            Ok(frame) => frame,
            Err(e) => {
                error!("failed to re-serialize {} frame: {e}", msg.tag());
                return None;
            }
        };

        let report = self.deliver(&frame, Some(sender_id)).await;
        debug!(
            "relayed {} from {sender_id} to {}/{} peers",
            msg.tag(),
            report.delivered,
            report.attempted
        );
        Some(report)
    }

    /// Broadcasts one telemetry sample to every open connection.
    ///
    /// Telemetry has no client sender, so no connection is excluded. With
    /// no connections open this attempts nothing and raises nothing.
    pub async fn broadcast_stats(&self, sample: TelemetrySample) -> BroadcastReport {
        let msg = Message::SystemStats(sample);
        match encode_message(&msg) {
            Ok(frame) => self.deliver(&frame, None).await,
            Err(e) => {
                error!("failed to serialize stats frame: {e}");
                BroadcastReport::default()
            }
        }
    }

    /// Delivers `frame` to a snapshot of the open connections, skipping
    /// `exclude` if given. Per-recipient failures are isolated: a closed
    /// peer is logged at debug and the iteration continues.
    async fn deliver(&self, frame: &str, exclude: Option<ConnectionId>) -> BroadcastReport {
        let peers = self.registry.snapshot().await;
        let mut report = BroadcastReport::default();

        for (id, outbound) in peers {
            if Some(id) == exclude {
                continue;
            }
            report.attempted += 1;
            match try_deliver(&outbound, frame) {
                DeliveryOutcome::Delivered => report.delivered += 1,
                DeliveryOutcome::Closed => debug!("skipped closed connection {id}"),
            }
        }

        report
    }
}

/// Attempts to hand one frame to one recipient's outbound channel.
///
/// The channel is only written if it is still open at delivery time; a
/// recipient whose session ended between snapshot and delivery is skipped.
fn try_deliver(outbound: &OutboundSender, frame: &str) -> DeliveryOutcome {
    if outbound.is_closed() {
        return DeliveryOutcome::Closed;
    }
    match outbound.send(frame.to_string()) {
        Ok(()) => DeliveryOutcome::Delivered,
        Err(_) => DeliveryOutcome::Closed,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
