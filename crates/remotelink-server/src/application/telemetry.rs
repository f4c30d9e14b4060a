//! Telemetry sampling loop.
//!
//! On a fixed period the loop asks a [`HostProbe`] for one
//! [`TelemetrySample`] and hands it to the relay for fan-out. The policy is
//! "silent skip": a failed tick is abandoned whole (no partial sample is
//! ever broadcast) and the failure is logged locally, never escalated. The
//! next tick proceeds independently, so a transient sensor failure can
//! never take the loop down or surface to connected clients.
//!
//! The probe is a trait so the loop can be exercised with a scripted fake;
//! the production implementation lives in
//! [`infrastructure::host_stats`](crate::infrastructure::host_stats).

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use remotelink_core::TelemetrySample;
use thiserror::Error;
use tokio::time::interval;
use tracing::{debug, info};

use crate::application::relay::Relay;

// ── Probe contract ────────────────────────────────────────────────────────────

/// Failure of one telemetry lookup. Any variant abandons the whole tick.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("cpu lookup failed: {0}")]
    Cpu(String),
    #[error("memory lookup failed: {0}")]
    Memory(String),
    #[error("battery lookup failed: {0}")]
    Battery(String),
    /// A blocking lookup task panicked or was cancelled.
    #[error("probe task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Source of host telemetry samples.
///
/// A probe gathers CPU load, memory utilization, and battery state for one
/// tick. An implementation must either return a complete sample or an
/// error, never a partial sample.
pub trait HostProbe: Send + Sync {
    fn sample(&self) -> impl Future<Output = Result<TelemetrySample, ProbeError>> + Send;
}

// ── Tick loop ─────────────────────────────────────────────────────────────────

/// Runs the telemetry loop until `running` is cleared.
///
/// The first sample is taken one full `period` after startup. Each
/// successful sample is broadcast to every open connection; a failed tick
/// is skipped with a debug log and the schedule continues unaffected.
pub async fn run_stats_loop<P: HostProbe>(
    probe: P,
    relay: Relay,
    period: Duration,
    running: Arc<AtomicBool>,
) {
    let mut ticker = interval(period);
    // The first tick of a tokio interval resolves immediately; skip it so
    // the schedule starts one period from now.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        if !running.load(Ordering::Relaxed) {
            info!("shutdown flag set; stopping telemetry loop");
            break;
        }

        match probe.sample().await {
            Ok(sample) => {
                let report = relay.broadcast_stats(sample).await;
                debug!(
                    "stats tick delivered to {}/{} connections",
                    report.delivered, report.attempted
                );
            }
            Err(e) => {
                // Whole tick abandoned; the next one is attempted on schedule.
                debug!("stats tick skipped: {e}");
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
