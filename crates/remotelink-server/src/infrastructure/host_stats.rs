//! Host sensor probe: CPU load, memory utilization, battery state.
//!
//! One tick gathers all three concurrently and fails as a whole if any
//! lookup fails; the sampler never broadcasts a partial sample. The
//! lookups are synchronous OS queries (and the CPU reading needs a short
//! measurement window), so each runs on the blocking thread pool and the
//! three are joined with fail-fast semantics.
//!
//! Hosts without battery hardware report a full, non-charging battery so
//! the desktop case looks healthy rather than erroring every tick.

use std::future::Future;

use remotelink_core::TelemetrySample;
use starship_battery::units::ratio::percent;
use starship_battery::{Manager, State};
use sysinfo::System;
use tokio::task::spawn_blocking;

use crate::application::telemetry::{HostProbe, ProbeError};

/// Production [`HostProbe`] backed by `sysinfo` and `starship-battery`.
#[derive(Debug, Default)]
pub struct SystemProbe;

impl SystemProbe {
    pub fn new() -> Self {
        Self
    }
}

impl HostProbe for SystemProbe {
    fn sample(&self) -> impl Future<Output = Result<TelemetrySample, ProbeError>> + Send {
        async {
            let cpu_task = spawn_blocking(sample_cpu);
            let mem_task = spawn_blocking(sample_memory);
            let battery_task = spawn_blocking(sample_battery);

            // Fail-fast join: the first lookup to fail abandons the tick.
            let (cpu, ram, battery) = tokio::try_join!(cpu_task, mem_task, battery_task)?;
            let cpu = cpu?;
            let ram = ram?;
            let (battery, is_charging) = battery?;

            Ok(TelemetrySample {
                cpu,
                ram,
                battery,
                is_charging,
            })
        }
    }
}

// ── Individual lookups ────────────────────────────────────────────────────────

/// Current overall CPU load, rounded to a whole percent.
///
/// sysinfo computes load as the delta between two refreshes, so one
/// measurement window of `MINIMUM_CPU_UPDATE_INTERVAL` is spent here. This
/// runs on the blocking pool; the sleep never stalls the runtime.
fn sample_cpu() -> Result<u8, ProbeError> {
    let mut sys = System::new();
    sys.refresh_cpu_usage();
    std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
    sys.refresh_cpu_usage();

    let load = sys.global_cpu_usage();
    if !load.is_finite() {
        return Err(ProbeError::Cpu(format!("non-finite load reading: {load}")));
    }
    Ok(rounded_percent(load))
}

/// Memory utilization as `round(used / total * 100)`.
fn sample_memory() -> Result<u8, ProbeError> {
    let mut sys = System::new();
    sys.refresh_memory();
    memory_percent(sys.used_memory(), sys.total_memory())
}

/// Battery charge percent and charging flag.
///
/// `None` batteries (a desktop) is the healthy fallback case; an error
/// from the battery manager is a real failure and abandons the tick.
fn sample_battery() -> Result<(f32, bool), ProbeError> {
    let manager = Manager::new().map_err(|e| ProbeError::Battery(e.to_string()))?;
    let mut batteries = manager
        .batteries()
        .map_err(|e| ProbeError::Battery(e.to_string()))?;

    match batteries.next() {
        None => Ok((100.0, false)),
        Some(Err(e)) => Err(ProbeError::Battery(e.to_string())),
        Some(Ok(battery)) => {
            let charge = battery.state_of_charge().get::<percent>();
            let is_charging = battery.state() == State::Charging;
            Ok((charge, is_charging))
        }
    }
}

fn memory_percent(used: u64, total: u64) -> Result<u8, ProbeError> {
    if total == 0 {
        return Err(ProbeError::Memory("total memory reported as zero".into()));
    }
    Ok(rounded_percent((used as f64 / total as f64 * 100.0) as f32))
}

fn rounded_percent(value: f32) -> u8 {
    value.round().clamp(0.0, 100.0) as u8
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_percent_rounds_to_nearest() {
        assert_eq!(memory_percent(1, 3).unwrap(), 33);
        assert_eq!(memory_percent(2, 3).unwrap(), 67);
    }

    #[test]
    fn test_memory_percent_boundaries() {
        assert_eq!(memory_percent(0, 8).unwrap(), 0);
        assert_eq!(memory_percent(8, 8).unwrap(), 100);
    }

    #[test]
    fn test_memory_percent_rejects_zero_total() {
        assert!(memory_percent(1, 0).is_err());
    }

    #[test]
    fn test_rounded_percent_clamps_out_of_range_readings() {
        assert_eq!(rounded_percent(-3.0), 0);
        assert_eq!(rounded_percent(104.2), 100);
        assert_eq!(rounded_percent(49.5), 50);
    }
}
