//! Translation of raw runtime counters into usage figures.

use serde::{Deserialize, Serialize};

/// Received/transmitted byte counters of one network interface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InterfaceCounters {
    pub rx_bytes: u64,
    pub tx_bytes: u64,
}

/// A single stats sample as reported by the runtime.
///
/// CPU counters are cumulative; `pre*` fields hold the previous sample.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub cpu_total_usage: u64,
    pub precpu_total_usage: u64,
    pub system_cpu_usage: Option<u64>,
    pub presystem_cpu_usage: Option<u64>,
    pub online_cpus: Option<u64>,
    pub percpu_count: Option<usize>,
    pub memory_usage: Option<u64>,
    pub memory_limit: Option<u64>,
    pub networks: Vec<InterfaceCounters>,
}

impl StatsSnapshot {
    /// Number of CPUs the usage is spread over, never less than one.
    #[must_use]
    pub fn cpu_count(&self) -> u64 {
        self.online_cpus
            .filter(|n| *n > 0)
            .or_else(|| self.percpu_count.filter(|n| *n > 0).map(|n| n as u64))
            .unwrap_or(1)
    }
}

/// Resource usage of a container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerStats {
    pub container_id: String,
    pub cpu_percent: f64,
    pub memory_usage: u64,
    pub memory_limit: u64,
    pub memory_percent: f64,
    pub network_rx_bytes: u64,
    pub network_tx_bytes: u64,
}

impl ContainerStats {
    /// Computes usage figures from a runtime sample.
    #[must_use]
    pub fn from_snapshot(container_id: impl Into<String>, snapshot: &StatsSnapshot) -> Self {
        let cpu_delta = snapshot
            .cpu_total_usage
            .saturating_sub(snapshot.precpu_total_usage);
        let system_delta = snapshot
            .system_cpu_usage
            .unwrap_or(0)
            .saturating_sub(snapshot.presystem_cpu_usage.unwrap_or(0));
        let memory_usage = snapshot.memory_usage.unwrap_or(0);
        let memory_limit = snapshot.memory_limit.unwrap_or(0);
        let (rx, tx) = network_totals(&snapshot.networks);

        Self {
            container_id: container_id.into(),
            cpu_percent: round2(cpu_percent(cpu_delta, system_delta, snapshot.cpu_count())),
            memory_usage,
            memory_limit,
            memory_percent: round2(memory_percent(memory_usage, memory_limit)),
            network_rx_bytes: rx,
            network_tx_bytes: tx,
        }
    }
}

/// CPU usage in percent of one CPU, scaled by `cpus`.
///
/// Zero deltas yield exactly `0.0`.
#[must_use]
pub fn cpu_percent(cpu_delta: u64, system_delta: u64, cpus: u64) -> f64 {
    if cpu_delta == 0 || system_delta == 0 {
        return 0.0;
    }
    (cpu_delta as f64 / system_delta as f64) * cpus as f64 * 100.0
}

/// Memory usage in percent of the limit; a zero limit yields `0.0`.
#[must_use]
pub fn memory_percent(usage: u64, limit: u64) -> f64 {
    if limit == 0 {
        return 0.0;
    }
    usage as f64 / limit as f64 * 100.0
}

/// Sums received and transmitted bytes across interfaces.
#[must_use]
pub fn network_totals(interfaces: &[InterfaceCounters]) -> (u64, u64) {
    interfaces.iter().fold((0, 0), |(rx, tx), counters| {
        (
            rx.saturating_add(counters.rx_bytes),
            tx.saturating_add(counters.tx_bytes),
        )
    })
}

/// Decodes raw log bytes, replacing invalid UTF-8 sequences.
#[must_use]
pub fn decode_logs(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
