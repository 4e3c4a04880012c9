//! Host sampling
//!
//! [`SystemSampler`] reads CPU, memory, disks and network counters through
//! `sysinfo` and normalizes them into a [`Sample`]. Sampling is blocking (CPU
//! usage needs two refreshes at least [`MINIMUM_CPU_UPDATE_INTERVAL`] apart),
//! so the scheduler runs it on the blocking thread pool.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Instant;

use chrono::{SubsecRound, Utc};
use sysinfo::{
    CpuRefreshKind, Disks, MINIMUM_CPU_UPDATE_INTERVAL, MemoryRefreshKind, Networks, RefreshKind,
    System,
};
use tracing::{debug, trace};

use crate::{DiskUsage, MemoryUsage, NetworkThroughput, Sample};

#[derive(Debug, Clone, PartialEq)]
pub enum SamplingError {
    /// No usable CPU utilization could be read
    CpuUnavailable(String),
    /// No usable memory figures could be read
    MemoryUnavailable(String),
}

impl fmt::Display for SamplingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SamplingError::CpuUnavailable(msg) => write!(f, "CPU usage unavailable: {msg}"),
            SamplingError::MemoryUnavailable(msg) => write!(f, "Memory usage unavailable: {msg}"),
        }
    }
}

impl std::error::Error for SamplingError {}

/// Source of host samples
///
/// Implementations may block; they are always called off the async workers.
pub trait Sampler: Send + 'static {
    fn sample(&mut self) -> Result<Sample, SamplingError>;
}

/// Raw per-disk reading before normalization
#[derive(Debug, Clone)]
pub struct DiskReading {
    pub mount_point: String,
    pub total_bytes: u64,
    pub available_bytes: u64,
}

/// Normalize disk readings into usage keyed by mount point
///
/// Disks reporting zero capacity are treated as transiently unavailable and
/// omitted. If a mount point shows up twice, the first reading wins.
pub fn normalize_disks(readings: impl IntoIterator<Item = DiskReading>) -> BTreeMap<String, DiskUsage> {
    let mut disks = BTreeMap::new();

    for reading in readings {
        if reading.total_bytes == 0 {
            trace!("skipping zero-capacity disk at {}", reading.mount_point);
            continue;
        }

        let used = reading.total_bytes.saturating_sub(reading.available_bytes);
        disks
            .entry(reading.mount_point)
            .or_insert_with(|| DiskUsage::new(used, reading.total_bytes));
    }

    disks
}

/// Clamp a CPU reading to `[0, 100]`, rejecting values that are not numbers
pub fn normalize_cpu(raw: f32) -> Result<f32, SamplingError> {
    if !raw.is_finite() {
        return Err(SamplingError::CpuUnavailable(format!(
            "reported utilization is {raw}"
        )));
    }
    Ok(raw.clamp(0.0, 100.0))
}

/// Turns cumulative interface counters into per-second rates
#[derive(Debug, Default)]
pub struct ThroughputTracker {
    previous: Option<(Instant, u64, u64)>,
}

impl ThroughputTracker {
    /// Record new cumulative totals observed at `now`
    ///
    /// The first observation has no baseline and reports a rate of zero.
    /// Counter resets (totals going backwards) also report zero.
    pub fn observe(&mut self, now: Instant, rx_total: u64, tx_total: u64) -> NetworkThroughput {
        let (rx_rate, tx_rate) = match self.previous {
            Some((at, prev_rx, prev_tx)) => {
                let elapsed = now.duration_since(at).as_secs_f64();
                if elapsed > 0.0 {
                    (
                        (rx_total.saturating_sub(prev_rx) as f64 / elapsed) as u64,
                        (tx_total.saturating_sub(prev_tx) as f64 / elapsed) as u64,
                    )
                } else {
                    (0, 0)
                }
            }
            None => (0, 0),
        };

        self.previous = Some((now, rx_total, tx_total));

        NetworkThroughput {
            rx_bytes_per_sec: rx_rate,
            tx_bytes_per_sec: tx_rate,
            rx_total_bytes: rx_total,
            tx_total_bytes: tx_total,
        }
    }
}

/// [`Sampler`] backed by the operating system through `sysinfo`
pub struct SystemSampler {
    system: System,
    disks: Disks,
    networks: Networks,
    throughput: ThroughputTracker,
    last_cpu_refresh: Instant,
}

impl SystemSampler {
    pub fn new() -> Self {
        let refresh_kind = RefreshKind::nothing()
            .with_cpu(CpuRefreshKind::everything())
            .with_memory(MemoryRefreshKind::everything());

        let mut system = System::new_with_specifics(refresh_kind);
        system.refresh_cpu_usage();

        debug!("initialized system sampler with {} cpus", system.cpus().len());

        Self {
            system,
            disks: Disks::new_with_refreshed_list(),
            networks: Networks::new_with_refreshed_list(),
            throughput: ThroughputTracker::default(),
            last_cpu_refresh: Instant::now(),
        }
    }

    fn read_cpu(&mut self) -> Result<f32, SamplingError> {
        let since_last = self.last_cpu_refresh.elapsed();
        if since_last < MINIMUM_CPU_UPDATE_INTERVAL {
            std::thread::sleep(MINIMUM_CPU_UPDATE_INTERVAL - since_last);
        }

        self.system.refresh_cpu_usage();
        self.last_cpu_refresh = Instant::now();

        if self.system.cpus().is_empty() {
            return Err(SamplingError::CpuUnavailable(
                "no cpus reported".to_string(),
            ));
        }

        normalize_cpu(self.system.global_cpu_usage())
    }

    fn read_memory(&mut self) -> Result<MemoryUsage, SamplingError> {
        self.system.refresh_memory();

        let total = self.system.total_memory();
        if total == 0 {
            return Err(SamplingError::MemoryUnavailable(
                "total memory reported as 0".to_string(),
            ));
        }

        Ok(MemoryUsage::new(self.system.used_memory(), total))
    }

    fn read_disks(&mut self) -> BTreeMap<String, DiskUsage> {
        // drops disks that are no longer mounted
        self.disks.refresh(true);

        normalize_disks(self.disks.iter().map(|disk| DiskReading {
            mount_point: disk.mount_point().to_string_lossy().to_string(),
            total_bytes: disk.total_space(),
            available_bytes: disk.available_space(),
        }))
    }

    fn read_network(&mut self) -> NetworkThroughput {
        self.networks.refresh(true);

        let (rx_total, tx_total) = self
            .networks
            .values()
            .fold((0u64, 0u64), |(rx, tx), data| {
                (
                    rx.saturating_add(data.total_received()),
                    tx.saturating_add(data.total_transmitted()),
                )
            });

        self.throughput.observe(Instant::now(), rx_total, tx_total)
    }
}

impl Default for SystemSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl Sampler for SystemSampler {
    fn sample(&mut self) -> Result<Sample, SamplingError> {
        let cpu_percent = self.read_cpu()?;
        let memory = self.read_memory()?;
        let disks = self.read_disks();
        let network = self.read_network();

        Ok(Sample {
            // millisecond precision, matching what persistence stores
            timestamp: Utc::now().trunc_subsecs(3),
            cpu_percent,
            memory,
            disks,
            network,
        })
    }
}
