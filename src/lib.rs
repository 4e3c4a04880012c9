pub mod actors;
pub mod alerts;
#[cfg(feature = "api")]
pub mod api;
pub mod config;
pub mod monitor;
pub mod sampler;
pub mod settings;
pub mod storage;
pub mod store;
pub mod util;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One normalized observation of the host at a single instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub cpu_percent: f32,
    pub memory: MemoryUsage,
    /// Usage per mounted filesystem, keyed by mount point
    pub disks: BTreeMap<String, DiskUsage>,
    pub network: NetworkThroughput,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MemoryUsage {
    pub used_bytes: u64,
    pub total_bytes: u64,
    pub percent: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiskUsage {
    pub used_bytes: u64,
    pub total_bytes: u64,
    pub percent: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkThroughput {
    pub rx_bytes_per_sec: u64,
    pub tx_bytes_per_sec: u64,
    pub rx_total_bytes: u64,
    pub tx_total_bytes: u64,
}

/// `used / total * 100`, or 0 for an empty total.
pub fn usage_percent(used: u64, total: u64) -> f32 {
    if total == 0 {
        return 0.0;
    }
    ((used as f64 / total as f64) * 100.0) as f32
}

impl MemoryUsage {
    pub fn new(used_bytes: u64, total_bytes: u64) -> Self {
        let used_bytes = used_bytes.min(total_bytes);
        Self {
            used_bytes,
            total_bytes,
            percent: usage_percent(used_bytes, total_bytes),
        }
    }
}

impl DiskUsage {
    pub fn new(used_bytes: u64, total_bytes: u64) -> Self {
        let used_bytes = used_bytes.min(total_bytes);
        Self {
            used_bytes,
            total_bytes,
            percent: usage_percent(used_bytes, total_bytes),
        }
    }
}

impl Sample {
    /// Mount points present in this sample, in order
    pub fn mount_points(&self) -> impl Iterator<Item = &str> {
        self.disks.keys().map(String::as_str)
    }
}
