//! Persisted sample layout
//!
//! One row per sample keyed by its timestamp in milliseconds. CPU, memory and
//! network figures are plain columns; disks are a JSON object keyed by mount
//! point, so records with different disk membership sit side by side.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{DiskUsage, MemoryUsage, NetworkThroughput, Sample};

/// A sample as stored by a [`super::StorageBackend`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRecord {
    pub timestamp: DateTime<Utc>,
    pub cpu_percent: f32,
    pub memory_used: u64,
    pub memory_total: u64,
    pub net_rx_per_sec: u64,
    pub net_tx_per_sec: u64,
    pub net_rx_total: u64,
    pub net_tx_total: u64,
    pub disks: BTreeMap<String, DiskUsage>,
}

impl SampleRecord {
    pub fn from_sample(sample: &Sample) -> Self {
        Self {
            timestamp: sample.timestamp,
            cpu_percent: sample.cpu_percent,
            memory_used: sample.memory.used_bytes,
            memory_total: sample.memory.total_bytes,
            net_rx_per_sec: sample.network.rx_bytes_per_sec,
            net_tx_per_sec: sample.network.tx_bytes_per_sec,
            net_rx_total: sample.network.rx_total_bytes,
            net_tx_total: sample.network.tx_total_bytes,
            disks: sample.disks.clone(),
        }
    }

    pub fn into_sample(self) -> Sample {
        Sample {
            timestamp: self.timestamp,
            cpu_percent: self.cpu_percent,
            memory: MemoryUsage::new(self.memory_used, self.memory_total),
            disks: self.disks,
            network: NetworkThroughput {
                rx_bytes_per_sec: self.net_rx_per_sec,
                tx_bytes_per_sec: self.net_tx_per_sec,
                rx_total_bytes: self.net_rx_total,
                tx_total_bytes: self.net_tx_total,
            },
        }
    }

    /// The disks column as JSON text
    pub fn disks_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.disks)
    }

    /// Parse a disks column, recomputing each percentage from the byte counts
    pub fn parse_disks(json: &str) -> serde_json::Result<BTreeMap<String, DiskUsage>> {
        let stored: BTreeMap<String, StoredDisk> = serde_json::from_str(json)?;
        Ok(stored
            .into_iter()
            .map(|(mount_point, disk)| {
                (
                    mount_point,
                    DiskUsage::new(disk.used_bytes, disk.total_bytes),
                )
            })
            .collect())
    }
}

/// Disk entry as read back, tolerant of older records without `percent`
#[derive(Debug, Deserialize)]
struct StoredDisk {
    used_bytes: u64,
    total_bytes: u64,
}
