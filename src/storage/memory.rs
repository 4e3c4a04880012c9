//! In-process backend without durability
//!
//! Keeps a bounded, timestamp-ordered buffer of records. Used when no
//! database is configured and in tests.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::trace;

use super::backend::{BackendStats, HealthStatus, QueryRange, StorageBackend};
use super::error::StorageResult;
use super::schema::SampleRecord;

const DEFAULT_CAPACITY: usize = 10_000;

pub struct MemoryBackend {
    records: Mutex<VecDeque<SampleRecord>>,
    capacity: usize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn insert_batch(&self, samples: Vec<SampleRecord>) -> StorageResult<()> {
        let mut records = self.records.lock().await;

        for sample in samples {
            match records.binary_search_by_key(&sample.timestamp, |r| r.timestamp) {
                Ok(existing) => records[existing] = sample,
                Err(position) => records.insert(position, sample),
            }
        }

        while records.len() > self.capacity {
            records.pop_front();
        }

        trace!("memory backend holds {} records", records.len());
        Ok(())
    }

    async fn query_range(&self, query: QueryRange) -> StorageResult<Vec<SampleRecord>> {
        let records = self.records.lock().await;

        let matching = records
            .iter()
            .filter(|r| r.timestamp >= query.start && r.timestamp <= query.end)
            .take(query.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect();

        Ok(matching)
    }

    async fn query_latest(&self, limit: usize) -> StorageResult<Vec<SampleRecord>> {
        let records = self.records.lock().await;
        let skip = records.len().saturating_sub(limit);
        Ok(records.iter().skip(skip).cloned().collect())
    }

    async fn cleanup_old_samples(&self, before: DateTime<Utc>) -> StorageResult<usize> {
        let mut records = self.records.lock().await;
        let old = records.partition_point(|r| r.timestamp < before);
        records.drain(..old);
        Ok(old)
    }

    async fn health_check(&self) -> StorageResult<HealthStatus> {
        Ok(HealthStatus {
            healthy: true,
            message: "In-memory storage operational".to_string(),
            metadata: HashMap::from([("backend".to_string(), "memory".to_string())]),
        })
    }

    async fn get_stats(&self) -> StorageResult<BackendStats> {
        let records = self.records.lock().await;

        Ok(BackendStats {
            backend: "memory".to_string(),
            total_samples: records.len() as u64,
            oldest: records.front().map(|r| r.timestamp),
            newest: records.back().map(|r| r.timestamp),
            size_bytes: None,
        })
    }

    async fn close(&self) -> StorageResult<()> {
        Ok(())
    }
}
