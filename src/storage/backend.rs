//! Persistence backend trait

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::error::StorageResult;
use super::schema::SampleRecord;

/// Inclusive time range for persisted sample queries
#[derive(Debug, Clone)]
pub struct QueryRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,

    /// Maximum number of records, oldest first
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub healthy: bool,
    pub message: String,
    pub metadata: HashMap<String, String>,
}

/// Row counts and time span of a backend
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BackendStats {
    pub backend: String,
    pub total_samples: u64,
    pub oldest: Option<DateTime<Utc>>,
    pub newest: Option<DateTime<Utc>>,
    /// Size on disk, if the backend has one
    pub size_bytes: Option<u64>,
}

/// Durable storage for samples
///
/// Writes are batched by the storage actor, so `insert_batch` is the only
/// write path. Re-inserting a timestamp replaces the stored record.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    async fn insert_batch(&self, samples: Vec<SampleRecord>) -> StorageResult<()>;

    /// Records within the range, oldest first
    async fn query_range(&self, query: QueryRange) -> StorageResult<Vec<SampleRecord>>;

    /// The `limit` most recent records, oldest first
    async fn query_latest(&self, limit: usize) -> StorageResult<Vec<SampleRecord>>;

    /// Delete records strictly older than `before`, returning how many were
    /// removed
    async fn cleanup_old_samples(&self, before: DateTime<Utc>) -> StorageResult<usize>;

    async fn health_check(&self) -> StorageResult<HealthStatus>;

    async fn get_stats(&self) -> StorageResult<BackendStats>;

    async fn close(&self) -> StorageResult<()>;
}
