//! Request and response bodies of the HTTP API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Sample;
use crate::actors::StorageStats;
use crate::alerts::{Metric, Threshold, ThresholdState};
use crate::storage::HealthStatus;
use crate::store::{DiskSelection, StoreStats};

/// Query parameters for GET /api/v1/metrics/history
#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    /// Inclusive lower bound (RFC 3339), unbounded if omitted
    pub from: Option<DateTime<Utc>>,

    /// Inclusive upper bound (RFC 3339), unbounded if omitted
    pub to: Option<DateTime<Utc>>,

    /// `all` or a comma separated list of mount points; the configured
    /// visible disks if omitted
    pub disks: Option<String>,
}

impl HistoryQuery {
    pub fn disk_selection(&self) -> Option<DiskSelection> {
        self.disks.as_deref().map(|disks| match disks.parse() {
            Ok(selection) => selection,
            Err(never) => match never {},
        })
    }
}

/// Query parameters for DELETE /api/v1/thresholds
#[derive(Debug, Deserialize)]
pub struct MetricQuery {
    pub metric: Metric,
}

/// Response for GET /api/v1/health
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage: Option<HealthStatus>,
}

/// Response for GET /api/v1/stats
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub timestamp: String,
    pub store: StoreStats,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage: Option<StorageStats>,
}

/// Response for GET /api/v1/metrics/history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub disks: DiskSelection,
    pub count: usize,
    pub samples: Vec<Sample>,
}

/// Response for GET /api/v1/alerts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertsResponse {
    pub count: usize,
    pub alerts: Vec<ThresholdState>,
}

/// Response for GET /api/v1/thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdsResponse {
    pub count: usize,
    pub thresholds: Vec<Threshold>,
}

/// Body of PUT /api/v1/disks/visible and response of GET
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisibleDisksBody {
    pub visible_disks: DiskSelection,
}
