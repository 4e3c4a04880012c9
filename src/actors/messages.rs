//! Message types for actor communication
//!
//! Commands go to one actor over its mpsc channel, optionally carrying a
//! oneshot sender for the reply. Events fan out over broadcast channels.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::oneshot;

use crate::Sample;
use crate::monitor::TickReport;
use crate::storage::{BackendStats, HealthStatus, SampleRecord};

/// Published after a sample has been appended to the store
///
/// Slow subscribers may lag and miss events; the store keeps the history.
#[derive(Debug, Clone, Serialize)]
pub struct SampleEvent {
    pub sample: Sample,
}

#[derive(Debug)]
pub enum SchedulerCommand {
    /// Run one tick right away, outside of the timer
    TickNow {
        respond_to: oneshot::Sender<anyhow::Result<TickReport>>,
    },

    /// Change the tick interval, effective one new interval from now
    UpdateInterval { interval_secs: u64 },

    /// Stop after the tick in progress, if any
    Shutdown,
}

#[derive(Debug)]
pub enum StorageCommand {
    /// Write buffered samples to the backend now
    Flush {
        respond_to: oneshot::Sender<anyhow::Result<()>>,
    },

    GetStats {
        respond_to: oneshot::Sender<StorageStats>,
    },

    QueryLatest {
        limit: usize,
        respond_to: oneshot::Sender<anyhow::Result<Vec<SampleRecord>>>,
    },

    HealthCheck {
        respond_to: oneshot::Sender<anyhow::Result<HealthStatus>>,
    },

    /// Flush, close the backend and stop
    Shutdown,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StorageStats {
    /// Samples waiting in the write buffer
    pub buffered: usize,

    pub flush_count: u64,
    pub failed_flushes: u64,
    pub total_persisted: u64,

    /// Sample events dropped because the actor lagged behind
    pub total_lagged: u64,

    pub last_cleanup_time: Option<DateTime<Utc>>,
    pub total_deleted: u64,

    /// Statistics reported by the backend itself
    pub backend: Option<BackendStats>,
}
