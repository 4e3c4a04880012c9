//! In-memory sample store shared between the scheduler and readers
//!
//! ## Concurrency
//!
//! The scheduler is the only writer. Request handlers read concurrently.
//! The window sits behind a `tokio::sync::RwLock`:
//!
//! - **Writers** hold the lock for one push plus front evictions (O(1) amortized)
//! - **Readers** hold a read guard while copying their range out, so they
//!   always see either the state before or after an append, never a torn one
//!
//! Durable persistence lives in [`crate::storage`]; this store is the
//! authoritative retention window the dashboard reads from.

pub mod error;
pub mod query;
pub mod window;

use std::collections::BTreeSet;

use tokio::sync::RwLock;
use tracing::{trace, warn};

use crate::Sample;

pub use error::{StoreError, StoreResult};
pub use query::{DiskSelection, TimeRange};
pub use window::{RetentionPolicy, SampleWindow, StoreStats};

/// Thread-safe handle around a [`SampleWindow`]
#[derive(Debug)]
pub struct SampleStore {
    window: RwLock<SampleWindow>,
}

impl SampleStore {
    pub fn new(policy: RetentionPolicy) -> Self {
        Self {
            window: RwLock::new(SampleWindow::new(policy)),
        }
    }

    /// Append a sample, then evict per retention policy
    ///
    /// Returns the number of evicted samples.
    pub async fn append(&self, sample: Sample) -> StoreResult<usize> {
        let timestamp = sample.timestamp;
        let result = self.window.write().await.append(sample);

        match &result {
            Ok(evicted) => trace!("appended sample at {timestamp}, evicted {evicted}"),
            Err(e) => warn!("rejected sample: {e}"),
        }

        result
    }

    pub async fn query(&self, range: TimeRange, disks: &DiskSelection) -> StoreResult<Vec<Sample>> {
        self.window.read().await.query(&range, disks)
    }

    pub async fn latest(&self) -> StoreResult<Sample> {
        self.window.read().await.latest().cloned()
    }

    pub async fn mount_points(&self) -> BTreeSet<String> {
        self.window.read().await.mount_points()
    }

    pub async fn stats(&self) -> StoreStats {
        self.window.read().await.stats()
    }

    pub async fn policy(&self) -> RetentionPolicy {
        self.window.read().await.policy()
    }

    /// Load previously persisted samples, oldest first
    ///
    /// Samples that would break the ordering invariant are skipped. Returns
    /// the number of samples accepted.
    pub async fn restore(&self, samples: impl IntoIterator<Item = Sample>) -> usize {
        let mut window = self.window.write().await;
        let mut restored = 0;
        for sample in samples {
            if window.append(sample).is_ok() {
                restored += 1;
            }
        }
        restored
    }
}
