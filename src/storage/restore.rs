//! Warm start of the sample store from a backend

use chrono::{DateTime, Utc};
use tracing::{debug, instrument};

use crate::Sample;
use crate::store::RetentionPolicy;

use super::backend::{QueryRange, StorageBackend};
use super::error::StorageResult;

/// Persisted samples that the retention policy would still keep at `now`,
/// oldest first
#[instrument(skip(backend))]
pub async fn recent_samples(
    backend: &dyn StorageBackend,
    policy: RetentionPolicy,
    now: DateTime<Utc>,
) -> StorageResult<Vec<Sample>> {
    let mut records = match (policy.age_limit(), policy.sample_limit()) {
        (Some(max_age), _) => {
            backend
                .query_range(QueryRange {
                    start: now - max_age,
                    end: now,
                    limit: None,
                })
                .await?
        }
        (None, Some(max_samples)) => backend.query_latest(max_samples).await?,
        (None, None) => Vec::new(),
    };

    if let Some(max_samples) = policy.sample_limit() {
        let excess = records.len().saturating_sub(max_samples);
        records.drain(..excess);
    }

    debug!("loaded {} persisted samples", records.len());

    Ok(records.into_iter().map(|record| record.into_sample()).collect())
}
