//! Time-ordered sample window with retention eviction
//!
//! Samples are kept in a `VecDeque` in strictly increasing timestamp order.
//! New samples go to the back, retention evicts from the front, so eviction
//! never touches the middle of the window and is O(1) amortized per append.
//! Range queries binary search both endpoints.

use std::collections::{BTreeSet, VecDeque};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::Sample;

use super::error::{StoreError, StoreResult};
use super::query::{DiskSelection, TimeRange};

/// Bounds on how much history the window retains
///
/// A sample is evicted as soon as it violates either configured bound:
/// more than `max_samples` newer samples exist, or it is older than the
/// newest sample by more than `max_age`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    max_age: Option<Duration>,
    max_samples: Option<usize>,
}

impl RetentionPolicy {
    pub fn new(max_age: Option<Duration>, max_samples: Option<usize>) -> StoreResult<Self> {
        if max_age.is_none() && max_samples.is_none() {
            return Err(StoreError::InvalidRetentionPolicy(
                "at least one of max_age and max_samples must be set".to_string(),
            ));
        }

        if max_samples == Some(0) {
            return Err(StoreError::InvalidRetentionPolicy(
                "max_samples must be at least 1".to_string(),
            ));
        }

        if max_age.is_some_and(|age| age <= Duration::zero()) {
            return Err(StoreError::InvalidRetentionPolicy(
                "max_age must be positive".to_string(),
            ));
        }

        Ok(Self {
            max_age,
            max_samples,
        })
    }

    pub fn max_samples(max_samples: usize) -> StoreResult<Self> {
        Self::new(None, Some(max_samples))
    }

    pub fn max_age(max_age: Duration) -> StoreResult<Self> {
        Self::new(Some(max_age), None)
    }

    pub fn age_limit(&self) -> Option<Duration> {
        self.max_age
    }

    pub fn sample_limit(&self) -> Option<usize> {
        self.max_samples
    }
}

/// Counters describing the window
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StoreStats {
    pub retained: usize,
    pub oldest: Option<DateTime<Utc>>,
    pub newest: Option<DateTime<Utc>>,
    pub total_appended: u64,
    pub total_evicted: u64,
    pub total_rejected: u64,
}

#[derive(Debug, Clone)]
pub struct SampleWindow {
    samples: VecDeque<Sample>,
    policy: RetentionPolicy,
    total_appended: u64,
    total_evicted: u64,
    total_rejected: u64,
}

impl SampleWindow {
    pub fn new(policy: RetentionPolicy) -> Self {
        let capacity = policy.max_samples.unwrap_or_default().min(4096);
        Self {
            samples: VecDeque::with_capacity(capacity),
            policy,
            total_appended: 0,
            total_evicted: 0,
            total_rejected: 0,
        }
    }

    pub fn policy(&self) -> RetentionPolicy {
        self.policy
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn newest(&self) -> Option<DateTime<Utc>> {
        self.samples.back().map(|sample| sample.timestamp)
    }

    pub fn oldest(&self) -> Option<DateTime<Utc>> {
        self.samples.front().map(|sample| sample.timestamp)
    }

    /// Append a sample and apply retention
    ///
    /// Returns the number of evicted samples. A rejected sample leaves the
    /// window untouched.
    pub fn append(&mut self, sample: Sample) -> StoreResult<usize> {
        if let Some(newest) = self.newest()
            && sample.timestamp <= newest
        {
            self.total_rejected += 1;
            return Err(StoreError::OutOfOrderSample {
                newest,
                rejected: sample.timestamp,
            });
        }

        self.samples.push_back(sample);
        self.total_appended += 1;

        let evicted = self.evict();
        self.total_evicted += evicted as u64;
        Ok(evicted)
    }

    fn evict(&mut self) -> usize {
        let mut evicted = 0;

        if let Some(max_samples) = self.policy.max_samples {
            while self.samples.len() > max_samples {
                self.samples.pop_front();
                evicted += 1;
            }
        }

        if let (Some(max_age), Some(newest)) = (self.policy.max_age, self.newest()) {
            // the newest sample itself is always within max_age
            while let Some(oldest) = self.samples.front() {
                if newest - oldest.timestamp <= max_age {
                    break;
                }
                self.samples.pop_front();
                evicted += 1;
            }
        }

        evicted
    }

    /// Samples with a timestamp inside `range`, oldest first, with their
    /// disks restricted to `disks`
    pub fn query(&self, range: &TimeRange, disks: &DiskSelection) -> StoreResult<Vec<Sample>> {
        range.validate()?;

        let start = match range.from {
            Some(from) => self.samples.partition_point(|s| s.timestamp < from),
            None => 0,
        };
        let end = match range.to {
            Some(to) => self.samples.partition_point(|s| s.timestamp <= to),
            None => self.samples.len(),
        };

        if start >= end {
            return Ok(Vec::new());
        }

        Ok(self
            .samples
            .range(start..end)
            .map(|sample| disks.apply(sample))
            .collect())
    }

    pub fn latest(&self) -> StoreResult<&Sample> {
        self.samples.back().ok_or(StoreError::NotFound)
    }

    /// Every mount point seen in the retained window
    pub fn mount_points(&self) -> BTreeSet<String> {
        self.samples
            .iter()
            .flat_map(|sample| sample.disks.keys().cloned())
            .collect()
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            retained: self.samples.len(),
            oldest: self.oldest(),
            newest: self.newest(),
            total_appended: self.total_appended,
            total_evicted: self.total_evicted,
            total_rejected: self.total_rejected,
        }
    }
}
