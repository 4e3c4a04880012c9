//! Operator-editable dashboard settings
//!
//! Thresholds and the visible-disk selection form one immutable
//! [`DashboardSettings`] snapshot. Writers build a modified copy and swap it
//! in as a whole through a `tokio::sync::watch` channel, so a tick or a query
//! that grabbed a snapshot keeps seeing it unchanged.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

use crate::alerts::{Metric, Threshold};
use crate::store::DiskSelection;

#[derive(Debug, Clone, PartialEq)]
pub enum SettingsError {
    /// No threshold is configured for this metric
    UnknownThreshold(Metric),
    /// Mount point has not been observed in the retained samples
    UnknownMountPoint(String),
    /// Limit or clear level outside of the allowed range
    InvalidLimit(String),
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::UnknownThreshold(metric) => {
                write!(f, "No threshold configured for {metric}")
            }
            SettingsError::UnknownMountPoint(mount_point) => {
                write!(f, "Unknown mount point: {mount_point}")
            }
            SettingsError::InvalidLimit(msg) => write!(f, "Invalid limit: {msg}"),
        }
    }
}

impl std::error::Error for SettingsError {}

pub type SettingsResult<T> = Result<T, SettingsError>;

/// Check that `threshold` describes a usable limit
///
/// `limit_percent` lies in `[0, 100]`, an explicit `clear_percent` lies in
/// `[0, limit_percent]`.
pub fn validate_threshold(threshold: &Threshold) -> SettingsResult<()> {
    let limit = threshold.limit_percent;
    if !limit.is_finite() || !(0.0..=100.0).contains(&limit) {
        return Err(SettingsError::InvalidLimit(format!(
            "limit_percent for {} must be within 0..=100, got {limit}",
            threshold.metric
        )));
    }

    if let Some(clear) = threshold.clear_percent
        && (!clear.is_finite() || clear < 0.0 || clear > limit)
    {
        return Err(SettingsError::InvalidLimit(format!(
            "clear_percent for {} must be within 0..={limit}, got {clear}",
            threshold.metric
        )));
    }

    Ok(())
}

/// Check requested mount points against the ones actually observed
///
/// An empty `known` set means nothing has been sampled yet, in which case
/// every mount point is accepted.
pub fn validate_mount_points<'a>(
    requested: impl IntoIterator<Item = &'a str>,
    known: &BTreeSet<String>,
) -> SettingsResult<()> {
    if known.is_empty() {
        return Ok(());
    }

    match requested.into_iter().find(|mp| !known.contains(*mp)) {
        Some(unknown) => Err(SettingsError::UnknownMountPoint(unknown.to_string())),
        None => Ok(()),
    }
}

/// One consistent view of every operator setting
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardSettings {
    thresholds: BTreeMap<Metric, Threshold>,
    visible_disks: DiskSelection,
}

impl DashboardSettings {
    pub fn new(
        thresholds: impl IntoIterator<Item = Threshold>,
        visible_disks: DiskSelection,
    ) -> SettingsResult<Self> {
        let mut settings = Self {
            thresholds: BTreeMap::new(),
            visible_disks,
        };

        for threshold in thresholds {
            settings.put_threshold(threshold)?;
        }

        Ok(settings)
    }

    /// Active thresholds, ordered by metric
    pub fn thresholds(&self) -> impl Iterator<Item = &Threshold> + Clone {
        self.thresholds.values()
    }

    pub fn threshold(&self, metric: &Metric) -> Option<&Threshold> {
        self.thresholds.get(metric)
    }

    pub fn visible_disks(&self) -> &DiskSelection {
        &self.visible_disks
    }

    /// Insert or replace the threshold for its metric
    pub fn put_threshold(&mut self, threshold: Threshold) -> SettingsResult<Option<Threshold>> {
        validate_threshold(&threshold)?;
        Ok(self.thresholds.insert(threshold.metric.clone(), threshold))
    }

    pub fn remove_threshold(&mut self, metric: &Metric) -> SettingsResult<Threshold> {
        self.thresholds
            .remove(metric)
            .ok_or_else(|| SettingsError::UnknownThreshold(metric.clone()))
    }

    pub fn set_visible_disks(&mut self, visible_disks: DiskSelection) {
        self.visible_disks = visible_disks;
    }
}

/// Cloneable handle to the current settings snapshot
#[derive(Debug, Clone)]
pub struct SettingsHandle {
    sender: Arc<watch::Sender<Arc<DashboardSettings>>>,
}

impl SettingsHandle {
    pub fn new(settings: DashboardSettings) -> Self {
        let (sender, _) = watch::channel(Arc::new(settings));
        Self {
            sender: Arc::new(sender),
        }
    }

    /// The current snapshot; later updates never mutate it
    pub fn snapshot(&self) -> Arc<DashboardSettings> {
        self.sender.borrow().clone()
    }

    /// Receiver notified whenever a new snapshot is published
    pub fn subscribe(&self) -> watch::Receiver<Arc<DashboardSettings>> {
        self.sender.subscribe()
    }

    /// Apply `modify` to a copy of the current snapshot and publish it
    ///
    /// Concurrent updates are serialized. If `modify` fails, the current
    /// snapshot stays in place and nothing is published.
    pub fn update<F>(&self, modify: F) -> SettingsResult<()>
    where
        F: FnOnce(&mut DashboardSettings) -> SettingsResult<()>,
    {
        let mut outcome = Ok(());

        let published = self.sender.send_if_modified(|current| {
            let mut next = DashboardSettings::clone(current);
            match modify(&mut next) {
                Ok(()) => {
                    *current = Arc::new(next);
                    true
                }
                Err(e) => {
                    outcome = Err(e);
                    false
                }
            }
        });

        if published {
            debug!("published new settings snapshot");
        }

        outcome
    }
}
