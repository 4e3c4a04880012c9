//! The [`Monitor`] facade
//!
//! Ties the sample store, the alert evaluator and the settings snapshot
//! together. The scheduler feeds it through [`Monitor::record`]; request
//! handlers and other collaborators only use the read and configuration
//! operations.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{RwLock, broadcast};
use tracing::{debug, info, instrument, trace};

use crate::Sample;
use crate::actors::messages::SampleEvent;
use crate::alerts::{AlertEvaluator, AlertTransition, Metric, Threshold, ThresholdState};
use crate::settings::{
    DashboardSettings, SettingsHandle, SettingsResult, validate_mount_points, validate_threshold,
};
use crate::store::{DiskSelection, RetentionPolicy, SampleStore, StoreResult, StoreStats, TimeRange};

/// Capacity of the sample and alert broadcast channels
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Outcome of one recorded sample
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub timestamp: DateTime<Utc>,
    pub evicted: usize,
    pub transitions: Vec<AlertTransition>,
}

#[derive(Debug, Clone)]
pub struct Monitor {
    store: Arc<SampleStore>,
    evaluator: Arc<RwLock<AlertEvaluator>>,
    settings: SettingsHandle,
    sample_tx: broadcast::Sender<SampleEvent>,
    alert_tx: broadcast::Sender<AlertTransition>,
}

impl Monitor {
    pub fn new(policy: RetentionPolicy, settings: DashboardSettings) -> Self {
        let (sample_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (alert_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            store: Arc::new(SampleStore::new(policy)),
            evaluator: Arc::new(RwLock::new(AlertEvaluator::new())),
            settings: SettingsHandle::new(settings),
            sample_tx,
            alert_tx,
        }
    }

    /// Append a freshly taken sample and evaluate every active threshold
    /// against it
    ///
    /// Evaluation uses a single settings snapshot. Transitions are published
    /// after the sample is visible in the store.
    #[instrument(skip_all, fields(timestamp = %sample.timestamp))]
    pub async fn record(&self, sample: Sample) -> StoreResult<TickReport> {
        // threshold removal waits until this tick is evaluated
        let mut evaluator = self.evaluator.write().await;
        let settings = self.settings.snapshot();

        let evicted = self.store.append(sample.clone()).await?;
        let transitions = evaluator.evaluate_all(&sample, settings.thresholds());
        drop(evaluator);

        let timestamp = sample.timestamp;

        if self.sample_tx.send(SampleEvent { sample }).is_err() {
            trace!("no subscribers for sample event");
        }

        for transition in &transitions {
            if self.alert_tx.send(transition.clone()).is_err() {
                trace!("no subscribers for alert transition");
            }
        }

        Ok(TickReport {
            timestamp,
            evicted,
            transitions,
        })
    }

    /// Load persisted samples into the store without evaluating them
    pub async fn restore_history(&self, samples: impl IntoIterator<Item = Sample>) -> usize {
        let restored = self.store.restore(samples).await;
        info!("restored {restored} samples into the store");
        restored
    }

    pub async fn current_metrics(&self) -> StoreResult<Sample> {
        self.store.latest().await
    }

    /// Samples in `range`, with disks filtered to `disks` or, if omitted, to
    /// the configured visible disks
    pub async fn history(
        &self,
        range: TimeRange,
        disks: Option<DiskSelection>,
    ) -> StoreResult<Vec<Sample>> {
        let disks = match disks {
            Some(disks) => disks,
            None => self.settings.snapshot().visible_disks().clone(),
        };

        self.store.query(range, &disks).await
    }

    /// State of every configured threshold, ordered by metric
    pub async fn alert_states(&self) -> Vec<ThresholdState> {
        let evaluator = self.evaluator.read().await;
        let settings = self.settings.snapshot();

        settings
            .thresholds()
            .map(|threshold| {
                ThresholdState::new(threshold.clone(), evaluator.state(&threshold.metric))
            })
            .collect()
    }

    pub fn thresholds(&self) -> Vec<Threshold> {
        self.settings.snapshot().thresholds().cloned().collect()
    }

    /// Add a threshold, or replace the limit of an existing one
    ///
    /// Replacing keeps the current alert state.
    #[instrument(skip(self))]
    pub async fn put_threshold(&self, threshold: Threshold) -> SettingsResult<()> {
        validate_threshold(&threshold)?;

        if let Some(mount_point) = threshold.metric.mount_point() {
            validate_mount_points([mount_point], &self.store.mount_points().await)?;
        }

        self.settings.update(|settings| {
            settings.put_threshold(threshold)?;
            Ok(())
        })?;

        debug!("threshold stored");
        Ok(())
    }

    /// Remove a threshold and discard its alert state
    #[instrument(skip(self))]
    pub async fn delete_threshold(&self, metric: &Metric) -> SettingsResult<()> {
        let mut evaluator = self.evaluator.write().await;

        self.settings.update(|settings| {
            settings.remove_threshold(metric)?;
            Ok(())
        })?;
        evaluator.remove(metric);

        debug!("threshold removed");
        Ok(())
    }

    pub fn visible_disks(&self) -> DiskSelection {
        self.settings.snapshot().visible_disks().clone()
    }

    #[instrument(skip(self))]
    pub async fn put_visible_disks(&self, disks: DiskSelection) -> SettingsResult<()> {
        if let Some(mount_points) = disks.mount_points() {
            validate_mount_points(
                mount_points.iter().map(String::as_str),
                &self.store.mount_points().await,
            )?;
        }

        self.settings.update(|settings| {
            settings.set_visible_disks(disks);
            Ok(())
        })
    }

    pub async fn stats(&self) -> StoreStats {
        self.store.stats().await
    }

    pub fn subscribe_samples(&self) -> broadcast::Receiver<SampleEvent> {
        self.sample_tx.subscribe()
    }

    pub fn subscribe_alerts(&self) -> broadcast::Receiver<AlertTransition> {
        self.alert_tx.subscribe()
    }
}
