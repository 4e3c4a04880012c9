//! Threshold evaluation against the most recent sample

use std::collections::HashMap;

use tracing::{info, instrument, trace};

use crate::Sample;

use super::{AlertState, AlertStatus, AlertTransition, Metric, Threshold};

/// Outcome of comparing one value with a threshold given the current status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdEvaluation {
    /// Normal and staying normal
    Normal,
    /// Triggered and staying triggered
    Exceeding,
    /// Normal, now above the limit
    StartsToExceed,
    /// Triggered, now at or below the clear level
    BackToNormal,
}

impl ThresholdEvaluation {
    pub fn evaluate(value: f32, threshold: &Threshold, current: AlertStatus) -> ThresholdEvaluation {
        match current {
            AlertStatus::Normal if value > threshold.limit_percent => {
                ThresholdEvaluation::StartsToExceed
            }
            AlertStatus::Normal => ThresholdEvaluation::Normal,
            AlertStatus::Triggered if value <= threshold.clear_level() => {
                ThresholdEvaluation::BackToNormal
            }
            AlertStatus::Triggered => ThresholdEvaluation::Exceeding,
        }
    }

    pub fn is_transition(&self) -> bool {
        matches!(
            self,
            ThresholdEvaluation::StartsToExceed | ThresholdEvaluation::BackToNormal
        )
    }
}

/// Owns the crossing state of every threshold
///
/// Only the scheduler mutates the evaluator; everything else reads copies of
/// its states.
#[derive(Debug, Default)]
pub struct AlertEvaluator {
    states: HashMap<Metric, AlertState>,
}

impl AlertEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluate one threshold against `sample`
    ///
    /// Returns the transition if the state changed. A disk metric whose
    /// mount point is missing from the sample is skipped.
    #[instrument(skip_all, fields(metric = %threshold.metric))]
    pub fn evaluate(&mut self, sample: &Sample, threshold: &Threshold) -> Option<AlertTransition> {
        let Some(value) = threshold.metric.value_in(sample) else {
            trace!("metric absent from sample, skipping evaluation");
            return None;
        };

        let state = self
            .states
            .entry(threshold.metric.clone())
            .or_insert_with(|| AlertState {
                status: AlertStatus::Normal,
                since: sample.timestamp,
                last_value: value,
            });

        let evaluation = ThresholdEvaluation::evaluate(value, threshold, state.status);
        state.last_value = value;

        trace!(
            "{value:.1}% vs limit {} (clear {}) -> {evaluation:?}",
            threshold.limit_percent,
            threshold.clear_level()
        );

        let status = match evaluation {
            ThresholdEvaluation::Normal | ThresholdEvaluation::Exceeding => return None,
            ThresholdEvaluation::StartsToExceed => AlertStatus::Triggered,
            ThresholdEvaluation::BackToNormal => AlertStatus::Normal,
        };

        state.status = status;
        state.since = sample.timestamp;

        info!(
            "{} {status} at {value:.1}% (limit {})",
            threshold.metric, threshold.limit_percent
        );

        Some(AlertTransition {
            threshold: threshold.clone(),
            status,
            since: sample.timestamp,
            value,
        })
    }

    /// Evaluate every active threshold and drop state of removed ones
    pub fn evaluate_all<'a>(
        &mut self,
        sample: &Sample,
        thresholds: impl IntoIterator<Item = &'a Threshold> + Clone,
    ) -> Vec<AlertTransition> {
        self.states.retain(|metric, _| {
            thresholds
                .clone()
                .into_iter()
                .any(|threshold| &threshold.metric == metric)
        });

        thresholds
            .into_iter()
            .filter_map(|threshold| self.evaluate(sample, threshold))
            .collect()
    }

    /// Discard the state of a removed threshold
    pub fn remove(&mut self, metric: &Metric) -> Option<AlertState> {
        self.states.remove(metric)
    }

    pub fn state(&self, metric: &Metric) -> Option<&AlertState> {
        self.states.get(metric)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::{DateTime, TimeZone, Utc};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{DiskUsage, MemoryUsage, NetworkThroughput};

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn cpu_sample(secs: i64, cpu_percent: f32) -> Sample {
        Sample {
            timestamp: at(secs),
            cpu_percent,
            memory: MemoryUsage::new(1, 4),
            disks: BTreeMap::new(),
            network: NetworkThroughput::default(),
        }
    }

    #[test]
    fn test_cpu_scenario_reports_each_crossing_once() {
        let threshold = Threshold::new(Metric::Cpu, 80.0);
        let mut evaluator = AlertEvaluator::new();

        assert_eq!(evaluator.evaluate(&cpu_sample(1, 70.0), &threshold), None);
        assert_eq!(
            evaluator.state(&Metric::Cpu).map(|s| (s.status, s.since)),
            Some((AlertStatus::Normal, at(1)))
        );

        let triggered = evaluator.evaluate(&cpu_sample(2, 85.0), &threshold).unwrap();
        assert_eq!(triggered.status, AlertStatus::Triggered);
        assert_eq!(triggered.since, at(2));

        assert_eq!(evaluator.evaluate(&cpu_sample(3, 90.0), &threshold), None);
        assert_eq!(
            evaluator.state(&Metric::Cpu).map(|s| (s.status, s.since)),
            Some((AlertStatus::Triggered, at(2)))
        );

        let cleared = evaluator.evaluate(&cpu_sample(4, 75.0), &threshold).unwrap();
        assert_eq!(cleared.status, AlertStatus::Normal);
        assert_eq!(cleared.since, at(4));
    }

    #[test]
    fn test_value_equal_to_limit_does_not_trigger() {
        let threshold = Threshold::new(Metric::Cpu, 80.0);
        let mut evaluator = AlertEvaluator::new();

        assert_eq!(evaluator.evaluate(&cpu_sample(1, 80.0), &threshold), None);
        assert!(evaluator.evaluate(&cpu_sample(2, 80.1), &threshold).is_some());
        // back exactly at the limit clears
        assert!(evaluator.evaluate(&cpu_sample(3, 80.0), &threshold).is_some());
    }

    #[test]
    fn test_clear_percent_adds_hysteresis() {
        let threshold = Threshold::new(Metric::Cpu, 80.0).with_clear_percent(60.0);
        let mut evaluator = AlertEvaluator::new();

        assert!(evaluator.evaluate(&cpu_sample(1, 81.0), &threshold).is_some());
        assert_eq!(evaluator.evaluate(&cpu_sample(2, 70.0), &threshold), None);
        assert_eq!(
            evaluator.state(&Metric::Cpu).unwrap().status,
            AlertStatus::Triggered
        );
        assert!(evaluator.evaluate(&cpu_sample(3, 60.0), &threshold).is_some());
    }

    #[test]
    fn test_missing_disk_skips_evaluation() {
        let threshold = Threshold::new(Metric::disk("/mnt/usb"), 50.0);
        let mut evaluator = AlertEvaluator::new();

        let mut mounted = cpu_sample(1, 0.0);
        mounted
            .disks
            .insert("/mnt/usb".to_string(), DiskUsage::new(90, 100));
        assert!(evaluator.evaluate(&mounted, &threshold).is_some());

        // unmounted: state stays triggered
        assert_eq!(evaluator.evaluate(&cpu_sample(2, 0.0), &threshold), None);
        let state = evaluator.state(&threshold.metric).unwrap();
        assert_eq!(state.status, AlertStatus::Triggered);
        assert_eq!(state.since, at(1));
    }

    #[test]
    fn test_memory_uses_percent() {
        let threshold = Threshold::new(Metric::Memory, 50.0);
        let mut evaluator = AlertEvaluator::new();

        let mut sample = cpu_sample(1, 0.0);
        sample.memory = MemoryUsage::new(3, 4);

        let transition = evaluator.evaluate(&sample, &threshold).unwrap();
        assert_eq!(transition.value, 75.0);
    }

    #[test]
    fn test_removed_threshold_starts_fresh() {
        let threshold = Threshold::new(Metric::Cpu, 80.0);
        let mut evaluator = AlertEvaluator::new();

        evaluator.evaluate(&cpu_sample(1, 95.0), &threshold);
        assert!(evaluator.remove(&Metric::Cpu).is_some());

        // re-added while still above the limit: a fresh trigger is reported
        let transition = evaluator.evaluate(&cpu_sample(2, 95.0), &threshold).unwrap();
        assert_eq!(transition.status, AlertStatus::Triggered);
        assert_eq!(transition.since, at(2));
    }

    #[test]
    fn test_evaluate_all_prunes_inactive_thresholds() {
        let cpu = Threshold::new(Metric::Cpu, 80.0);
        let memory = Threshold::new(Metric::Memory, 10.0);
        let mut evaluator = AlertEvaluator::new();

        let transitions = evaluator.evaluate_all(&cpu_sample(1, 90.0), [&cpu, &memory]);
        assert_eq!(transitions.len(), 2);
        assert_eq!(evaluator.len(), 2);

        let transitions = evaluator.evaluate_all(&cpu_sample(2, 90.0), [&cpu]);
        assert!(transitions.is_empty());
        assert_eq!(evaluator.len(), 1);
        assert!(evaluator.state(&Metric::Memory).is_none());
    }
}
