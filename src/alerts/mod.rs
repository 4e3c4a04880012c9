//! Alert thresholds and edge-triggered crossing state
//!
//! ## State Machine
//!
//! Every configured [`Threshold`] owns one [`AlertState`]:
//!
//! ```text
//! NORMAL    --(value > limit)-->  TRIGGERED
//! TRIGGERED --(value <= clear)--> NORMAL
//! ```
//!
//! `clear` defaults to `limit`. Each arrow is reported once as an
//! [`AlertTransition`]; staying in a state reports nothing.

pub mod evaluator;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Sample;

pub use evaluator::{AlertEvaluator, ThresholdEvaluation};

/// The metric a threshold watches
///
/// Textual form: `cpu`, `memory` or `disk:<mount point>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Metric {
    Cpu,
    Memory,
    Disk(String),
}

impl Metric {
    pub fn disk(mount_point: impl Into<String>) -> Self {
        Metric::Disk(mount_point.into())
    }

    /// Current percentage of this metric in `sample`, `None` if the disk is
    /// not part of the sample
    pub fn value_in(&self, sample: &Sample) -> Option<f32> {
        match self {
            Metric::Cpu => Some(sample.cpu_percent),
            Metric::Memory => Some(sample.memory.percent),
            Metric::Disk(mount_point) => sample.disks.get(mount_point).map(|disk| disk.percent),
        }
    }

    pub fn mount_point(&self) -> Option<&str> {
        match self {
            Metric::Disk(mount_point) => Some(mount_point),
            _ => None,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Cpu => write!(f, "cpu"),
            Metric::Memory => write!(f, "memory"),
            Metric::Disk(mount_point) => write!(f, "disk:{mount_point}"),
        }
    }
}

/// Error for metric names that are neither `cpu`, `memory` nor `disk:<mount>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseMetricError(pub String);

impl fmt::Display for ParseMetricError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown metric '{}' (expected cpu, memory or disk:<mount point>)",
            self.0
        )
    }
}

impl std::error::Error for ParseMetricError {}

impl FromStr for Metric {
    type Err = ParseMetricError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("cpu") {
            return Ok(Metric::Cpu);
        }
        if trimmed.eq_ignore_ascii_case("memory") {
            return Ok(Metric::Memory);
        }
        match trimmed.split_once(':') {
            Some((kind, mount_point)) if kind.eq_ignore_ascii_case("disk") && !mount_point.is_empty() => {
                Ok(Metric::Disk(mount_point.to_string()))
            }
            _ => Err(ParseMetricError(s.to_string())),
        }
    }
}

impl TryFrom<String> for Metric {
    type Error = ParseMetricError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Metric> for String {
    fn from(metric: Metric) -> Self {
        metric.to_string()
    }
}

/// Operator-configured limit for one metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    pub metric: Metric,

    /// Values strictly above this trigger the alert
    pub limit_percent: f32,

    /// Values at or below this clear a triggered alert (defaults to the limit)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clear_percent: Option<f32>,
}

impl Threshold {
    pub fn new(metric: Metric, limit_percent: f32) -> Self {
        Self {
            metric,
            limit_percent,
            clear_percent: None,
        }
    }

    pub fn with_clear_percent(mut self, clear_percent: f32) -> Self {
        self.clear_percent = Some(clear_percent);
        self
    }

    pub fn clear_level(&self) -> f32 {
        self.clear_percent.unwrap_or(self.limit_percent)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Normal,
    Triggered,
}

impl fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertStatus::Normal => write!(f, "normal"),
            AlertStatus::Triggered => write!(f, "triggered"),
        }
    }
}

/// Crossing state of one threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertState {
    pub status: AlertStatus,

    /// Timestamp of the sample that caused the last transition (or the first
    /// evaluation)
    pub since: DateTime<Utc>,

    /// Metric value at the most recent evaluation
    pub last_value: f32,
}

/// Edge-triggered event published once per state change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertTransition {
    pub threshold: Threshold,
    pub status: AlertStatus,
    pub since: DateTime<Utc>,
    pub value: f32,
}

/// A configured threshold together with its current state
///
/// A threshold that has not been evaluated yet is `normal` without `since`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdState {
    pub threshold: Threshold,
    pub status: AlertStatus,
    pub since: Option<DateTime<Utc>>,
    pub last_value: Option<f32>,
}

impl ThresholdState {
    pub fn new(threshold: Threshold, state: Option<&AlertState>) -> Self {
        match state {
            Some(state) => Self {
                threshold,
                status: state.status,
                since: Some(state.since),
                last_value: Some(state.last_value),
            },
            None => Self {
                threshold,
                status: AlertStatus::Normal,
                since: None,
                last_value: None,
            },
        }
    }
}
