//! Query parameters for the sample store

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{DiskUsage, Sample};

use super::error::{StoreError, StoreResult};

/// Inclusive time range; an omitted endpoint leaves that side open
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl TimeRange {
    /// The full retained window
    pub fn all() -> Self {
        Self::default()
    }

    pub fn between(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self {
            from: Some(from),
            to: Some(to),
        }
    }

    pub fn since(from: DateTime<Utc>) -> Self {
        Self {
            from: Some(from),
            to: None,
        }
    }

    pub fn until(to: DateTime<Utc>) -> Self {
        Self {
            from: None,
            to: Some(to),
        }
    }

    pub fn validate(&self) -> StoreResult<()> {
        match (self.from, self.to) {
            (Some(from), Some(to)) if from > to => Err(StoreError::InvalidRange { from, to }),
            _ => Ok(()),
        }
    }
}

/// Which disks a query returns
///
/// Serialized as `{"mode": "all"}` or `{"mode": "only", "mount_points": [...]}`.
/// The textual form used in query strings is `all` or a comma separated list
/// of mount points.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "mount_points", rename_all = "snake_case")]
pub enum DiskSelection {
    #[default]
    All,
    Only(BTreeSet<String>),
}

impl DiskSelection {
    pub fn only<I, S>(mount_points: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        DiskSelection::Only(mount_points.into_iter().map(Into::into).collect())
    }

    pub fn includes(&self, mount_point: &str) -> bool {
        match self {
            DiskSelection::All => true,
            DiskSelection::Only(selected) => selected.contains(mount_point),
        }
    }

    /// Explicitly selected mount points, `None` for all disks
    pub fn mount_points(&self) -> Option<&BTreeSet<String>> {
        match self {
            DiskSelection::All => None,
            DiskSelection::Only(selected) => Some(selected),
        }
    }

    pub fn filter(&self, disks: &BTreeMap<String, DiskUsage>) -> BTreeMap<String, DiskUsage> {
        match self {
            DiskSelection::All => disks.clone(),
            DiskSelection::Only(selected) => disks
                .iter()
                .filter(|(mount_point, _)| selected.contains(mount_point.as_str()))
                .map(|(mount_point, usage)| (mount_point.clone(), *usage))
                .collect(),
        }
    }

    /// Copy of `sample` with its disks restricted to this selection
    pub fn apply(&self, sample: &Sample) -> Sample {
        Sample {
            disks: self.filter(&sample.disks),
            ..sample.clone()
        }
    }
}

impl FromStr for DiskSelection {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("all") {
            return Ok(DiskSelection::All);
        }

        Ok(DiskSelection::only(
            trimmed
                .split(',')
                .map(str::trim)
                .filter(|mount_point| !mount_point.is_empty()),
        ))
    }
}

impl fmt::Display for DiskSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiskSelection::All => write!(f, "all"),
            DiskSelection::Only(selected) => {
                let joined: Vec<&str> = selected.iter().map(String::as_str).collect();
                write!(f, "{}", joined.join(","))
            }
        }
    }
}
