//! Helper functions for integration tests

#![allow(dead_code)]

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeZone, Utc};
use host_monitor::{
    DiskUsage, MemoryUsage, NetworkThroughput, Sample,
    alerts::{Metric, Threshold},
    monitor::Monitor,
    sampler::{Sampler, SamplingError},
    settings::DashboardSettings,
    store::{DiskSelection, RetentionPolicy},
};

pub const GIB: u64 = 1024 * 1024 * 1024;

pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

/// Sample with the given cpu usage and `/` and `/data` disks
pub fn create_sample(secs: i64, cpu_percent: f32) -> Sample {
    create_sample_with_disks(
        secs,
        cpu_percent,
        [("/", 40 * GIB, 100 * GIB), ("/data", 900 * GIB, 1000 * GIB)],
    )
}

pub fn create_sample_with_disks<'a>(
    secs: i64,
    cpu_percent: f32,
    disks: impl IntoIterator<Item = (&'a str, u64, u64)>,
) -> Sample {
    Sample {
        timestamp: at(secs),
        cpu_percent,
        memory: MemoryUsage::new(8 * GIB, 16 * GIB),
        disks: disks
            .into_iter()
            .map(|(mount_point, used, total)| (mount_point.to_string(), DiskUsage::new(used, total)))
            .collect::<BTreeMap<_, _>>(),
        network: NetworkThroughput::default(),
    }
}

pub fn create_monitor(max_samples: usize, thresholds: Vec<Threshold>) -> Monitor {
    let settings = DashboardSettings::new(thresholds, DiskSelection::All).unwrap();
    Monitor::new(RetentionPolicy::max_samples(max_samples).unwrap(), settings)
}

pub fn cpu_threshold(limit_percent: f32) -> Threshold {
    Threshold::new(Metric::Cpu, limit_percent)
}

/// Sampler replaying queued outcomes
///
/// The queue is shared, so tests can push more outcomes after the sampler
/// moved into the scheduler. An empty queue reports cpu as unavailable.
#[derive(Clone, Default)]
pub struct ScriptedSampler {
    script: Arc<Mutex<VecDeque<Result<Sample, SamplingError>>>>,
}

impl ScriptedSampler {
    pub fn new(samples: impl IntoIterator<Item = Sample>) -> Self {
        let sampler = Self::default();
        for sample in samples {
            sampler.push(Ok(sample));
        }
        sampler
    }

    pub fn push(&self, outcome: Result<Sample, SamplingError>) {
        self.script.lock().unwrap().push_back(outcome);
    }
}

impl Sampler for ScriptedSampler {
    fn sample(&mut self) -> Result<Sample, SamplingError> {
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(SamplingError::CpuUnavailable("script exhausted".to_string())))
    }
}
