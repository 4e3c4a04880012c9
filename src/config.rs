use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;
use tracing::trace;

use crate::alerts::Threshold;
use crate::settings::DashboardSettings;
use crate::store::{DiskSelection, RetentionPolicy};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Seconds between two ticks
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    #[serde(default)]
    pub retention: RetentionConfig,

    /// Thresholds active at startup
    #[serde(default)]
    pub thresholds: Vec<Threshold>,

    /// Disks returned by history queries that do not name any
    #[serde(default)]
    pub visible_disks: DiskSelection,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub storage: StorageConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            retention: RetentionConfig::default(),
            thresholds: Vec::new(),
            visible_disks: DiskSelection::All,
            api: ApiConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

/// Retention of the in-memory store; `null` disables a bound
#[derive(Debug, Clone, Deserialize)]
pub struct RetentionConfig {
    #[serde(default = "default_max_age_secs")]
    pub max_age_secs: Option<u64>,

    #[serde(default = "default_max_samples")]
    pub max_samples: Option<usize>,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            max_age_secs: default_max_age_secs(),
            max_samples: default_max_samples(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "crate::util::default_bind_addr")]
    pub bind_addr: SocketAddr,

    #[serde(default)]
    pub enable_cors: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: crate::util::default_bind_addr(),
            enable_cors: false,
        }
    }
}

/// Durable persistence of samples
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageConfig {
    /// Nothing survives a restart
    #[default]
    None,

    /// Bounded in-process buffer
    Memory {
        #[serde(default = "default_memory_capacity")]
        capacity: usize,
    },

    Sqlite {
        #[serde(default = "default_sqlite_path")]
        path: PathBuf,

        /// Samples older than this are deleted from the database
        #[serde(default = "default_retention_days")]
        retention_days: u32,
    },
}

fn default_interval_secs() -> u64 {
    2
}

fn default_max_age_secs() -> Option<u64> {
    Some(3600)
}

fn default_max_samples() -> Option<usize> {
    Some(1800)
}

fn default_memory_capacity() -> usize {
    10_000
}

fn default_sqlite_path() -> PathBuf {
    PathBuf::from("./samples.db")
}

fn default_retention_days() -> u32 {
    7
}

impl Config {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn retention_policy(&self) -> anyhow::Result<RetentionPolicy> {
        let max_age = self
            .retention
            .max_age_secs
            .map(|secs| {
                i64::try_from(secs)
                    .ok()
                    .and_then(chrono::Duration::try_seconds)
                    .context("retention.max_age_secs is too large")
            })
            .transpose()?;

        Ok(RetentionPolicy::new(max_age, self.retention.max_samples)?)
    }

    pub fn settings(&self) -> anyhow::Result<DashboardSettings> {
        Ok(DashboardSettings::new(
            self.thresholds.iter().cloned(),
            self.visible_disks.clone(),
        )?)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.interval_secs == 0 {
            anyhow::bail!("interval_secs must be at least 1");
        }

        if let StorageConfig::Sqlite {
            retention_days: 0, ..
        } = self.storage
        {
            anyhow::bail!("storage.retention_days must be at least 1");
        }

        self.retention_policy()
            .context("invalid retention configuration")?;
        self.settings().context("invalid threshold configuration")?;

        Ok(())
    }
}

pub fn read_config_file(path: impl AsRef<Path>) -> anyhow::Result<Config> {
    let path = path.as_ref();
    let file_content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;

    serde_json::from_str(&file_content)
        .with_context(|| format!("invalid configuration file {}", path.display()))
        .inspect(|config| trace!("loaded config: {config:?}"))
}
