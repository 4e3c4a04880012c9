use std::net::SocketAddr;

use anyhow::Context;
use clap::Parser;
use host_monitor::{
    actors::{SchedulerHandle, StorageHandle},
    config::{Config, StorageConfig, read_config_file},
    monitor::Monitor,
    sampler::SystemSampler,
    storage::{MemoryBackend, StorageBackend, recent_samples},
    util::{get_bind_addr, get_config_path},
};
use tracing::{debug, error, info, level_filters::LevelFilter, trace, warn};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
#[command(version, about = "Samples this host and serves its metrics history")]
struct Args {
    /// Config file, falls back to MONITOR_CONFIG
    #[arg(short, long)]
    file: Option<String>,

    /// Seconds between two ticks, overrides the config file
    #[arg(long)]
    interval: Option<u64>,

    /// API bind address, overrides MONITOR_BIND_ADDR and the config file
    #[arg(long)]
    bind: Option<SocketAddr>,

    #[arg(long, default_value_t = LevelFilter::DEBUG)]
    log_level: LevelFilter,
}

fn init(level: LevelFilter) {
    let filter = filter::Targets::new().with_targets(vec![
        ("host_monitor", level),
        ("hub", level),
        ("tower_http", level),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

fn load_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = match args.file.clone().or_else(get_config_path) {
        Some(path) => read_config_file(path)?,
        None => {
            warn!("no config file given, using defaults");
            Config::default()
        }
    };

    if let Some(interval) = args.interval {
        config.interval_secs = interval;
    }

    if let Some(bind_addr) = args.bind.or_else(get_bind_addr) {
        config.api.bind_addr = bind_addr;
    }

    config.validate()?;
    Ok(config)
}

async fn open_backend(config: &StorageConfig) -> anyhow::Result<Option<(Box<dyn StorageBackend>, Option<u32>)>> {
    match config {
        StorageConfig::None => Ok(None),
        StorageConfig::Memory { capacity } => {
            Ok(Some((Box::new(MemoryBackend::with_capacity(*capacity)), None)))
        }
        #[cfg(feature = "storage-sqlite")]
        StorageConfig::Sqlite {
            path,
            retention_days,
        } => {
            let backend = host_monitor::storage::sqlite::SqliteBackend::new(path)
                .await
                .with_context(|| format!("failed to open database {}", path.display()))?;
            Ok(Some((Box::new(backend), Some(*retention_days))))
        }
        #[cfg(not(feature = "storage-sqlite"))]
        StorageConfig::Sqlite { .. } => {
            anyhow::bail!("sqlite storage requires the storage-sqlite feature")
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let args = Args::parse();
    init(args.log_level);
    trace!("started with args: {args:?}");

    let config = load_config(&args)?;
    debug!("using config: {config:?}");

    let policy = config.retention_policy()?;
    let monitor = Monitor::new(policy, config.settings()?);

    let storage = match open_backend(&config.storage).await? {
        Some((backend, retention_days)) => {
            match recent_samples(backend.as_ref(), policy, chrono::Utc::now()).await {
                Ok(samples) => {
                    monitor.restore_history(samples).await;
                }
                Err(e) => warn!("could not restore persisted samples: {e}"),
            }

            Some(StorageHandle::spawn(
                monitor.subscribe_samples(),
                backend,
                retention_days,
            ))
        }
        None => None,
    };

    let scheduler = SchedulerHandle::spawn(SystemSampler::new(), monitor.clone(), config.interval());
    if let Err(e) = scheduler.tick_now().await {
        error!("first tick failed: {e:#}");
    }

    #[cfg(feature = "api")]
    {
        use host_monitor::api::{ApiState, spawn_api_server};

        let state = ApiState::new(monitor.clone(), storage.clone());
        let addr = spawn_api_server(&config.api, state)
            .await
            .context("failed to start API server")?;
        info!("serving API on http://{addr}");
    }

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;
    info!("shutting down");

    if let Err(e) = scheduler.shutdown().await {
        error!("scheduler did not shut down cleanly: {e:#}");
    }

    if let Some(storage) = storage {
        storage.shutdown().await;
    }

    Ok(())
}
