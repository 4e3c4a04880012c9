//! StorageActor - persists samples to a backend
//!
//! Subscribes to [`SampleEvent`]s and writes them in batches.
//!
//! ## Batching Strategy
//!
//! - **Size trigger**: flush once 50 samples are buffered
//! - **Time trigger**: flush every 10 seconds
//!
//! A failed flush drops that batch; the in-memory store is unaffected.
//! With `retention_days` set, records older than that are deleted on
//! startup and then once a day.

use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time;
use tracing::{debug, error, info, instrument, trace, warn};

use super::messages::{SampleEvent, StorageCommand, StorageStats};
use crate::storage::{HealthStatus, SampleRecord, StorageBackend};

const BATCH_SIZE_TRIGGER: usize = 50;

const BATCH_TIME_TRIGGER: Duration = Duration::from_secs(10);

const CLEANUP_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

pub struct StorageActor {
    backend: Box<dyn StorageBackend>,
    batch_buffer: Vec<SampleRecord>,
    command_rx: mpsc::Receiver<StorageCommand>,
    sample_rx: broadcast::Receiver<SampleEvent>,
    retention_days: Option<u32>,

    flush_count: u64,
    failed_flushes: u64,
    total_persisted: u64,
    total_lagged: u64,
    last_cleanup_time: Option<DateTime<Utc>>,
    total_deleted: u64,
}

impl StorageActor {
    pub fn new(
        command_rx: mpsc::Receiver<StorageCommand>,
        sample_rx: broadcast::Receiver<SampleEvent>,
        backend: Box<dyn StorageBackend>,
        retention_days: Option<u32>,
    ) -> Self {
        if let Some(days) = retention_days {
            debug!("retention cleanup enabled: {days} days");
        }

        Self {
            backend,
            batch_buffer: Vec::with_capacity(BATCH_SIZE_TRIGGER),
            command_rx,
            sample_rx,
            retention_days,
            flush_count: 0,
            failed_flushes: 0,
            total_persisted: 0,
            total_lagged: 0,
            last_cleanup_time: None,
            total_deleted: 0,
        }
    }

    #[instrument(skip(self))]
    pub async fn run(mut self) {
        debug!("starting storage actor");

        let has_retention = self.retention_days.is_some();
        let mut flush_interval =
            time::interval_at(time::Instant::now() + BATCH_TIME_TRIGGER, BATCH_TIME_TRIGGER);
        // first tick fires immediately, which doubles as the startup cleanup
        let mut cleanup_interval = time::interval(CLEANUP_INTERVAL);

        loop {
            tokio::select! {
                result = self.sample_rx.recv() => {
                    match result {
                        Ok(event) => self.buffer_sample(event).await,
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!("storage actor lagged, skipped {skipped} samples");
                            self.total_lagged += skipped;
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            debug!("sample channel closed, shutting down");
                            break;
                        }
                    }
                }

                _ = flush_interval.tick() => {
                    if !self.batch_buffer.is_empty() {
                        trace!("time-based flush triggered ({} samples)", self.batch_buffer.len());
                        self.flush_batch().await;
                    }
                }

                _ = cleanup_interval.tick(), if has_retention => {
                    self.run_cleanup().await;
                }

                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(StorageCommand::Shutdown) => {
                            debug!("received shutdown command");
                            break;
                        }
                        Some(cmd) => self.handle_command(cmd).await,
                        None => {
                            warn!("command channel closed, shutting down");
                            break;
                        }
                    }
                }
            }
        }

        if !self.batch_buffer.is_empty() {
            debug!(
                "final flush before shutdown ({} samples)",
                self.batch_buffer.len()
            );
            self.flush_batch().await;
        }

        if let Err(e) = self.backend.close().await {
            error!("error closing backend: {e}");
        }

        debug!("storage actor stopped");
    }

    async fn buffer_sample(&mut self, event: SampleEvent) {
        self.batch_buffer
            .push(SampleRecord::from_sample(&event.sample));

        if self.batch_buffer.len() >= BATCH_SIZE_TRIGGER {
            trace!(
                "size-based flush triggered ({} samples)",
                self.batch_buffer.len()
            );
            self.flush_batch().await;
        }
    }

    async fn flush_batch(&mut self) -> bool {
        if self.batch_buffer.is_empty() {
            return true;
        }

        let batch: Vec<SampleRecord> = self.batch_buffer.drain(..).collect();
        let batch_size = batch.len();

        match self.backend.insert_batch(batch).await {
            Ok(()) => {
                self.flush_count += 1;
                self.total_persisted += batch_size as u64;
                trace!("flush #{} complete ({batch_size} samples)", self.flush_count);
                true
            }
            Err(e) => {
                self.failed_flushes += 1;
                error!("failed to flush {batch_size} samples: {e}");
                false
            }
        }
    }

    async fn run_cleanup(&mut self) {
        let Some(retention_days) = self.retention_days else {
            return;
        };

        let cutoff = Utc::now() - chrono::Duration::days(retention_days as i64);
        debug!("running retention cleanup (deleting samples before {cutoff})");

        match self.backend.cleanup_old_samples(cutoff).await {
            Ok(deleted) => {
                self.last_cleanup_time = Some(Utc::now());
                self.total_deleted += deleted as u64;
                if deleted > 0 {
                    info!("retention cleanup deleted {deleted} old samples");
                }
            }
            Err(e) => error!("failed to clean up old samples: {e}"),
        }
    }

    async fn handle_command(&mut self, cmd: StorageCommand) {
        match cmd {
            StorageCommand::Flush { respond_to } => {
                debug!("manual flush requested");
                let result = if self.flush_batch().await {
                    Ok(())
                } else {
                    Err(anyhow::anyhow!("flush failed, batch dropped"))
                };
                let _ = respond_to.send(result);
            }

            StorageCommand::GetStats { respond_to } => {
                let _ = respond_to.send(self.get_stats().await);
            }

            StorageCommand::QueryLatest { limit, respond_to } => {
                let result = self.backend.query_latest(limit).await.map_err(Into::into);
                let _ = respond_to.send(result);
            }

            StorageCommand::HealthCheck { respond_to } => {
                let result = self.backend.health_check().await.map_err(Into::into);
                let _ = respond_to.send(result);
            }

            StorageCommand::Shutdown => {}
        }
    }

    async fn get_stats(&self) -> StorageStats {
        let backend = match self.backend.get_stats().await {
            Ok(stats) => Some(stats),
            Err(e) => {
                warn!("failed to read backend stats: {e}");
                None
            }
        };

        StorageStats {
            buffered: self.batch_buffer.len(),
            flush_count: self.flush_count,
            failed_flushes: self.failed_flushes,
            total_persisted: self.total_persisted,
            total_lagged: self.total_lagged,
            last_cleanup_time: self.last_cleanup_time,
            total_deleted: self.total_deleted,
            backend,
        }
    }
}

/// Handle for controlling the [`StorageActor`]
#[derive(Clone)]
pub struct StorageHandle {
    sender: mpsc::Sender<StorageCommand>,
}

impl StorageHandle {
    pub fn spawn(
        sample_rx: broadcast::Receiver<SampleEvent>,
        backend: Box<dyn StorageBackend>,
        retention_days: Option<u32>,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);

        let actor = StorageActor::new(cmd_rx, sample_rx, backend, retention_days);
        tokio::spawn(actor.run());

        Self { sender: cmd_tx }
    }

    pub async fn flush(&self) -> anyhow::Result<()> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(StorageCommand::Flush { respond_to: tx })
            .await
            .context("failed to send Flush command")?;

        rx.await.context("failed to receive response")?
    }

    pub async fn get_stats(&self) -> Option<StorageStats> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(StorageCommand::GetStats { respond_to: tx })
            .await
            .ok()?;

        rx.await.ok()
    }

    pub async fn query_latest(&self, limit: usize) -> anyhow::Result<Vec<SampleRecord>> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(StorageCommand::QueryLatest {
                limit,
                respond_to: tx,
            })
            .await
            .context("failed to send QueryLatest command")?;

        rx.await.context("failed to receive response")?
    }

    pub async fn health_check(&self) -> anyhow::Result<HealthStatus> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(StorageCommand::HealthCheck { respond_to: tx })
            .await
            .context("failed to send HealthCheck command")?;

        rx.await.context("failed to receive response")?
    }

    /// Flush remaining samples, close the backend and wait for the actor to
    /// stop
    pub async fn shutdown(&self) {
        if self.sender.send(StorageCommand::Shutdown).await.is_ok() {
            self.sender.closed().await;
        }
    }
}
