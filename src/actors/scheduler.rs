//! SchedulerActor - drives the sampling ticks
//!
//! The scheduler is the single writer of the sample store. Each tick takes
//! one sample, appends it and evaluates the thresholds. A failed tick is
//! logged and leaves a gap in the history; the loop keeps going.
//!
//! ## Message Flow
//!
//! ```text
//! Timer tick → Sample (blocking pool) → Monitor::record → SampleEvent / AlertTransition
//!     ↑
//!     └─── Commands (TickNow, UpdateInterval, Shutdown)
//! ```

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};
use tracing::{debug, error, instrument, trace, warn};

use crate::monitor::{Monitor, TickReport};
use crate::sampler::Sampler;

use super::messages::SchedulerCommand;

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(2);

/// Ticker whose first tick is one full period away
fn new_ticker(period: Duration) -> Interval {
    let mut ticker = interval_at(Instant::now() + period, period);
    // a slow tick pushes the next one back instead of bursting
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

pub struct SchedulerActor<S: Sampler> {
    sampler: Arc<Mutex<S>>,
    monitor: Monitor,
    command_rx: mpsc::Receiver<SchedulerCommand>,
    interval_duration: Duration,
}

impl<S: Sampler> SchedulerActor<S> {
    pub fn new(
        sampler: S,
        monitor: Monitor,
        command_rx: mpsc::Receiver<SchedulerCommand>,
        interval_duration: Duration,
    ) -> Self {
        let interval_duration = if interval_duration.is_zero() {
            warn!("tick interval must be positive, using {DEFAULT_INTERVAL:?}");
            DEFAULT_INTERVAL
        } else {
            interval_duration
        };

        Self {
            sampler: Arc::new(Mutex::new(sampler)),
            monitor,
            command_rx,
            interval_duration,
        }
    }

    /// Run until shut down or until every handle is dropped
    #[instrument(skip(self), fields(interval = ?self.interval_duration))]
    pub async fn run(mut self) {
        debug!("starting scheduler");

        let mut ticker = new_ticker(self.interval_duration);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.tick().await {
                        error!("tick failed: {e:#}");
                    }
                }

                cmd = self.command_rx.recv() => {
                    let Some(cmd) = cmd else {
                        debug!("every handle dropped, shutting down");
                        break;
                    };

                    match cmd {
                        SchedulerCommand::TickNow { respond_to } => {
                            debug!("received TickNow command");
                            let result = self.tick().await;
                            if let Err(e) = &result {
                                error!("tick failed: {e:#}");
                            }
                            let _ = respond_to.send(result);
                        }

                        SchedulerCommand::UpdateInterval { interval_secs } => {
                            if interval_secs == 0 {
                                warn!("ignoring zero tick interval");
                                continue;
                            }
                            debug!("updating interval to {interval_secs}s");
                            self.interval_duration = Duration::from_secs(interval_secs);
                            ticker = new_ticker(self.interval_duration);
                        }

                        SchedulerCommand::Shutdown => {
                            debug!("received shutdown command");
                            break;
                        }
                    }
                }
            }
        }

        debug!("scheduler stopped");
    }

    /// Sample, append, evaluate
    ///
    /// Ticks are awaited one at a time by the loop, so they never overlap.
    async fn tick(&self) -> Result<TickReport> {
        let sampler = self.sampler.clone();

        let sample = tokio::task::spawn_blocking(move || {
            // a panic in a previous sample must not stop sampling for good
            let mut sampler = sampler.lock().unwrap_or_else(PoisonError::into_inner);
            sampler.sample()
        })
        .await
        .context("sampling task failed")?
        .context("failed to take sample")?;

        let report = self
            .monitor
            .record(sample)
            .await
            .context("failed to store sample")?;

        trace!(
            "tick at {} complete, {} evicted, {} transitions",
            report.timestamp,
            report.evicted,
            report.transitions.len()
        );

        Ok(report)
    }
}

/// Handle for controlling a running [`SchedulerActor`]
#[derive(Clone)]
pub struct SchedulerHandle {
    sender: mpsc::Sender<SchedulerCommand>,
}

impl SchedulerHandle {
    pub fn spawn<S: Sampler>(sampler: S, monitor: Monitor, interval: Duration) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);

        let actor = SchedulerActor::new(sampler, monitor, cmd_rx, interval);
        tokio::spawn(actor.run());

        Self { sender: cmd_tx }
    }

    /// Run one tick now and return its outcome
    pub async fn tick_now(&self) -> Result<TickReport> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(SchedulerCommand::TickNow { respond_to: tx })
            .await
            .context("failed to send TickNow command")?;

        rx.await.context("failed to receive response")?
    }

    pub async fn update_interval(&self, interval_secs: u64) -> Result<()> {
        self.sender
            .send(SchedulerCommand::UpdateInterval { interval_secs })
            .await
            .context("failed to send UpdateInterval command")?;
        Ok(())
    }

    /// Stop the scheduler and wait for its loop to exit
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(SchedulerCommand::Shutdown)
            .await
            .context("failed to send Shutdown command")?;
        self.sender.closed().await;
        Ok(())
    }
}
