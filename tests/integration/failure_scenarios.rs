//! Failure handling tests
//!
//! A failed tick leaves a gap and the loop keeps going; rejected samples
//! never reach the evaluator.

use std::time::Duration;

use assert_matches::assert_matches;
use host_monitor::{
    actors::SchedulerHandle,
    alerts::{AlertStatus, Metric, Threshold},
    sampler::SamplingError,
    settings::SettingsError,
    store::{StoreError, TimeRange},
};

use crate::helpers::*;

#[tokio::test]
async fn test_sampling_failure_leaves_gap() {
    let monitor = create_monitor(100, vec![cpu_threshold(80.0)]);
    let sampler = ScriptedSampler::new([create_sample(1, 10.0)]);
    sampler.push(Err(SamplingError::MemoryUnavailable(
        "total memory is zero".to_string(),
    )));
    sampler.push(Ok(create_sample(3, 10.0)));

    let scheduler =
        SchedulerHandle::spawn(sampler.clone(), monitor.clone(), Duration::from_secs(3600));

    tokio_test::assert_ok!(scheduler.tick_now().await);
    tokio_test::assert_err!(scheduler.tick_now().await);
    tokio_test::assert_ok!(scheduler.tick_now().await);

    let history = monitor.history(TimeRange::all(), None).await.unwrap();
    let timestamps: Vec<_> = history.iter().map(|s| s.timestamp).collect();
    assert_eq!(timestamps, vec![at(1), at(3)]);

    scheduler.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_out_of_order_sample_is_not_evaluated() {
    let monitor = create_monitor(100, vec![cpu_threshold(80.0)]);

    monitor.record(create_sample(5, 10.0)).await.unwrap();

    let rejected = monitor.record(create_sample(5, 99.0)).await;
    assert_matches!(rejected, Err(StoreError::OutOfOrderSample { .. }));

    let rejected = monitor.record(create_sample(4, 99.0)).await;
    assert_matches!(rejected, Err(StoreError::OutOfOrderSample { .. }));

    let states = monitor.alert_states().await;
    assert_eq!(states[0].status, AlertStatus::Normal);
    assert_eq!(monitor.current_metrics().await.unwrap().cpu_percent, 10.0);
    assert_eq!(monitor.stats().await.total_rejected, 2);
}

#[tokio::test]
async fn test_queries_on_empty_store() {
    let monitor = create_monitor(100, vec![]);

    assert_matches!(monitor.current_metrics().await, Err(StoreError::NotFound));
    assert!(
        monitor
            .history(TimeRange::all(), None)
            .await
            .unwrap()
            .is_empty()
    );
    assert_matches!(
        monitor.history(TimeRange::between(at(5), at(1)), None).await,
        Err(StoreError::InvalidRange { .. })
    );
}

#[tokio::test]
async fn test_invalid_threshold_changes_are_rejected() {
    let monitor = create_monitor(100, vec![]);
    monitor.record(create_sample(1, 10.0)).await.unwrap();

    assert_matches!(
        monitor.put_threshold(Threshold::new(Metric::Cpu, 101.0)).await,
        Err(SettingsError::InvalidLimit(_))
    );
    assert_matches!(
        monitor
            .put_threshold(Threshold::new(Metric::Memory, 80.0).with_clear_percent(90.0))
            .await,
        Err(SettingsError::InvalidLimit(_))
    );
    assert_matches!(
        monitor
            .put_threshold(Threshold::new(Metric::disk("/mnt/usb"), 80.0))
            .await,
        Err(SettingsError::UnknownMountPoint(_))
    );
    assert_matches!(
        monitor.delete_threshold(&Metric::Cpu).await,
        Err(SettingsError::UnknownThreshold(Metric::Cpu))
    );

    assert!(monitor.thresholds().is_empty());
}
