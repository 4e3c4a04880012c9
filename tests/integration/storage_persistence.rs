//! Persistence tests against a real SQLite file
//!
//! Samples recorded in one run are restored into a fresh store on the next.

use std::time::Duration;

use host_monitor::{
    actors::{SchedulerHandle, StorageHandle},
    storage::{StorageBackend, recent_samples, sqlite::SqliteBackend},
    store::{RetentionPolicy, TimeRange},
};
use pretty_assertions::assert_eq;
use tempfile::tempdir;

use crate::helpers::*;

#[tokio::test]
async fn test_samples_survive_restart() {
    let temp_dir = tempdir().unwrap();
    let db_path = temp_dir.path().join("samples.db");

    // first run
    {
        let monitor = create_monitor(100, vec![cpu_threshold(80.0)]);
        let backend = SqliteBackend::new(&db_path).await.unwrap();
        let storage = StorageHandle::spawn(monitor.subscribe_samples(), Box::new(backend), None);

        let sampler = ScriptedSampler::new((1..=5).map(|secs| create_sample(secs, secs as f32)));
        let scheduler = SchedulerHandle::spawn(sampler, monitor, Duration::from_secs(3600));
        for _ in 0..5 {
            scheduler.tick_now().await.unwrap();
        }

        scheduler.shutdown().await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        storage.shutdown().await;
    }

    // second run
    let backend = SqliteBackend::new(&db_path).await.unwrap();
    let restored = recent_samples(&backend, RetentionPolicy::max_samples(3).unwrap(), at(10))
        .await
        .unwrap();

    let monitor = create_monitor(3, vec![]);
    assert_eq!(monitor.restore_history(restored).await, 3);

    let history = monitor.history(TimeRange::all(), None).await.unwrap();
    let timestamps: Vec<_> = history.iter().map(|s| s.timestamp).collect();
    assert_eq!(timestamps, vec![at(3), at(4), at(5)]);
    assert_eq!(history[2].cpu_percent, 5.0);
    assert_eq!(history[2].disks.len(), 2);

    // new samples continue after the restored ones
    monitor.record(create_sample(6, 1.0)).await.unwrap();
    assert!(monitor.record(create_sample(5, 1.0)).await.is_err());

    backend.close().await.unwrap();
}

#[tokio::test]
async fn test_storage_actor_reports_backend_stats() {
    let temp_dir = tempdir().unwrap();
    let monitor = create_monitor(100, vec![]);
    let backend = SqliteBackend::new(temp_dir.path().join("samples.db"))
        .await
        .unwrap();
    let storage = StorageHandle::spawn(monitor.subscribe_samples(), Box::new(backend), None);

    for secs in 1..=4 {
        monitor.record(create_sample(secs, 10.0)).await.unwrap();
    }
    tokio::time::sleep(Duration::from_millis(50)).await;
    storage.flush().await.unwrap();

    let stats = storage.get_stats().await.unwrap();
    let backend_stats = stats.backend.unwrap();
    assert_eq!(backend_stats.backend, "sqlite");
    assert_eq!(backend_stats.total_samples, 4);
    assert_eq!(backend_stats.oldest, Some(at(1)));
    assert_eq!(backend_stats.newest, Some(at(4)));

    assert!(storage.health_check().await.unwrap().healthy);

    storage.shutdown().await;
}
