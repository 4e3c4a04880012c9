//! SQLite persistence backend
//!
//! Stores samples in a local database file opened in WAL mode, so the
//! dashboard can read history while the storage actor writes. The schema is
//! created and versioned through the migrations in `./migrations`.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous,
};
use sqlx::{Pool, Row, Sqlite};
use tracing::{debug, info, instrument, warn};

use super::backend::{BackendStats, HealthStatus, QueryRange, StorageBackend};
use super::error::{StorageError, StorageResult};
use super::schema::SampleRecord;

const SELECT_COLUMNS: &str = "timestamp, cpu_percent, memory_used, memory_total, \
     net_rx_per_sec, net_tx_per_sec, net_rx_total, net_tx_total, disks";

pub struct SqliteBackend {
    pool: Pool<Sqlite>,
    db_path: String,
}

impl SqliteBackend {
    /// Open (or create) the database at `db_path` and run migrations
    #[instrument(skip_all)]
    pub async fn new(db_path: impl AsRef<Path>) -> StorageResult<Self> {
        let db_path = db_path.as_ref().to_string_lossy().to_string();

        info!("opening sample database at {db_path}");

        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(std::time::Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::ConnectionFailed(e.to_string()))?;

        debug!("running database migrations");
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool, db_path })
    }

    fn millis_to_timestamp(millis: i64) -> StorageResult<DateTime<Utc>> {
        DateTime::from_timestamp_millis(millis).ok_or_else(|| {
            StorageError::SerializationError(format!("timestamp out of range: {millis}"))
        })
    }

    fn record_from_row(row: &SqliteRow) -> StorageResult<SampleRecord> {
        let disks: String = row.try_get("disks")?;

        Ok(SampleRecord {
            timestamp: Self::millis_to_timestamp(row.try_get("timestamp")?)?,
            cpu_percent: row.try_get::<f64, _>("cpu_percent")? as f32,
            memory_used: row.try_get::<i64, _>("memory_used")? as u64,
            memory_total: row.try_get::<i64, _>("memory_total")? as u64,
            net_rx_per_sec: row.try_get::<i64, _>("net_rx_per_sec")? as u64,
            net_tx_per_sec: row.try_get::<i64, _>("net_tx_per_sec")? as u64,
            net_rx_total: row.try_get::<i64, _>("net_rx_total")? as u64,
            net_tx_total: row.try_get::<i64, _>("net_tx_total")? as u64,
            disks: SampleRecord::parse_disks(&disks)?,
        })
    }

    fn records_from_rows(rows: &[SqliteRow]) -> StorageResult<Vec<SampleRecord>> {
        rows.iter().map(Self::record_from_row).collect()
    }
}

#[async_trait]
impl StorageBackend for SqliteBackend {
    #[instrument(skip(self, samples), fields(count = samples.len()))]
    async fn insert_batch(&self, samples: Vec<SampleRecord>) -> StorageResult<()> {
        if samples.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        for sample in &samples {
            sqlx::query(
                r#"
                INSERT INTO samples (
                    timestamp, cpu_percent, memory_used, memory_total,
                    net_rx_per_sec, net_tx_per_sec, net_rx_total, net_tx_total, disks
                )
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT (timestamp) DO UPDATE SET
                    cpu_percent = excluded.cpu_percent,
                    memory_used = excluded.memory_used,
                    memory_total = excluded.memory_total,
                    net_rx_per_sec = excluded.net_rx_per_sec,
                    net_tx_per_sec = excluded.net_tx_per_sec,
                    net_rx_total = excluded.net_rx_total,
                    net_tx_total = excluded.net_tx_total,
                    disks = excluded.disks
                "#,
            )
            .bind(sample.timestamp.timestamp_millis())
            .bind(sample.cpu_percent as f64)
            .bind(sample.memory_used as i64)
            .bind(sample.memory_total as i64)
            .bind(sample.net_rx_per_sec as i64)
            .bind(sample.net_tx_per_sec as i64)
            .bind(sample.net_rx_total as i64)
            .bind(sample.net_tx_total as i64)
            .bind(sample.disks_json()?)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        debug!("inserted {} samples", samples.len());
        Ok(())
    }

    #[instrument(skip(self), fields(start = %query.start, end = %query.end))]
    async fn query_range(&self, query: QueryRange) -> StorageResult<Vec<SampleRecord>> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM samples \
             WHERE timestamp >= ? AND timestamp <= ? \
             ORDER BY timestamp ASC LIMIT ?"
        );

        // LIMIT -1 means no limit in SQLite
        let limit = query.limit.map(|l| l as i64).unwrap_or(-1);

        let rows = sqlx::query(&sql)
            .bind(query.start.timestamp_millis())
            .bind(query.end.timestamp_millis())
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        let records = Self::records_from_rows(&rows)?;
        debug!("query returned {} samples", records.len());
        Ok(records)
    }

    #[instrument(skip(self))]
    async fn query_latest(&self, limit: usize) -> StorageResult<Vec<SampleRecord>> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM samples ORDER BY timestamp DESC LIMIT ?");

        let rows = sqlx::query(&sql)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        let mut records = Self::records_from_rows(&rows)?;
        records.reverse();
        Ok(records)
    }

    #[instrument(skip(self), fields(before = %before))]
    async fn cleanup_old_samples(&self, before: DateTime<Utc>) -> StorageResult<usize> {
        let result = sqlx::query("DELETE FROM samples WHERE timestamp < ?")
            .bind(before.timestamp_millis())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() as usize)
    }

    #[instrument(skip(self))]
    async fn health_check(&self) -> StorageResult<HealthStatus> {
        match sqlx::query("SELECT 1").fetch_one(&self.pool).await {
            Ok(_) => Ok(HealthStatus {
                healthy: true,
                message: "SQLite backend operational".to_string(),
                metadata: HashMap::from([
                    ("backend".to_string(), "sqlite".to_string()),
                    ("db_path".to_string(), self.db_path.clone()),
                ]),
            }),
            Err(e) => {
                warn!("health check failed: {e}");
                Ok(HealthStatus {
                    healthy: false,
                    message: format!("health check failed: {e}"),
                    metadata: HashMap::new(),
                })
            }
        }
    }

    #[instrument(skip(self))]
    async fn get_stats(&self) -> StorageResult<BackendStats> {
        let (total, oldest, newest): (i64, Option<i64>, Option<i64>) =
            sqlx::query_as("SELECT COUNT(*), MIN(timestamp), MAX(timestamp) FROM samples")
                .fetch_one(&self.pool)
                .await?;

        let size_bytes = std::fs::metadata(&self.db_path).map(|m| m.len()).ok();

        Ok(BackendStats {
            backend: "sqlite".to_string(),
            total_samples: total as u64,
            oldest: oldest.map(Self::millis_to_timestamp).transpose()?,
            newest: newest.map(Self::millis_to_timestamp).transpose()?,
            size_bytes,
        })
    }

    async fn close(&self) -> StorageResult<()> {
        info!("closing SQLite backend");
        self.pool.close().await;
        Ok(())
    }
}
