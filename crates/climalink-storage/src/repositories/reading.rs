use std::future::Future;

use crate::error::{StorageError, StorageResult};
use crate::models::{Reading, ReadingBucket};
use chrono::DateTime;
use sqlx::SqlitePool;

/// Repository trait for sensor readings
///
/// The persistence loop appends through this trait and the chart queries
/// read through it. Futures are `Send` so that loops generic over the
/// repository can be spawned.
pub trait ReadingRepository: Send + Sync {
    /// Append a reading, returning its id
    fn create(&self, reading: &Reading) -> impl Future<Output = StorageResult<i64>> + Send;

    /// The `limit` most recent readings, newest first
    fn find_recent(&self, limit: i64) -> impl Future<Output = StorageResult<Vec<Reading>>> + Send;

    /// Readings averaged over `interval_secs` windows, newest `limit`
    /// windows first
    fn find_grouped(
        &self,
        interval_secs: i64,
        limit: i64,
    ) -> impl Future<Output = StorageResult<Vec<ReadingBucket>>> + Send;

    /// Total number of stored readings
    fn count(&self) -> impl Future<Output = StorageResult<i64>> + Send;
}

/// SQLite implementation of ReadingRepository
#[derive(Debug, Clone)]
pub struct SqliteReadingRepository {
    pool: SqlitePool,
}

impl SqliteReadingRepository {
    /// Create a new SQLite reading repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct BucketRow {
    bucket_start: i64,
    temperature: f64,
    humidity: f64,
    samples: i64,
}

fn ensure_positive(name: &str, value: i64) -> StorageResult<()> {
    if value <= 0 {
        return Err(StorageError::Validation(format!(
            "{} must be positive, got {}",
            name, value
        )));
    }
    Ok(())
}

impl ReadingRepository for SqliteReadingRepository {
    async fn create(&self, reading: &Reading) -> StorageResult<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO readings (temperature, humidity, recorded_at)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(reading.temperature)
        .bind(reading.humidity)
        .bind(reading.recorded_at)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn find_recent(&self, limit: i64) -> StorageResult<Vec<Reading>> {
        ensure_positive("limit", limit)?;

        let readings = sqlx::query_as::<_, Reading>(
            r#"
            SELECT id, temperature, humidity, recorded_at
            FROM readings
            ORDER BY recorded_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(readings)
    }

    async fn find_grouped(&self, interval_secs: i64, limit: i64) -> StorageResult<Vec<ReadingBucket>> {
        ensure_positive("interval_secs", interval_secs)?;
        ensure_positive("limit", limit)?;

        let rows = sqlx::query_as::<_, BucketRow>(
            r#"
            SELECT (CAST(strftime('%s', recorded_at) AS INTEGER) / ?1) * ?1 AS bucket_start,
                   AVG(temperature) AS temperature,
                   AVG(humidity) AS humidity,
                   COUNT(*) AS samples
            FROM readings
            GROUP BY bucket_start
            ORDER BY bucket_start DESC
            LIMIT ?2
            "#,
        )
        .bind(interval_secs)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let bucket_start = DateTime::from_timestamp(row.bucket_start, 0).ok_or_else(|| {
                    StorageError::DateTime(format!("bucket start out of range: {}", row.bucket_start))
                })?;
                Ok(ReadingBucket {
                    bucket_start,
                    temperature: row.temperature,
                    humidity: row.humidity,
                    samples: row.samples,
                })
            })
            .collect()
    }

    async fn count(&self) -> StorageResult<i64> {
        let result: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM readings")
            .fetch_one(&self.pool)
            .await?;

        Ok(result.0)
    }
}
