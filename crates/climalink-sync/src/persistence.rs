//! Periodic sampling of the state store into the readings table.
//!
//! The first sample is taken one period after start. Sample timestamps are a
//! wall-clock anchor taken at start plus monotonic time elapsed since, so they
//! strictly increase even when the system clock is stepped.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use climalink_storage::{Reading, ReadingRepository, StorageResult};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::error::{BridgeError, Result};
use crate::store::StateStore;

/// Samples the store every `period` and appends a [`Reading`].
pub struct PersistenceLoop<R> {
    store: Arc<StateStore>,
    repository: Arc<R>,
    period: Duration,
    anchor_wall: DateTime<Utc>,
    anchor_instant: Instant,
    first_tick: Instant,
}

impl<R> std::fmt::Debug for PersistenceLoop<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceLoop")
            .field("period", &self.period)
            .field("anchor_wall", &self.anchor_wall)
            .finish_non_exhaustive()
    }
}

impl<R: ReadingRepository> PersistenceLoop<R> {
    /// Create a loop anchored at the current time.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Config`] if `period` is zero or too large to
    /// schedule.
    pub fn new(store: Arc<StateStore>, repository: Arc<R>, period: Duration) -> Result<Self> {
        let invalid_period = || {
            BridgeError::Config(climalink_core::Error::invalid_value(
                "db_store_interval_secs",
                period.as_secs(),
            ))
        };
        if period.is_zero() {
            return Err(invalid_period());
        }

        let anchor_instant = Instant::now();
        let first_tick = anchor_instant.checked_add(period).ok_or_else(invalid_period)?;

        Ok(Self {
            store,
            repository,
            period,
            anchor_wall: Utc::now(),
            anchor_instant,
            first_tick,
        })
    }

    /// Timestamp recorded for a sample taken at `at`.
    pub fn timestamp_at(&self, at: Instant) -> DateTime<Utc> {
        let elapsed = at.saturating_duration_since(self.anchor_instant);
        TimeDelta::from_std(elapsed)
            .ok()
            .and_then(|delta| self.anchor_wall.checked_add_signed(delta))
            .unwrap_or_else(Utc::now)
    }

    /// Take one sample and store it.
    pub async fn tick(&self, at: Instant) -> StorageResult<i64> {
        let state = self.store.snapshot();
        let reading = Reading::new(state.temperature, state.humidity, self.timestamp_at(at));

        let id = self.repository.create(&reading).await?;
        debug!(
            id,
            temperature = reading.temperature,
            humidity = reading.humidity,
            recorded_at = %reading.recorded_at,
            "Reading stored"
        );
        Ok(id)
    }

    /// Sample forever. Storage failures are logged and the next tick proceeds.
    pub async fn run(self) -> Result<()> {
        info!(period_secs = self.period.as_secs_f64(), "Persistence loop starting");

        let mut interval = tokio::time::interval_at(self.first_tick, self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let at = interval.tick().await;
            if let Err(e) = self.tick(at).await {
                warn!(error = %e, "Failed to store reading");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use climalink_core::Telemetry;
    use climalink_storage::{Database, SqliteReadingRepository};

    async fn sqlite() -> Arc<SqliteReadingRepository> {
        let db = Database::in_memory().await.unwrap();
        Arc::new(SqliteReadingRepository::new(db.pool().clone()))
    }

    #[tokio::test]
    async fn test_zero_period_rejected() {
        let result = PersistenceLoop::new(Arc::new(StateStore::new()), sqlite().await, Duration::ZERO);
        assert!(matches!(result, Err(BridgeError::Config(_))));
    }

    #[tokio::test]
    async fn test_unschedulable_period_rejected() {
        let result = PersistenceLoop::new(
            Arc::new(StateStore::new()),
            sqlite().await,
            Duration::from_secs(u64::MAX),
        );
        assert!(matches!(result, Err(BridgeError::Config(_))));
    }

    #[tokio::test]
    async fn test_tick_stores_current_sensor_values() {
        let store = Arc::new(StateStore::new());
        let repository = sqlite().await;
        let persistence =
            PersistenceLoop::new(store.clone(), repository.clone(), Duration::from_secs(5)).unwrap();

        store.apply_telemetry(Telemetry {
            led: true,
            fan: false,
            temperature: 26.5,
            humidity: 33.0,
        });
        persistence.tick(Instant::now()).await.unwrap();

        let readings = repository.find_recent(10).await.unwrap();
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].temperature, 26.5);
        assert_eq!(readings[0].humidity, 33.0);
    }

    #[tokio::test]
    async fn test_timestamps_follow_monotonic_offsets() {
        let persistence = PersistenceLoop::new(
            Arc::new(StateStore::new()),
            sqlite().await,
            Duration::from_secs(5),
        )
        .unwrap();
        let anchor = persistence.anchor_instant;

        let first = persistence.timestamp_at(anchor + Duration::from_secs(5));
        let second = persistence.timestamp_at(anchor + Duration::from_secs(10));

        assert_eq!(second - first, TimeDelta::seconds(5));
        assert_eq!(first - persistence.anchor_wall, TimeDelta::seconds(5));
    }
}
