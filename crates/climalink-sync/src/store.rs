//! Shared view of the device.
//!
//! The store is the only mutable state shared between the API surface and the
//! background loops. All four fields live behind one lock, so a snapshot can
//! never mix values from two different telemetry frames.

use chrono::{DateTime, Utc};
use climalink_core::{DesiredState, DeviceState, Telemetry};
use parking_lot::RwLock;
use tokio::sync::watch;
use tracing::trace;

/// Result of [`StateStore::set_desired`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DesiredUpdate {
    /// Full state right after the update.
    pub state: DeviceState,
    /// Desired generation assigned to this update.
    pub generation: u64,
}

#[derive(Debug, Default)]
struct Inner {
    state: DeviceState,
    generation: u64,
    last_telemetry_at: Option<DateTime<Utc>>,
}

/// Thread-safe device state.
///
/// # Examples
///
/// ```
/// use climalink_core::DesiredState;
/// use climalink_sync::StateStore;
///
/// let store = StateStore::new();
/// let update = store.set_desired(DesiredState::new(true, false));
///
/// assert_eq!(update.generation, 1);
/// assert!(store.snapshot().led);
/// ```
#[derive(Debug)]
pub struct StateStore {
    inner: RwLock<Inner>,
    /// Bumped on every write; receivers only see "something changed".
    changes: watch::Sender<u64>,
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StateStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            changes: watch::Sender::new(0),
        }
    }

    /// Consistent copy of the current state.
    pub fn snapshot(&self) -> DeviceState {
        self.inner.read().state
    }

    /// Overwrite every field with a device report.
    pub fn apply_telemetry(&self, telemetry: Telemetry) -> DeviceState {
        let state = {
            let mut inner = self.inner.write();
            inner.state = inner.state.with_telemetry(telemetry);
            inner.last_telemetry_at = Some(Utc::now());
            inner.state
        };

        trace!(?state, "Telemetry applied");
        self.notify();
        state
    }

    /// Record what a client wants the actuators to be.
    ///
    /// Sensor values are kept. The update is visible to [`snapshot`]
    /// immediately; sending it to the device happens elsewhere.
    ///
    /// [`snapshot`]: Self::snapshot
    pub fn set_desired(&self, desired: DesiredState) -> DesiredUpdate {
        let update = {
            let mut inner = self.inner.write();
            inner.state = inner.state.with_desired(desired);
            inner.generation += 1;
            DesiredUpdate {
                state: inner.state,
                generation: inner.generation,
            }
        };

        trace!(generation = update.generation, ?desired, "Desired state set");
        self.notify();
        update
    }

    /// State and desired generation, read together.
    pub fn desired_snapshot(&self) -> (DeviceState, u64) {
        let inner = self.inner.read();
        (inner.state, inner.generation)
    }

    /// Current desired generation; 0 until the first [`set_desired`].
    ///
    /// [`set_desired`]: Self::set_desired
    pub fn generation(&self) -> u64 {
        self.inner.read().generation
    }

    /// When the device last reported, if ever.
    pub fn last_telemetry_at(&self) -> Option<DateTime<Utc>> {
        self.inner.read().last_telemetry_at
    }

    /// Receiver that wakes up on every write.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }

    fn notify(&self) {
        self.changes.send_modify(|version| *version = version.wrapping_add(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn telemetry(led: bool, fan: bool, temperature: f64, humidity: f64) -> Telemetry {
        Telemetry {
            led,
            fan,
            temperature,
            humidity,
        }
    }

    #[test]
    fn test_initial_state() {
        let store = StateStore::new();

        assert_eq!(store.snapshot(), DeviceState::default());
        assert_eq!(store.generation(), 0);
        assert!(store.last_telemetry_at().is_none());
    }

    #[test]
    fn test_apply_telemetry_replaces_all_fields() {
        let store = StateStore::new();
        store.set_desired(DesiredState::new(true, true));

        let state = store.apply_telemetry(telemetry(false, true, 23.5, 41.0));

        assert_eq!(state, store.snapshot());
        assert!(!state.led);
        assert!(state.fan);
        assert_eq!(state.temperature, 23.5);
        assert_eq!(state.humidity, 41.0);
        assert!(store.last_telemetry_at().is_some());
    }

    #[test]
    fn test_set_desired_visible_immediately() {
        let store = StateStore::new();
        store.apply_telemetry(telemetry(false, false, 20.0, 50.0));

        let update = store.set_desired(DesiredState::new(true, false));

        let snapshot = store.snapshot();
        assert_eq!(update.state, snapshot);
        assert!(snapshot.led);
        assert!(!snapshot.fan);
        assert_eq!(snapshot.temperature, 20.0);
        assert_eq!(snapshot.humidity, 50.0);
    }

    #[test]
    fn test_generation_increments_per_desired_write() {
        let store = StateStore::new();

        let first = store.set_desired(DesiredState::new(true, false));
        store.apply_telemetry(telemetry(true, false, 1.0, 1.0));
        let second = store.set_desired(DesiredState::new(false, false));

        assert_eq!(first.generation, 1);
        assert_eq!(second.generation, 2);
        assert_eq!(store.desired_snapshot().1, 2);
    }

    #[tokio::test]
    async fn test_subscribers_see_changes() {
        let store = StateStore::new();
        let mut changes = store.subscribe();

        store.set_desired(DesiredState::new(true, true));
        changes.changed().await.unwrap();
        let seen = *changes.borrow_and_update();

        store.apply_telemetry(telemetry(true, true, 0.0, 0.0));
        changes.changed().await.unwrap();
        assert!(*changes.borrow_and_update() > seen);
    }

    #[test]
    fn test_snapshots_never_tear() {
        let store = Arc::new(StateStore::new());

        let writer = {
            let store = store.clone();
            std::thread::spawn(move || {
                for i in 0..2_000 {
                    let on = i % 2 == 0;
                    let value = if on { 1.0 } else { 2.0 };
                    store.apply_telemetry(telemetry(on, on, value, value));
                }
            })
        };

        for _ in 0..2_000 {
            let state = store.snapshot();
            if state == DeviceState::default() {
                continue;
            }
            assert_eq!(state.led, state.fan);
            assert_eq!(state.temperature, state.humidity);
            assert_eq!(state.led, state.temperature == 1.0);
        }

        writer.join().unwrap();
    }
}
