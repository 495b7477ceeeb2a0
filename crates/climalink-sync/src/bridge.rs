//! The bridge: one device, one store, one readings table.
//!
//! [`Bridge`] owns every component and is what an API layer talks to. Reads
//! and desired-state writes go to the [`StateStore`] and return immediately;
//! the link supervisor and the persistence loop run as background tasks
//! started by [`Bridge::start`].

use std::sync::Arc;
use std::time::Duration;

use climalink_core::{BridgeConfig, DesiredState, DeviceState};
use climalink_storage::{Reading, ReadingBucket, ReadingRepository};
use climalink_transport::Connector;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::error::{BridgeError, Result};
use crate::inbound::{InboundStats, InboundSync};
use crate::link::{Link, LinkState, LinkSupervisor, ReconnectPolicy};
use crate::outbound::{OutboundStats, OutboundSync};
use crate::persistence::PersistenceLoop;
use crate::store::{DesiredUpdate, StateStore};

/// Device bridge.
///
/// # Examples
///
/// ```
/// use climalink_core::{BridgeConfig, DesiredState};
/// use climalink_storage::{Database, SqliteReadingRepository};
/// use climalink_sync::Bridge;
/// use climalink_transport::MockConnector;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let db = Database::in_memory().await?;
/// let readings = SqliteReadingRepository::new(db.pool().clone());
/// let connector = MockConnector::new();
/// let _device = connector.attach_device();
///
/// let mut bridge = Bridge::new(&BridgeConfig::default(), connector, readings);
/// bridge.start()?;
///
/// bridge.set_desired(DesiredState::new(true, false))?;
/// assert!(bridge.state()?.led);
///
/// bridge.shutdown().await;
/// # Ok(())
/// # }
/// ```
pub struct Bridge<C: Connector, R> {
    serial_enabled: bool,
    store_interval: Duration,
    policy: ReconnectPolicy,

    store: Arc<StateStore>,
    link: Arc<Link<C::Transport>>,
    inbound: InboundSync,
    outbound: OutboundSync<C::Transport>,
    repository: Arc<R>,

    /// Taken by [`Bridge::start`].
    connector: Option<C>,
    tasks: JoinSet<Result<()>>,
}

impl<C, R> Bridge<C, R>
where
    C: Connector + 'static,
    R: ReadingRepository + 'static,
{
    pub fn new(config: &BridgeConfig, connector: C, repository: R) -> Self {
        let serial_enabled = config.serial.enabled;
        let initial = if serial_enabled {
            LinkState::Connecting
        } else {
            LinkState::Disabled
        };

        let store = Arc::new(StateStore::new());
        let link = Arc::new(Link::new(initial));

        Self {
            serial_enabled,
            store_interval: config.app.db_store_interval(),
            policy: ReconnectPolicy::from(&config.serial),
            inbound: InboundSync::new(store.clone()),
            outbound: OutboundSync::new(store.clone(), link.clone()),
            store,
            link,
            repository: Arc::new(repository),
            connector: Some(connector),
            tasks: JoinSet::new(),
        }
    }

    /// Spawn the link supervisor and the persistence loop.
    ///
    /// Does nothing when serial is disabled or the bridge already started.
    pub fn start(&mut self) -> Result<()> {
        if !self.serial_enabled {
            info!("Serial disabled, bridge serving without a device");
            return Ok(());
        }

        if self.connector.is_none() {
            warn!("Bridge already started");
            return Ok(());
        }

        let persistence =
            PersistenceLoop::new(self.store.clone(), self.repository.clone(), self.store_interval)?;
        let Some(connector) = self.connector.take() else {
            return Ok(());
        };

        info!(
            version = climalink_core::VERSION,
            target_device = %connector.describe(),
            store_interval_secs = self.store_interval.as_secs(),
            "Starting bridge"
        );

        let supervisor =
            LinkSupervisor::new(connector, self.link.clone(), self.inbound.clone(), self.policy);
        self.tasks.spawn(supervisor.run());
        self.tasks.spawn(persistence.run());

        Ok(())
    }

    /// Current device state.
    pub fn state(&self) -> Result<DeviceState> {
        self.ensure_enabled()?;
        Ok(self.store.snapshot())
    }

    /// Record the desired actuator state and send it to the device in the
    /// background.
    ///
    /// The returned state already reflects the update; delivery to the device
    /// is not awaited and not acknowledged.
    pub fn set_desired(&self, desired: DesiredState) -> Result<DesiredUpdate> {
        self.ensure_enabled()?;

        let update = self.store.set_desired(desired);
        self.outbound.trigger();
        Ok(update)
    }

    /// The `limit` most recent readings, newest first.
    pub async fn latest_readings(&self, limit: i64) -> Result<Vec<Reading>> {
        Ok(self.repository.find_recent(limit).await?)
    }

    /// Readings averaged over `interval_secs` windows, newest window first.
    pub async fn grouped_readings(&self, interval_secs: i64, limit: i64) -> Result<Vec<ReadingBucket>> {
        Ok(self.repository.find_grouped(interval_secs, limit).await?)
    }

    pub fn link_state(&self) -> LinkState {
        self.link.state()
    }

    pub fn watch_link_state(&self) -> watch::Receiver<LinkState> {
        self.link.watch_state()
    }

    /// Receiver that wakes up on every store write.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.store.subscribe()
    }

    pub fn inbound_stats(&self) -> InboundStats {
        self.inbound.stats()
    }

    pub fn outbound_stats(&self) -> OutboundStats {
        self.outbound.stats()
    }

    /// Stop the background tasks and wait for them to end.
    ///
    /// Task failures are logged; shutdown itself does not fail.
    pub async fn shutdown(mut self) {
        self.tasks.abort_all();

        let mut error_count = 0;
        let mut panic_count = 0;

        while let Some(result) = self.tasks.join_next().await {
            match classify_task_result(result) {
                TaskTermination::Success | TaskTermination::Cancelled => {}
                TaskTermination::Error(e) => {
                    warn!(error = %e, "Background task ended with an error");
                    error_count += 1;
                }
                TaskTermination::Panic => panic_count += 1,
            }
        }

        if panic_count > 0 {
            error!(panic_count, error_count, "Background tasks panicked");
        }
        info!(error_count, "Bridge stopped");
    }

    fn ensure_enabled(&self) -> Result<()> {
        if self.serial_enabled {
            Ok(())
        } else {
            Err(BridgeError::DeviceUnavailable)
        }
    }
}

/// How a background task ended.
#[derive(Debug)]
enum TaskTermination {
    Success,
    Error(BridgeError),
    /// Aborted by shutdown.
    Cancelled,
    Panic,
}

fn classify_task_result(
    result: std::result::Result<Result<()>, tokio::task::JoinError>,
) -> TaskTermination {
    match result {
        Ok(Ok(())) => TaskTermination::Success,
        Ok(Err(e)) => TaskTermination::Error(e),
        Err(e) if e.is_cancelled() => TaskTermination::Cancelled,
        Err(_) => TaskTermination::Panic,
    }
}
