//! End-to-end flows through the bridge with a mock device.

use std::time::Duration;

use climalink_core::{BridgeConfig, DesiredState, Telemetry};
use climalink_protocol::Frame;
use climalink_storage::{Database, Reading, ReadingRepository, SqliteReadingRepository};
use climalink_sync::{Bridge, BridgeError, LinkState, wait_for_state};
use climalink_transport::MockConnector;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

async fn repository() -> SqliteReadingRepository {
    let db = Database::in_memory().await.unwrap();
    SqliteReadingRepository::new(db.pool().clone())
}

fn fast_config() -> BridgeConfig {
    let mut config = BridgeConfig::default();
    config.serial.initial_backoff_ms = 10;
    config.serial.max_backoff_secs = 1;
    config
}

async fn connected_bridge(
    connector: MockConnector,
) -> Bridge<MockConnector, SqliteReadingRepository> {
    let mut bridge = Bridge::new(&fast_config(), connector, repository().await);
    bridge.start().unwrap();
    assert!(
        timeout(WAIT, wait_for_state(bridge.watch_link_state(), LinkState::Connected))
            .await
            .unwrap()
    );
    bridge
}

#[tokio::test]
async fn test_desired_state_reaches_device() -> anyhow::Result<()> {
    let connector = MockConnector::new();
    let mut device = connector.attach_device();
    let bridge = connected_bridge(connector).await;

    let update = bridge.set_desired(DesiredState::new(true, false))?;

    // Visible before the device has seen anything.
    assert!(update.state.led);
    assert!(!bridge.state()?.fan);

    let frame = timeout(WAIT, device.recv_frame()).await?;
    assert_eq!(frame, Some(Frame::Command(DesiredState::new(true, false))));

    bridge.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_telemetry_updates_state() -> anyhow::Result<()> {
    let connector = MockConnector::new();
    let device = connector.attach_device();
    let bridge = connected_bridge(connector).await;
    let mut changes = bridge.subscribe();

    device.send_telemetry(Telemetry {
        led: true,
        fan: true,
        temperature: 27.0,
        humidity: 35.5,
    })?;
    timeout(WAIT, changes.changed()).await??;

    let state = bridge.state()?;
    assert!(state.led && state.fan);
    assert_eq!(state.temperature, 27.0);
    assert_eq!(state.humidity, 35.5);

    bridge.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_malformed_lines_do_not_stop_inbound() -> anyhow::Result<()> {
    let connector = MockConnector::new();
    let device = connector.attach_device();
    let bridge = connected_bridge(connector).await;
    let before = bridge.state()?;
    let mut changes = bridge.subscribe();

    device.send_line("not json")?;
    device.send_line(r#"{"led":true,"fan":true,"temp":1,"hum":1}"#)?;
    device.send_line(r#"{"msg_type":0,"led":false,"fan":true,"temp":19.5,"hum":62}"#)?;
    timeout(WAIT, changes.changed()).await??;

    let after = bridge.state()?;
    assert_ne!(after, before);
    assert_eq!(after.temperature, 19.5);
    assert_eq!(bridge.inbound_stats().frames_discarded, 2);
    assert_eq!(bridge.inbound_stats().frames_applied, 1);

    bridge.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_concurrent_writers_converge_on_last_write() -> anyhow::Result<()> {
    let connector = MockConnector::new();
    let mut device = connector.attach_device();
    let bridge = connected_bridge(connector).await;

    let writer = |seed: u32| {
        let bridge = &bridge;
        async move {
            for i in 0..10 {
                let n = seed + i;
                bridge
                    .set_desired(DesiredState::new(n % 2 == 0, n % 3 == 0))
                    .unwrap();
                tokio::task::yield_now().await;
            }
        }
    };
    tokio::join!(writer(0), writer(100), writer(200), writer(300));

    let final_desired = bridge.state()?.desired();

    // Every trigger ends as written, superseded or failed.
    timeout(WAIT, async {
        loop {
            let stats = bridge.outbound_stats();
            if stats.commands_written + stats.superseded + stats.failures == 40 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await?;

    let lines = device.drain_lines();
    assert!(!lines.is_empty());
    assert_eq!(bridge.outbound_stats().failures, 0);
    assert_eq!(
        Frame::decode(lines.last().unwrap())?,
        Frame::Command(final_desired)
    );
    for line in &lines {
        assert!(matches!(Frame::decode(line)?, Frame::Command(_)));
    }

    bridge.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_reconnects_after_device_unplugged() -> anyhow::Result<()> {
    let connector = MockConnector::new();
    let first = connector.attach_device();
    let second = connector.attach_device();
    let bridge = connected_bridge(connector.clone()).await;

    let mut changes = bridge.subscribe();
    first.disconnect();
    second.send_telemetry(Telemetry {
        led: false,
        fan: false,
        temperature: 31.0,
        humidity: 12.0,
    })?;

    timeout(WAIT, changes.changed()).await??;
    assert_eq!(bridge.state()?.temperature, 31.0);
    assert_eq!(connector.attempts(), 2);
    assert_eq!(bridge.link_state(), LinkState::Connected);

    bridge.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_link_fails_after_max_retries() -> anyhow::Result<()> {
    let connector = MockConnector::new();
    let mut config = fast_config();
    config.serial.max_retries = 3;

    let mut bridge = Bridge::new(&config, connector.clone(), repository().await);
    bridge.start()?;

    assert!(timeout(WAIT, wait_for_state(bridge.watch_link_state(), LinkState::Failed)).await?);
    assert_eq!(connector.attempts(), 3);

    // Cached state is still served; commands are dropped.
    bridge.set_desired(DesiredState::new(true, true))?;
    assert!(bridge.state()?.led);

    bridge.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_disabled_serial_is_unavailable() {
    let mut config = BridgeConfig::default();
    config.serial.enabled = false;
    let connector = MockConnector::new();

    let mut bridge = Bridge::new(&config, connector.clone(), repository().await);
    bridge.start().unwrap();

    assert!(matches!(bridge.state(), Err(BridgeError::DeviceUnavailable)));
    assert!(matches!(
        bridge.set_desired(DesiredState::new(false, true)),
        Err(BridgeError::DeviceUnavailable)
    ));
    assert_eq!(connector.attempts(), 0);
}

#[tokio::test]
async fn test_chart_queries_pass_through() -> anyhow::Result<()> {
    let repository = repository().await;
    let start = chrono::DateTime::from_timestamp(1_760_774_400, 0).unwrap();
    for (offset, temp) in [(0, 20.0), (20, 22.0), (65, 30.0)] {
        repository
            .create(&Reading::new(temp, 50.0, start + chrono::Duration::seconds(offset)))
            .await?;
    }

    let mut config = BridgeConfig::default();
    config.serial.enabled = false;
    let bridge = Bridge::new(&config, MockConnector::new(), repository);

    let latest = bridge.latest_readings(2).await?;
    assert_eq!(latest.len(), 2);
    assert_eq!(latest[0].temperature, 30.0);

    let grouped = bridge.grouped_readings(60, 10).await?;
    assert_eq!(grouped.len(), 2);
    assert_eq!(grouped[1].temperature, 21.0);

    assert!(matches!(
        bridge.grouped_readings(0, 10).await,
        Err(BridgeError::Storage(_))
    ));
    Ok(())
}
