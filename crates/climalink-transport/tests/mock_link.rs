//! Integration tests for connectors as the link supervisor uses them.

use std::sync::Arc;

use climalink_core::{DesiredState, Telemetry};
use climalink_protocol::Frame;
use climalink_transport::{
    AnyConnector, Connector, LineTransport, MockConnector, TransportError,
};

#[tokio::test]
async fn test_reconnect_sequence_through_any_connector() {
    let mock = MockConnector::new();
    let first = mock.attach_device();
    let second = mock.attach_device();
    let connector = AnyConnector::from(mock.clone());

    let link = connector.connect().await.ok().unwrap();
    first
        .send_telemetry(Telemetry {
            led: true,
            fan: false,
            temperature: 20.0,
            humidity: 50.0,
        })
        .unwrap();
    assert!(link.read_line().await.is_ok());

    drop(first);
    assert!(matches!(
        link.read_line().await,
        Err(TransportError::Disconnected { .. })
    ));

    let link = connector.connect().await.ok().unwrap();
    second.send_line("{\"msg_type\":0}").unwrap();
    assert_eq!(link.read_line().await.unwrap(), "{\"msg_type\":0}");

    assert!(connector.connect().await.is_err());
    assert_eq!(mock.attempts(), 3);
}

#[tokio::test]
async fn test_concurrent_writers_do_not_interleave() {
    let mock = MockConnector::new();
    let mut device = mock.attach_device();
    let link = Arc::new(mock.connect().await.unwrap());

    let mut tasks = Vec::new();
    for i in 0..16 {
        let link = link.clone();
        tasks.push(tokio::spawn(async move {
            let line = Frame::command(DesiredState::new(i % 2 == 0, i % 3 == 0))
                .encode()
                .unwrap();
            link.write_line(&line).await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let lines = device.drain_lines();
    assert_eq!(lines.len(), 16);
    for line in lines {
        assert!(matches!(Frame::decode(&line), Ok(Frame::Command(_))));
    }
}
