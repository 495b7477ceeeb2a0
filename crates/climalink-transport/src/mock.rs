//! Mock transport for testing and development.
//!
//! [`MockTransport`] is the host side of an in-memory link; the paired
//! [`MockDeviceHandle`] plays the board. Dropping the handle unplugs the
//! device: pending and later reads fail with
//! [`TransportError::Disconnected`].

use std::collections::VecDeque;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use climalink_core::Telemetry;
use climalink_protocol::Frame;
use parking_lot::Mutex as SyncMutex;
use tokio::sync::{Mutex, mpsc};
use tracing::trace;

use crate::error::{Result, TransportError};
use crate::traits::{Connector, LineTransport};

/// Knobs shared between a transport and its device handle.
#[derive(Debug, Default)]
struct Faults {
    fail_writes: AtomicBool,
    write_delay_ms: AtomicU64,
}

/// Host side of an in-memory link.
///
/// # Examples
///
/// ```
/// use climalink_transport::{LineTransport, MockTransport};
///
/// # #[tokio::main]
/// # async fn main() {
/// let (transport, device) = MockTransport::new();
/// drop(device);
///
/// assert!(transport.read_line().await.is_err());
/// # }
/// ```
#[derive(Debug)]
pub struct MockTransport {
    inbound: Mutex<mpsc::UnboundedReceiver<String>>,
    outbound: mpsc::UnboundedSender<String>,
    faults: Arc<Faults>,
    name: String,
}

impl MockTransport {
    /// Create a connected transport and the handle that drives its device end.
    pub fn new() -> (Self, MockDeviceHandle) {
        Self::with_name("mock")
    }

    /// Create a connected pair with a custom name for logs.
    pub fn with_name(name: impl Into<String>) -> (Self, MockDeviceHandle) {
        let (to_host, from_device) = mpsc::unbounded_channel();
        let (to_device, from_host) = mpsc::unbounded_channel();
        let faults = Arc::new(Faults::default());

        let transport = Self {
            inbound: Mutex::new(from_device),
            outbound: to_device,
            faults: faults.clone(),
            name: name.into(),
        };
        let handle = MockDeviceHandle {
            to_host,
            from_host,
            faults,
        };

        (transport, handle)
    }
}

impl LineTransport for MockTransport {
    async fn read_line(&self) -> Result<String> {
        let mut inbound = self.inbound.lock().await;
        match inbound.recv().await {
            Some(line) => {
                trace!(port = %self.name, line = %line, "serial_in");
                Ok(line)
            }
            None => Err(TransportError::disconnected(&self.name)),
        }
    }

    async fn write_line(&self, line: &str) -> Result<()> {
        let delay = self.faults.write_delay_ms.load(Ordering::Relaxed);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        if self.faults.fail_writes.load(Ordering::Relaxed) {
            return Err(TransportError::Io(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "simulated write failure",
            )));
        }

        self.outbound
            .send(line.to_string())
            .map_err(|_| TransportError::disconnected(&self.name))?;
        trace!(port = %self.name, line = %line, "serial_out");
        Ok(())
    }

    fn describe(&self) -> String {
        self.name.clone()
    }
}

/// Device end of a [`MockTransport`].
#[derive(Debug)]
pub struct MockDeviceHandle {
    to_host: mpsc::UnboundedSender<String>,
    from_host: mpsc::UnboundedReceiver<String>,
    faults: Arc<Faults>,
}

impl MockDeviceHandle {
    /// Emit a raw line towards the host.
    pub fn send_line(&self, line: impl Into<String>) -> Result<()> {
        self.to_host
            .send(line.into())
            .map_err(|_| TransportError::disconnected("host"))
    }

    /// Emit a telemetry frame towards the host.
    pub fn send_telemetry(&self, telemetry: Telemetry) -> Result<()> {
        let line = Frame::Telemetry(telemetry)
            .encode()
            .map_err(|e| TransportError::Io(io::Error::new(io::ErrorKind::InvalidData, e)))?;
        self.send_line(line)
    }

    /// Wait for the next line written by the host.
    ///
    /// Returns `None` once the transport is gone and every line was read.
    pub async fn recv_line(&mut self) -> Option<String> {
        self.from_host.recv().await
    }

    /// Next line already written by the host, if any.
    pub fn try_recv_line(&mut self) -> Option<String> {
        self.from_host.try_recv().ok()
    }

    /// Wait for the next decodable frame written by the host.
    pub async fn recv_frame(&mut self) -> Option<Frame> {
        while let Some(line) = self.recv_line().await {
            if let Ok(frame) = Frame::decode(&line) {
                return Some(frame);
            }
        }
        None
    }

    /// Every line written by the host so far.
    pub fn drain_lines(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        while let Some(line) = self.try_recv_line() {
            lines.push(line);
        }
        lines
    }

    /// Make subsequent host writes fail.
    pub fn set_write_failure(&self, fail: bool) {
        self.faults.fail_writes.store(fail, Ordering::Relaxed);
    }

    /// Delay every host write, as a slow serial line would.
    pub fn set_write_delay(&self, delay: Duration) {
        self.faults
            .write_delay_ms
            .store(delay.as_millis() as u64, Ordering::Relaxed);
    }

    /// Unplug the device.
    pub fn disconnect(self) {}
}

/// Hands out queued [`MockTransport`]s, one per connection attempt.
///
/// When the queue is empty the attempt fails like an absent serial port.
#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    queue: Arc<SyncMutex<VecDeque<MockTransport>>>,
    attempts: Arc<AtomicUsize>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a transport for a future connection attempt.
    pub fn push(&self, transport: MockTransport) {
        self.queue.lock().push_back(transport);
    }

    /// Queue a fresh transport and return its device handle.
    pub fn attach_device(&self) -> MockDeviceHandle {
        let (transport, handle) = MockTransport::new();
        self.push(transport);
        handle
    }

    /// Connection attempts made so far, failed ones included.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }
}

impl Connector for MockConnector {
    type Transport = MockTransport;

    async fn connect(&self) -> Result<MockTransport> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.queue
            .lock()
            .pop_front()
            .ok_or_else(|| TransportError::open("mock", "no device attached"))
    }

    fn describe(&self) -> String {
        "mock".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use climalink_core::DesiredState;

    #[tokio::test]
    async fn test_lines_flow_both_ways() {
        let (transport, mut device) = MockTransport::new();

        device.send_line("up").unwrap();
        assert_eq!(transport.read_line().await.unwrap(), "up");

        transport.write_line("down").await.unwrap();
        assert_eq!(device.recv_line().await.as_deref(), Some("down"));
    }

    #[tokio::test]
    async fn test_disconnect_fails_reads_and_writes() {
        let (transport, device) = MockTransport::new();
        device.disconnect();

        assert!(matches!(
            transport.read_line().await,
            Err(TransportError::Disconnected { .. })
        ));
        assert!(matches!(
            transport.write_line("x").await,
            Err(TransportError::Disconnected { .. })
        ));
    }

    #[tokio::test]
    async fn test_buffered_lines_survive_disconnect() {
        let (transport, device) = MockTransport::new();
        device.send_line("last words").unwrap();
        drop(device);

        assert_eq!(transport.read_line().await.unwrap(), "last words");
        assert!(transport.read_line().await.is_err());
    }

    #[tokio::test]
    async fn test_simulated_write_failure() {
        let (transport, mut device) = MockTransport::new();
        device.set_write_failure(true);

        assert!(matches!(
            transport.write_line("lost").await,
            Err(TransportError::Io(_))
        ));

        device.set_write_failure(false);
        transport.write_line("kept").await.unwrap();
        assert_eq!(device.drain_lines(), vec!["kept".to_string()]);
    }

    #[tokio::test]
    async fn test_frames_round_trip_through_handle() {
        let (transport, mut device) = MockTransport::new();

        device
            .send_telemetry(Telemetry {
                led: true,
                fan: true,
                temperature: 25.0,
                humidity: 30.0,
            })
            .unwrap();
        let line = transport.read_line().await.unwrap();
        assert!(matches!(Frame::decode(&line), Ok(Frame::Telemetry(_))));

        transport.write_line("garbage").await.unwrap();
        let command = Frame::command(DesiredState::new(false, true)).encode().unwrap();
        transport.write_line(&command).await.unwrap();

        assert_eq!(
            device.recv_frame().await,
            Some(Frame::Command(DesiredState::new(false, true)))
        );
    }

    #[tokio::test]
    async fn test_connector_hands_out_queued_transports() {
        let connector = MockConnector::new();
        let _device = connector.attach_device();
        assert_eq!(connector.pending(), 1);

        assert!(connector.connect().await.is_ok());
        assert!(matches!(
            connector.connect().await,
            Err(TransportError::Open { .. })
        ));
        assert_eq!(connector.attempts(), 2);
        assert_eq!(connector.pending(), 0);
    }
}
