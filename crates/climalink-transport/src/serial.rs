//! Serial transport for the board.
//!
//! [`StreamTransport`] frames any async byte stream with [`LineCodec`];
//! [`SerialTransport`] is that over a `tokio-serial` port. Opening the port
//! resets most USB boards, so [`SerialConnector`] waits a settle delay before
//! handing the transport out.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use climalink_core::SerialSettings;
use climalink_protocol::LineCodec;
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite, ReadHalf, WriteHalf};
use tokio::sync::Mutex;
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, error, info, trace, warn};

use crate::error::{Result, TransportError};
use crate::traits::{Connector, LineTransport};

/// Line transport over any split-able async stream.
pub struct StreamTransport<S> {
    reader: Mutex<FramedRead<ReadHalf<S>, LineCodec>>,
    writer: Mutex<FramedWrite<WriteHalf<S>, LineCodec>>,
    name: String,
    write_timeout: Duration,
    /// Set after the first I/O failure; later calls fail immediately.
    failed: AtomicBool,
}

/// Transport over a native serial port.
pub type SerialTransport = StreamTransport<SerialStream>;

impl<S> StreamTransport<S>
where
    S: AsyncRead + AsyncWrite,
{
    pub fn new(stream: S, name: impl Into<String>, write_timeout: Duration) -> Self {
        let (read_half, write_half) = tokio::io::split(stream);
        Self {
            reader: Mutex::new(FramedRead::new(read_half, LineCodec::new())),
            writer: Mutex::new(FramedWrite::new(write_half, LineCodec::new())),
            name: name.into(),
            write_timeout,
            failed: AtomicBool::new(false),
        }
    }

    fn fail(&self, err: TransportError) -> TransportError {
        self.failed.store(true, Ordering::Release);
        err
    }

    fn check_usable(&self) -> Result<()> {
        if self.failed.load(Ordering::Acquire) {
            return Err(TransportError::disconnected(&self.name));
        }
        Ok(())
    }
}

impl<S> LineTransport for StreamTransport<S>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    async fn read_line(&self) -> Result<String> {
        self.check_usable()?;
        let mut reader = self.reader.lock().await;

        match reader.next().await {
            Some(Ok(line)) => {
                trace!(port = %self.name, line = %line, "serial_in");
                Ok(line)
            }
            Some(Err(e)) => {
                error!(port = %self.name, error = %e, "Serial read failed");
                Err(self.fail(e.into()))
            }
            None => {
                warn!(port = %self.name, "Serial stream closed");
                Err(self.fail(TransportError::disconnected(&self.name)))
            }
        }
    }

    async fn write_line(&self, line: &str) -> Result<()> {
        self.check_usable()?;
        let mut writer = self.writer.lock().await;

        match tokio::time::timeout(self.write_timeout, writer.send(line)).await {
            Ok(Ok(())) => {
                trace!(port = %self.name, line = %line, "serial_out");
                Ok(())
            }
            Ok(Err(e)) => {
                error!(port = %self.name, error = %e, "Serial write failed");
                Err(self.fail(e.into()))
            }
            Err(_) => {
                let duration_ms = self.write_timeout.as_millis() as u64;
                warn!(port = %self.name, duration_ms, "Serial write timed out");
                Err(self.fail(TransportError::write_timeout(duration_ms)))
            }
        }
    }

    fn describe(&self) -> String {
        self.name.clone()
    }
}

/// Opens [`SerialTransport`]s for one configured port.
#[derive(Debug, Clone)]
pub struct SerialConnector {
    port: String,
    baud_rate: u32,
    settle_delay: Duration,
    write_timeout: Duration,
}

impl SerialConnector {
    pub fn new(settings: &SerialSettings) -> Self {
        Self {
            port: settings.port.clone(),
            baud_rate: settings.baud_rate,
            settle_delay: settings.settle_delay(),
            write_timeout: settings.write_timeout(),
        }
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    fn log_available_ports(&self) {
        match serialport::available_ports() {
            Ok(ports) if ports.is_empty() => warn!("No serial ports detected"),
            Ok(ports) => {
                let names: Vec<String> = ports.into_iter().map(|p| p.port_name).collect();
                warn!(ports = ?names, "Available serial ports");
            }
            Err(e) => debug!(error = %e, "Could not enumerate serial ports"),
        }
    }
}

impl Connector for SerialConnector {
    type Transport = SerialTransport;

    async fn connect(&self) -> Result<SerialTransport> {
        debug!(port = %self.port, baud_rate = self.baud_rate, "Opening serial port");

        let stream = tokio_serial::new(self.port.as_str(), self.baud_rate)
            .open_native_async()
            .map_err(|e| {
                error!(port = %self.port, error = %e, "Failed to open serial port");
                self.log_available_ports();
                TransportError::open(&self.port, e)
            })?;

        tokio::time::sleep(self.settle_delay).await;

        info!(port = %self.port, baud_rate = self.baud_rate, "Serial port open");
        Ok(StreamTransport::new(
            stream,
            self.port.clone(),
            self.write_timeout,
        ))
    }

    fn describe(&self) -> String {
        format!("{}@{}", self.port, self.baud_rate)
    }
}
