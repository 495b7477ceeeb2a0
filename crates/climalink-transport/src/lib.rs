//! Line transports between the host and the board.
//!
//! A transport moves whole text lines in both directions and nothing else;
//! frame decoding and retry policy belong to the callers. Each transport keeps
//! its read half and write half behind separate locks so that one reader and
//! one writer can work at the same time without interleaving bytes.
//!
//! # Components
//!
//! - [`LineTransport`]: read and write one line
//! - [`Connector`]: opens a fresh transport; the only place a link is opened
//! - [`SerialConnector`]: USB/UART board via `tokio-serial`
//! - [`MockConnector`] / [`MockTransport`]: channel-backed stand-ins driven by a
//!   [`MockDeviceHandle`]
//! - [`AnyConnector`] / [`AnyTransport`]: runtime selection between the two
//!
//! # Example
//!
//! ```
//! use climalink_transport::{LineTransport, MockTransport};
//!
//! # #[tokio::main]
//! # async fn main() -> climalink_transport::Result<()> {
//! let (transport, mut device) = MockTransport::new();
//!
//! device.send_line(r#"{"msg_type":0,"led":true,"fan":false,"temp":21,"hum":40}"#)?;
//! let line = transport.read_line().await?;
//! assert!(line.starts_with(r#"{"msg_type":0"#));
//!
//! transport.write_line(r#"{"msg_type":1,"led":false,"fan":false}"#).await?;
//! assert!(device.recv_line().await.is_some());
//! # Ok(())
//! # }
//! ```

pub mod any;
pub mod error;
pub mod mock;
pub mod serial;
pub mod traits;

pub use any::{AnyConnector, AnyTransport};
pub use error::{Result, TransportError};
pub use mock::{MockConnector, MockDeviceHandle, MockTransport};
pub use serial::{SerialConnector, SerialTransport, StreamTransport};
pub use traits::{Connector, LineTransport};
