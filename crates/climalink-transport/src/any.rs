//! Enum dispatch over the concrete transports.
//!
//! `LineTransport` and `Connector` return `impl Future` and are therefore not
//! object safe; these enums stand in for `Box<dyn ...>` where the choice is
//! made at runtime.

use climalink_core::SerialSettings;

use crate::error::Result;
use crate::mock::{MockConnector, MockTransport};
use crate::serial::{SerialConnector, SerialTransport};
use crate::traits::{Connector, LineTransport};

/// Any supported line transport.
#[non_exhaustive]
pub enum AnyTransport {
    /// Native serial port.
    Serial(SerialTransport),
    /// In-memory link for development and testing.
    Mock(MockTransport),
}

impl LineTransport for AnyTransport {
    async fn read_line(&self) -> Result<String> {
        match self {
            Self::Serial(transport) => transport.read_line().await,
            Self::Mock(transport) => transport.read_line().await,
        }
    }

    async fn write_line(&self, line: &str) -> Result<()> {
        match self {
            Self::Serial(transport) => transport.write_line(line).await,
            Self::Mock(transport) => transport.write_line(line).await,
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Serial(transport) => transport.describe(),
            Self::Mock(transport) => transport.describe(),
        }
    }
}

/// Any supported connector.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum AnyConnector {
    /// Native serial port.
    Serial(SerialConnector),
    /// Queue of in-memory links.
    Mock(MockConnector),
}

impl AnyConnector {
    /// Serial connector for the configured port.
    pub fn serial(settings: &SerialSettings) -> Self {
        Self::Serial(SerialConnector::new(settings))
    }
}

impl From<SerialConnector> for AnyConnector {
    fn from(connector: SerialConnector) -> Self {
        Self::Serial(connector)
    }
}

impl From<MockConnector> for AnyConnector {
    fn from(connector: MockConnector) -> Self {
        Self::Mock(connector)
    }
}

impl Connector for AnyConnector {
    type Transport = AnyTransport;

    async fn connect(&self) -> Result<AnyTransport> {
        match self {
            Self::Serial(connector) => connector.connect().await.map(AnyTransport::Serial),
            Self::Mock(connector) => connector.connect().await.map(AnyTransport::Mock),
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Serial(connector) => connector.describe(),
            Self::Mock(connector) => connector.describe(),
        }
    }
}
