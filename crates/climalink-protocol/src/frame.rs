//! Typed frames and their JSON line representation.

use std::fmt;
use std::str::FromStr;

use climalink_core::{DesiredState, Telemetry};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Value of the `msg_type` discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageType {
    /// Device report (`get_value` on the board side).
    Telemetry = 0,
    /// Host command (`set_value` on the board side).
    Command = 1,
}

impl MessageType {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for MessageType {
    type Error = FrameError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Telemetry),
            1 => Ok(Self::Command),
            other => Err(FrameError::UnknownMessageType(other)),
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Telemetry => write!(f, "telemetry"),
            Self::Command => write!(f, "command"),
        }
    }
}

/// Reasons a line is not a usable frame.
///
/// None of these are fatal; the caller drops the line and reads the next one.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("empty line")]
    Empty,

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("missing field: {0}")]
    MissingField(&'static str),

    #[error("unknown message type: {0}")]
    UnknownMessageType(u8),
}

/// One protocol message.
///
/// # Examples
///
/// ```
/// use climalink_protocol::Frame;
///
/// let frame = Frame::decode(r#"{"msg_type":0,"led":true,"fan":false,"temp":21.5,"hum":40}"#)?;
/// let Frame::Telemetry(telemetry) = frame else { unreachable!() };
/// assert_eq!(telemetry.humidity, 40.0);
/// # Ok::<(), climalink_protocol::FrameError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Frame {
    Telemetry(Telemetry),
    Command(DesiredState),
}

/// Every field optional so that a missing one maps to a precise error
/// instead of a generic serde message. Unknown keys are ignored.
#[derive(Debug, Deserialize)]
struct RawFrame {
    msg_type: Option<u8>,
    led: Option<bool>,
    fan: Option<bool>,
    temp: Option<f64>,
    hum: Option<f64>,
}

#[derive(Serialize)]
struct CommandLine {
    msg_type: u8,
    led: bool,
    fan: bool,
}

#[derive(Serialize)]
struct TelemetryLine {
    msg_type: u8,
    led: bool,
    fan: bool,
    temp: f64,
    hum: f64,
}

impl Frame {
    /// Decode one line, terminator already stripped.
    ///
    /// A frame is accepted whole or not at all: a telemetry frame missing any
    /// of its four fields is rejected rather than partially applied.
    pub fn decode(line: &str) -> Result<Self, FrameError> {
        let line = line.trim();
        if line.is_empty() {
            return Err(FrameError::Empty);
        }

        let raw: RawFrame = serde_json::from_str(line)?;
        let msg_type = raw.msg_type.ok_or(FrameError::MissingField("msg_type"))?;

        match MessageType::try_from(msg_type)? {
            MessageType::Telemetry => Ok(Frame::Telemetry(Telemetry {
                led: raw.led.ok_or(FrameError::MissingField("led"))?,
                fan: raw.fan.ok_or(FrameError::MissingField("fan"))?,
                temperature: raw.temp.ok_or(FrameError::MissingField("temp"))?,
                humidity: raw.hum.ok_or(FrameError::MissingField("hum"))?,
            })),
            MessageType::Command => Ok(Frame::Command(DesiredState {
                led: raw.led.ok_or(FrameError::MissingField("led"))?,
                fan: raw.fan.ok_or(FrameError::MissingField("fan"))?,
            })),
        }
    }

    /// Encode to a single JSON line without the terminator.
    pub fn encode(&self) -> Result<String, FrameError> {
        let line = match self {
            Frame::Telemetry(t) => serde_json::to_string(&TelemetryLine {
                msg_type: MessageType::Telemetry.as_u8(),
                led: t.led,
                fan: t.fan,
                temp: t.temperature,
                hum: t.humidity,
            })?,
            Frame::Command(d) => serde_json::to_string(&CommandLine {
                msg_type: MessageType::Command.as_u8(),
                led: d.led,
                fan: d.fan,
            })?,
        };
        Ok(line)
    }

    pub fn message_type(&self) -> MessageType {
        match self {
            Frame::Telemetry(_) => MessageType::Telemetry,
            Frame::Command(_) => MessageType::Command,
        }
    }

    pub fn command(desired: DesiredState) -> Self {
        Frame::Command(desired)
    }
}

impl FromStr for Frame {
    type Err = FrameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Frame::decode(s)
    }
}
