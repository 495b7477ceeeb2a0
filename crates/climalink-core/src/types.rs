use serde::{Deserialize, Serialize};

/// Complete view of the board: two actuators and two sensor values.
///
/// Serialized with the short field names the dashboard already consumes
/// (`led`, `fan`, `temp`, `hum`).
///
/// # Examples
///
/// ```
/// use climalink_core::{DeviceState, Telemetry};
///
/// let state = DeviceState::default().with_telemetry(Telemetry {
///     led: true,
///     fan: false,
///     temperature: 22.5,
///     humidity: 41.0,
/// });
///
/// assert!(state.led);
/// assert_eq!(state.temperature, 22.5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DeviceState {
    pub led: bool,
    pub fan: bool,
    #[serde(rename = "temp")]
    pub temperature: f64,
    #[serde(rename = "hum")]
    pub humidity: f64,
}

impl DeviceState {
    /// Replace every field with the values reported by the device.
    pub fn with_telemetry(self, telemetry: Telemetry) -> Self {
        Self {
            led: telemetry.led,
            fan: telemetry.fan,
            temperature: telemetry.temperature,
            humidity: telemetry.humidity,
        }
    }

    /// Replace the actuator fields, keeping the last sensor values.
    pub fn with_desired(self, desired: DesiredState) -> Self {
        Self {
            led: desired.led,
            fan: desired.fan,
            ..self
        }
    }

    /// Actuator half of the state.
    pub fn desired(&self) -> DesiredState {
        DesiredState {
            led: self.led,
            fan: self.fan,
        }
    }
}

/// Actuator values requested by an API client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DesiredState {
    pub led: bool,
    pub fan: bool,
}

impl DesiredState {
    pub fn new(led: bool, fan: bool) -> Self {
        Self { led, fan }
    }
}

/// One decoded device report.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Telemetry {
    pub led: bool,
    pub fan: bool,
    #[serde(rename = "temp")]
    pub temperature: f64,
    #[serde(rename = "hum")]
    pub humidity: f64,
}
