use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use support::unit::{DegreeCelsius, TemperatureUnit, Volt};

/// Vendor-assigned identifier of one preheater control unit.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::From,
    derive_more::AsRef,
)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DeviceId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// Switchable output channels of the control unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputChannel {
    Main,
    Aux1,
    Aux2,
}

impl OutputChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputChannel::Main => "main",
            OutputChannel::Aux1 => "aux1",
            OutputChannel::Aux2 => "aux2",
        }
    }
}

/// State of one output as the cloud reports it. The name is user-assigned in
/// the vendor portal; aux outputs without a name are not wired up.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Output {
    #[serde(default)]
    pub on: bool,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    #[serde(rename = "lat")]
    pub latitude: f64,
    #[serde(rename = "lon")]
    pub longitude: f64,
}

/// Snapshot of one device, as returned by the device-list call. Fields the
/// bridge does not interpret stay in `attributes` so diagnostics can expose
/// the full vendor payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    pub name: String,

    pub temperature: DegreeCelsius,
    #[serde(default)]
    pub temperature_unit: TemperatureUnit,
    pub voltage: Volt,
    pub low_voltage_cutoff: Volt,
    #[serde(default)]
    pub temperature_compensation: f64,

    #[serde(default)]
    pub output_main: Output,
    #[serde(default)]
    pub output_aux1: Option<Output>,
    #[serde(default)]
    pub output_aux2: Option<Output>,
    #[serde(default)]
    pub ventilation_mode: bool,

    #[serde(default)]
    pub location: Option<Location>,

    pub subscription_expiration: NaiveDate,

    #[serde(default)]
    pub hw_version: Option<String>,
    #[serde(default)]
    pub sw_version: Option<String>,

    #[serde(flatten)]
    pub attributes: serde_json::Map<String, Value>,
}

impl Device {
    pub fn output(&self, channel: OutputChannel) -> Option<&Output> {
        match channel {
            OutputChannel::Main => Some(&self.output_main),
            OutputChannel::Aux1 => self.output_aux1.as_ref(),
            OutputChannel::Aux2 => self.output_aux2.as_ref(),
        }
    }
}

pub(crate) fn into_device_map(devices: Vec<Device>) -> HashMap<DeviceId, Device> {
    devices.into_iter().map(|d| (d.id.clone(), d)).collect()
}
