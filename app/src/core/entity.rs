use serde::{Deserialize, Serialize};
use support::slug::slugify;
use webasto::{Device, DeviceId};

pub const MANUFACTURER: &str = "Webasto";
pub const MODEL: &str = "ThermoConnect";
pub const CONFIGURATION_URL: &str = "https://my.webastoconnect.com";

/// Where an entity is surfaced. Primary entities have no category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityCategory {
    Config,
    Diagnostic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Sensor,
    Switch,
    Number,
    DeviceTracker,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Sensor => "sensor",
            Platform::Switch => "switch",
            Platform::Number => "number",
            Platform::DeviceTracker => "device_tracker",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Registry metadata of the physical device an entity belongs to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceInfo {
    pub identifiers: (String, String),
    pub name: String,
    pub manufacturer: &'static str,
    pub model: &'static str,
    pub hw_version: Option<String>,
    pub sw_version: Option<String>,
    pub configuration_url: &'static str,
}

impl DeviceInfo {
    pub fn for_device(device: &Device) -> Self {
        Self {
            identifiers: ("webasto_connect".to_owned(), device.id.to_string()),
            name: device.name.clone(),
            manufacturer: MANUFACTURER,
            model: MODEL,
            hw_version: device.hw_version.clone(),
            sw_version: device.sw_version.clone(),
            configuration_url: CONFIGURATION_URL,
        }
    }
}

/// Stable identifier of an entity, survives renames of the device.
pub fn unique_id(device_id: &DeviceId, entity_name: &str) -> String {
    slugify(&format!("{}_{}", device_id, entity_name))
}

/// Presentation identifier, derived from the display names at creation time.
pub fn entity_id(platform: Platform, device_name: &str, entity_name: &str) -> String {
    format!(
        "{}.{}",
        platform.as_str(),
        slugify(&format!("{} {}", device_name, entity_name))
    )
}

/// One entity to be registered, produced from the platform tables for a
/// concrete device snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityDefinition {
    pub platform: Platform,
    pub key: &'static str,
    pub name: &'static str,
    pub category: Option<EntityCategory>,
    pub device_id: DeviceId,
    pub unique_id: String,
    pub entity_id: String,
    pub enabled_default: bool,
}

/// Value published for an entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StateValue {
    Bool(bool),
    Number(f64),
    Text(String),
    Location { latitude: f64, longitude: f64 },
}

/// Computed presentation state of one entity for the current snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityState {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<StateValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<serde_json::Value>,
    pub available: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_id_is_device_scoped() {
        let id = unique_id(&DeviceId::from("WBC100200"), "Low Voltage Cutoff");
        assert_eq!(id, "wbc100200_low_voltage_cutoff");
    }

    #[test]
    fn entity_id_carries_platform_and_display_names() {
        let id = entity_id(Platform::Sensor, "My Camper", "Temperature");
        assert_eq!(id, "sensor.my_camper_temperature");
    }

    #[test]
    fn state_value_serializes_flat() {
        let value = serde_json::to_value(StateValue::Number(12.4)).unwrap();
        assert_eq!(value, serde_json::json!(12.4));

        let location = serde_json::to_value(StateValue::Location {
            latitude: 57.0,
            longitude: 9.9,
        })
        .unwrap();
        assert_eq!(
            location,
            serde_json::json!({"latitude": 57.0, "longitude": 9.9})
        );
    }
}
