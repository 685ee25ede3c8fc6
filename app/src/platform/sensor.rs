use webasto::Device;

use crate::core::entity::{self, EntityCategory, EntityDefinition, EntityState, Platform, StateValue};
use crate::core::RegistryEntry;

pub struct SensorDescription {
    pub key: &'static str,
    pub name: &'static str,
    pub category: Option<EntityCategory>,
    pub icon: &'static str,
    pub enabled_default: bool,
    pub value_fn: fn(&Device) -> StateValue,
    pub unit_fn: Option<fn(&Device) -> String>,
}

pub fn descriptions() -> Vec<SensorDescription> {
    vec![
        SensorDescription {
            key: "temperature",
            name: "Temperature",
            category: None,
            icon: "mdi:thermometer",
            enabled_default: true,
            value_fn: |device| StateValue::Number(device.temperature.0),
            unit_fn: Some(|device| device.temperature_unit.symbol().to_owned()),
        },
        SensorDescription {
            key: "battery_voltage",
            name: "Battery",
            category: None,
            icon: "mdi:car-battery",
            enabled_default: true,
            value_fn: |device| StateValue::Number(device.voltage.0),
            unit_fn: Some(|_| "V".to_owned()),
        },
        SensorDescription {
            key: "subscription_expiration",
            name: "Subscription Expiration",
            category: Some(EntityCategory::Diagnostic),
            icon: "mdi:calendar-end",
            enabled_default: false,
            value_fn: |device| {
                StateValue::Text(device.subscription_expiration.format("%d-%m-%Y").to_string())
            },
            unit_fn: None,
        },
    ]
}

pub fn definitions_for(device: &Device) -> Vec<EntityDefinition> {
    descriptions()
        .into_iter()
        .map(|description| EntityDefinition {
            platform: Platform::Sensor,
            key: description.key,
            name: description.name,
            category: description.category,
            device_id: device.id.clone(),
            unique_id: entity::unique_id(&device.id, description.name),
            entity_id: entity::entity_id(Platform::Sensor, &device.name, description.name),
            enabled_default: description.enabled_default,
        })
        .collect()
}

pub(super) fn state_of(entry: &RegistryEntry, device: &Device, connected: bool) -> EntityState {
    let Some(description) = descriptions().into_iter().find(|d| d.key == entry.key) else {
        tracing::warn!("No sensor description for registered key '{}'", entry.key);
        return super::unavailable(entry);
    };

    EntityState {
        name: description.name.to_owned(),
        value: Some((description.value_fn)(device)),
        unit: description.unit_fn.map(|unit_fn| unit_fn(device)),
        icon: Some(description.icon),
        attributes: None,
        available: connected,
    }
}
