use serde_json::json;
use support::unit::Volt;
use webasto::{Device, DeviceId};

use crate::core::entity::{self, EntityCategory, EntityDefinition, EntityState, Platform, StateValue};
use crate::core::{Command, RegistryEntry};

pub struct NumberDescription {
    pub key: &'static str,
    pub name: &'static str,
    pub category: Option<EntityCategory>,
    pub icon: &'static str,
    pub enabled_default: bool,
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub value_fn: fn(&Device) -> f64,
    pub unit_fn: fn(&Device) -> String,
    pub command_fn: fn(&DeviceId, f64) -> Command,
}

pub fn descriptions() -> Vec<NumberDescription> {
    vec![
        NumberDescription {
            key: "low_voltage_cutoff",
            name: "Low Voltage Cutoff",
            category: Some(EntityCategory::Config),
            icon: "mdi:battery-off",
            enabled_default: false,
            min: 0.0,
            max: 30.0,
            step: 0.1,
            value_fn: |device| device.low_voltage_cutoff.0,
            unit_fn: |_| "V".to_owned(),
            command_fn: |device, value| Command::SetLowVoltageCutoff {
                device: device.clone(),
                value: Volt(value),
            },
        },
        NumberDescription {
            key: "temperature_compensation",
            name: "Temperature Compensation",
            category: Some(EntityCategory::Config),
            icon: "mdi:thermometer-alert",
            enabled_default: false,
            min: -10.0,
            max: 10.0,
            step: 0.5,
            value_fn: |device| device.temperature_compensation,
            unit_fn: |device| device.temperature_unit.symbol().to_owned(),
            command_fn: |device, value| Command::SetTemperatureCompensation {
                device: device.clone(),
                value,
            },
        },
    ]
}

pub fn definitions_for(device: &Device) -> Vec<EntityDefinition> {
    descriptions()
        .into_iter()
        .map(|description| EntityDefinition {
            platform: Platform::Number,
            key: description.key,
            name: description.name,
            category: description.category,
            device_id: device.id.clone(),
            unique_id: entity::unique_id(&device.id, description.name),
            entity_id: entity::entity_id(Platform::Number, &device.name, description.name),
            enabled_default: description.enabled_default,
        })
        .collect()
}

pub(super) fn state_of(entry: &RegistryEntry, device: &Device, connected: bool) -> EntityState {
    let Some(description) = descriptions().into_iter().find(|d| d.key == entry.key) else {
        tracing::warn!("No number description for registered key '{}'", entry.key);
        return super::unavailable(entry);
    };

    EntityState {
        name: description.name.to_owned(),
        value: Some(StateValue::Number((description.value_fn)(device))),
        unit: Some((description.unit_fn)(device)),
        icon: Some(description.icon),
        attributes: Some(json!({
            "min": description.min,
            "max": description.max,
            "step": description.step,
        })),
        available: connected,
    }
}

pub(super) fn command_for(entry: &RegistryEntry, value: &serde_json::Value) -> anyhow::Result<Command> {
    let Some(description) = descriptions().into_iter().find(|d| d.key == entry.key) else {
        anyhow::bail!("No number description for registered key '{}'", entry.key);
    };

    let value = value
        .as_f64()
        .ok_or_else(|| anyhow::anyhow!("Number {} expects a value, got {}", entry.entity_id, value))?;

    if value < description.min || value > description.max {
        anyhow::bail!(
            "Value {} for {} is outside {}..{}",
            value,
            entry.entity_id,
            description.min,
            description.max
        );
    }

    Ok((description.command_fn)(&entry.device_id, value))
}
