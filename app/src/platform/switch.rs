use webasto::{Device, DeviceId, OutputChannel};

use crate::core::entity::{self, EntityCategory, EntityDefinition, EntityState, Platform, StateValue};
use crate::core::{Command, RegistryEntry};

pub struct SwitchDescription {
    pub key: &'static str,
    pub name: &'static str,
    pub category: Option<EntityCategory>,
    pub enabled_default: bool,
    pub value_fn: fn(&Device) -> bool,
    /// Display name reported by the cloud. `None` means the output is not
    /// wired up and no entity is created for it.
    pub name_fn: Option<fn(&Device) -> Option<String>>,
    pub icon_fn: Option<fn(&Device, bool) -> &'static str>,
    pub command_fn: fn(&DeviceId, bool) -> Command,
}

pub fn descriptions() -> Vec<SwitchDescription> {
    vec![
        SwitchDescription {
            key: "main_output",
            name: "Output",
            category: None,
            enabled_default: true,
            value_fn: |device| device.output_main.on,
            name_fn: Some(|device| device.output_main.name.clone()),
            icon_fn: Some(|device, on| match (device.ventilation_mode, on) {
                (true, true) => "mdi:fan",
                (true, false) => "mdi:fan-off",
                (false, true) => "mdi:radiator",
                (false, false) => "mdi:radiator-off",
            }),
            command_fn: |device, on| Command::SetOutput {
                device: device.clone(),
                channel: OutputChannel::Main,
                on,
            },
        },
        SwitchDescription {
            key: "ventilation_mode",
            name: "Ventilation Mode",
            category: Some(EntityCategory::Config),
            enabled_default: false,
            value_fn: |device| device.ventilation_mode,
            name_fn: None,
            icon_fn: Some(|_, on| if on { "mdi:fan" } else { "mdi:fan-off" }),
            command_fn: |device, on| Command::SetVentilationMode {
                device: device.clone(),
                on,
            },
        },
        SwitchDescription {
            key: "aux1_output",
            name: "AUX1",
            category: None,
            enabled_default: true,
            value_fn: |device| device.output_aux1.as_ref().map(|o| o.on).unwrap_or(false),
            name_fn: Some(|device| device.output_aux1.as_ref().and_then(|o| o.name.clone())),
            icon_fn: None,
            command_fn: |device, on| Command::SetOutput {
                device: device.clone(),
                channel: OutputChannel::Aux1,
                on,
            },
        },
        SwitchDescription {
            key: "aux2_output",
            name: "AUX2",
            category: None,
            enabled_default: true,
            value_fn: |device| device.output_aux2.as_ref().map(|o| o.on).unwrap_or(false),
            name_fn: Some(|device| device.output_aux2.as_ref().and_then(|o| o.name.clone())),
            icon_fn: None,
            command_fn: |device, on| Command::SetOutput {
                device: device.clone(),
                channel: OutputChannel::Aux2,
                on,
            },
        },
    ]
}

pub fn definitions_for(device: &Device) -> Vec<EntityDefinition> {
    descriptions()
        .into_iter()
        .filter_map(|description| {
            // the display name decides whether the output exists at all
            let display_name = match description.name_fn {
                Some(name_fn) => match name_fn(device) {
                    Some(name) => name,
                    None => {
                        tracing::debug!(
                            "Skipping switch '{}' on {}: output not configured",
                            description.name,
                            device.name
                        );
                        return None;
                    }
                },
                None => description.name.to_owned(),
            };

            Some(EntityDefinition {
                platform: Platform::Switch,
                key: description.key,
                name: description.name,
                category: description.category,
                device_id: device.id.clone(),
                unique_id: entity::unique_id(&device.id, description.name),
                entity_id: entity::entity_id(Platform::Switch, &device.name, &display_name),
                enabled_default: description.enabled_default,
            })
        })
        .collect()
}

pub(super) fn state_of(entry: &RegistryEntry, device: &Device, connected: bool) -> EntityState {
    let Some(description) = descriptions().into_iter().find(|d| d.key == entry.key) else {
        tracing::warn!("No switch description for registered key '{}'", entry.key);
        return super::unavailable(entry);
    };

    let on = (description.value_fn)(device);
    let name = description
        .name_fn
        .and_then(|name_fn| name_fn(device))
        .unwrap_or_else(|| description.name.to_owned());

    EntityState {
        name,
        value: Some(StateValue::Bool(on)),
        unit: None,
        icon: description.icon_fn.map(|icon_fn| icon_fn(device, on)),
        attributes: None,
        available: connected,
    }
}

pub(super) fn command_for(entry: &RegistryEntry, value: &serde_json::Value) -> anyhow::Result<Command> {
    let Some(description) = descriptions().into_iter().find(|d| d.key == entry.key) else {
        anyhow::bail!("No switch description for registered key '{}'", entry.key);
    };

    let on = value
        .as_bool()
        .ok_or_else(|| anyhow::anyhow!("Switch {} expects a boolean, got {}", entry.entity_id, value))?;

    Ok((description.command_fn)(&entry.device_id, on))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::platform::testing::{entry_for, test_device};

    fn definition_for<'a>(definitions: &'a [EntityDefinition], key: &str) -> &'a EntityDefinition {
        definitions.iter().find(|d| d.key == key).expect("switch not defined")
    }

    #[test]
    fn unconfigured_outputs_produce_no_entity() {
        let device = test_device("WBC1"); // aux2 carries no name
        let definitions = definitions_for(&device);

        assert!(definitions.iter().any(|d| d.key == "aux1_output"));
        assert!(!definitions.iter().any(|d| d.key == "aux2_output"));
    }

    #[test]
    fn display_name_comes_from_the_cloud() {
        let device = test_device("WBC1");
        let definitions = definitions_for(&device);
        let entry = entry_for(definition_for(&definitions, "main_output"));

        let state = state_of(&entry, &device, true);

        assert_eq!(state.name, "Parking Heater");
        assert_eq!(state.value, Some(StateValue::Bool(true)));
        // unique id sticks to the static name, presentation follows the cloud
        assert_eq!(entry.unique_id, "wbc1_output");
        assert_eq!(entry.entity_id, "switch.camper_parking_heater");
    }

    #[test]
    fn main_output_icon_switches_with_ventilation_mode() {
        let mut device = test_device("WBC1");
        let definitions = definitions_for(&device);
        let entry = entry_for(definition_for(&definitions, "main_output"));

        assert_eq!(state_of(&entry, &device, true).icon, Some("mdi:radiator"));

        device.ventilation_mode = true;
        assert_eq!(state_of(&entry, &device, true).icon, Some("mdi:fan"));

        device.output_main.on = false;
        assert_eq!(state_of(&entry, &device, true).icon, Some("mdi:fan-off"));
    }

    #[test]
    fn ventilation_mode_is_an_optional_config_switch() {
        let device = test_device("WBC1");
        let definitions = definitions_for(&device);
        let definition = definition_for(&definitions, "ventilation_mode");

        assert!(!definition.enabled_default);
    }

    #[test]
    fn set_requests_translate_to_output_commands() {
        let device = test_device("WBC1");
        let definitions = definitions_for(&device);
        let entry = entry_for(definition_for(&definitions, "aux1_output"));

        let command = command_for(&entry, &json!(true)).unwrap();

        assert_eq!(
            command,
            Command::SetOutput {
                device: DeviceId::from("WBC1"),
                channel: OutputChannel::Aux1,
                on: true,
            }
        );
    }

    #[test]
    fn non_boolean_set_requests_are_rejected() {
        let device = test_device("WBC1");
        let definitions = definitions_for(&device);
        let entry = entry_for(definition_for(&definitions, "main_output"));

        assert!(command_for(&entry, &json!("on")).is_err());
    }
}
