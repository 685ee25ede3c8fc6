pub mod number;
pub mod sensor;
pub mod switch;
pub mod tracker;

use std::collections::HashMap;

use webasto::{Device, DeviceId};

use crate::core::entity::{EntityDefinition, EntityState, Platform};
use crate::core::{Command, CoordinatorState, RegistryEntry};

/// All entities the platform tables produce for the given devices, in
/// deterministic order.
pub fn definitions(devices: &HashMap<DeviceId, Device>) -> Vec<EntityDefinition> {
    let mut sorted: Vec<&Device> = devices.values().collect();
    sorted.sort_by(|a, b| a.id.cmp(&b.id));

    let mut definitions = vec![];
    for device in sorted {
        tracing::debug!("Setting up entities for device: {}", device.name);
        definitions.extend(sensor::definitions_for(device));
        definitions.extend(switch::definitions_for(device));
        definitions.extend(number::definitions_for(device));
        definitions.extend(tracker::definitions_for(device));
    }

    definitions
}

/// Presentation state of one registered entity under the current snapshot.
pub fn state_of(entry: &RegistryEntry, state: &CoordinatorState) -> EntityState {
    let connected = state.is_connected();

    match state.devices.get(&entry.device_id) {
        None => unavailable(entry),
        Some(device) => match entry.platform {
            Platform::Sensor => sensor::state_of(entry, device, connected),
            Platform::Switch => switch::state_of(entry, device, connected),
            Platform::Number => number::state_of(entry, device, connected),
            Platform::DeviceTracker => tracker::state_of(entry, device, connected),
        },
    }
}

/// Translate a set-request from a frontend into a cloud command. Sensors and
/// trackers are read-only and reject every request.
pub fn command_for(entry: &RegistryEntry, value: &serde_json::Value) -> anyhow::Result<Command> {
    match entry.platform {
        Platform::Switch => switch::command_for(entry, value),
        Platform::Number => number::command_for(entry, value),
        Platform::Sensor | Platform::DeviceTracker => {
            anyhow::bail!("{} is read-only", entry.entity_id)
        }
    }
}

pub(crate) fn unavailable(entry: &RegistryEntry) -> EntityState {
    EntityState {
        name: entry.name.clone(),
        value: None,
        unit: None,
        icon: None,
        attributes: None,
        available: false,
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[test]
    fn definitions_cover_every_platform() {
        let device = test_device("WBC1");
        let definitions = definitions(&HashMap::from([(device.id.clone(), device)]));

        let platforms: Vec<Platform> = definitions.iter().map(|d| d.platform).collect();
        assert!(platforms.contains(&Platform::Sensor));
        assert!(platforms.contains(&Platform::Switch));
        assert!(platforms.contains(&Platform::Number));
        assert!(platforms.contains(&Platform::DeviceTracker));
    }

    #[test]
    fn entities_of_missing_devices_are_unavailable() {
        let device = test_device("WBC1");
        let definitions = sensor::definitions_for(&device);
        let entry = entry_for(&definitions[0]);

        let mut state = connected_state(device);
        state.devices.clear();

        assert!(!state_of(&entry, &state).available);
    }

    #[test]
    fn sensors_reject_set_requests() {
        let device = test_device("WBC1");
        let definitions = sensor::definitions_for(&device);
        let entry = entry_for(&definitions[0]);

        assert!(command_for(&entry, &serde_json::json!(21.0)).is_err());
    }
}
