use serde_json::json;
use webasto::Device;

use crate::core::entity::{self, EntityDefinition, EntityState, Platform, StateValue};
use crate::core::RegistryEntry;

const KEY: &str = "location";
const NAME: &str = "Location";
const ICON: &str = "mdi:car";

pub fn definitions_for(device: &Device) -> Vec<EntityDefinition> {
    vec![EntityDefinition {
        platform: Platform::DeviceTracker,
        key: KEY,
        name: NAME,
        category: None,
        device_id: device.id.clone(),
        unique_id: entity::unique_id(&device.id, NAME),
        entity_id: entity::entity_id(Platform::DeviceTracker, &device.name, NAME),
        enabled_default: true,
    }]
}

/// The tracker is unavailable while the cloud reports no position; the last
/// known coordinates are not carried forward.
pub(super) fn state_of(entry: &RegistryEntry, device: &Device, connected: bool) -> EntityState {
    let Some(location) = device.location else {
        return super::unavailable(entry);
    };

    EntityState {
        name: NAME.to_owned(),
        value: Some(StateValue::Location {
            latitude: location.latitude,
            longitude: location.longitude,
        }),
        unit: None,
        icon: Some(ICON),
        attributes: Some(json!({ "source_type": "gps" })),
        available: connected,
    }
}
