use serde_json::Value;
use support::slug::slugify;
use webasto::DeviceId;

use super::registry::STORAGE_VERSION;

/// One-time migration of persisted entity identifiers.
///
/// Version 1 stores identified the numeric controls by display name and
/// account (`slug("{name}_{email}")`) and carried no device reference.
/// Version 2 scopes every entity to its device. The rewrite only happens
/// when the account has exactly one device; with several devices the old
/// entries are ambiguous and are dropped so they get re-registered with
/// defaults.
pub fn migrate_document(document: &mut Value, account_email: &str, device_ids: &[DeviceId]) {
    let version = document
        .get("version")
        .and_then(Value::as_u64)
        .unwrap_or(STORAGE_VERSION as u64);

    if version >= STORAGE_VERSION as u64 {
        return;
    }

    tracing::info!(
        "Migrating entity registry from version {} to {}",
        version,
        STORAGE_VERSION
    );

    let single_device = match device_ids {
        [only] => Some(only.clone()),
        _ => None,
    };

    if let Some(entities) = document.get_mut("entities").and_then(Value::as_array_mut) {
        entities.retain_mut(|entry| migrate_entry(entry, account_email, single_device.as_ref()));
    }

    document["version"] = Value::from(STORAGE_VERSION);
}

/// Returns false when the entry cannot be carried over.
fn migrate_entry(entry: &mut Value, account_email: &str, device: Option<&DeviceId>) -> bool {
    if entry.get("device_id").map_or(false, |v| !v.is_null()) {
        return true;
    }

    let name = entry
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned();
    let account_scoped_id = slugify(&format!("{}_{}", name, account_email));

    let matches_old_shape = entry
        .get("unique_id")
        .and_then(Value::as_str)
        .map_or(false, |id| id == account_scoped_id);

    if !matches_old_shape {
        tracing::warn!("Dropping unrecognized registry entry during migration: {}", entry);
        return false;
    }

    let Some(device_id) = device else {
        tracing::warn!(
            "Dropping ambiguous account-scoped entry '{}': account has several devices",
            name
        );
        return false;
    };

    let new_unique_id = slugify(&format!("{}_{}", device_id, name));
    tracing::info!("Migrating unique id {} -> {}", account_scoped_id, new_unique_id);

    entry["unique_id"] = Value::from(new_unique_id);
    entry["device_id"] = Value::from(device_id.as_str());

    true
}
