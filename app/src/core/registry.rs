use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::{Deserialize, Serialize};
use webasto::DeviceId;

use super::entity::{EntityCategory, EntityDefinition, Platform};
use super::migration;

pub const STORAGE_VERSION: u32 = 2;

/// One registered entity. `unique_id` is the stable identity, `entity_id`
/// and `enabled` are user-facing and survive restarts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub unique_id: String,
    pub entity_id: String,
    pub platform: Platform,
    pub device_id: DeviceId,
    pub key: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<EntityCategory>,
    pub enabled: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct RegistryDocument {
    version: u32,
    entities: Vec<RegistryEntry>,
}

/// Entity registry persisted as a JSON document. Loading runs the one-time
/// storage migration when the file still has an old version.
pub struct EntityRegistry {
    path: PathBuf,
    entities: Vec<RegistryEntry>,
}

impl EntityRegistry {
    pub async fn load(
        path: impl Into<PathBuf>,
        account_email: &str,
        device_ids: &[DeviceId],
    ) -> anyhow::Result<Self> {
        let path = path.into();

        let document = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => {
                let mut raw: serde_json::Value = serde_json::from_str(&raw)
                    .with_context(|| format!("Corrupt entity registry at {}", path.display()))?;

                migration::migrate_document(&mut raw, account_email, device_ids);

                serde_json::from_value::<RegistryDocument>(raw)
                    .with_context(|| format!("Unreadable entity registry at {}", path.display()))?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => RegistryDocument {
                version: STORAGE_VERSION,
                entities: vec![],
            },
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Error reading entity registry at {}", path.display()))
            }
        };

        Ok(Self {
            path,
            entities: document.entities,
        })
    }

    /// Register every definition that is not present yet. Existing entries
    /// keep their entity id and enabled flag untouched.
    pub fn ensure_entities(&mut self, definitions: &[EntityDefinition]) -> usize {
        let mut added = 0;

        for definition in definitions {
            if self.find_by_unique_id(&definition.unique_id).is_some() {
                continue;
            }

            let entity_id = self.claim_entity_id(&definition.entity_id);
            tracing::debug!(
                "Registering {} as {} (enabled={})",
                definition.unique_id,
                entity_id,
                definition.enabled_default
            );

            self.entities.push(RegistryEntry {
                unique_id: definition.unique_id.clone(),
                entity_id,
                platform: definition.platform,
                device_id: definition.device_id.clone(),
                key: definition.key.to_owned(),
                name: definition.name.to_owned(),
                category: definition.category,
                enabled: definition.enabled_default,
            });
            added += 1;
        }

        added
    }

    pub async fn persist(&self) -> anyhow::Result<()> {
        let document = RegistryDocument {
            version: STORAGE_VERSION,
            entities: self.entities.clone(),
        };

        let raw = serde_json::to_string_pretty(&document)?;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(&self.path, raw)
            .await
            .with_context(|| format!("Error writing entity registry to {}", self.path.display()))
    }

    pub fn entries(&self) -> &[RegistryEntry] {
        &self.entities
    }

    pub fn enabled_entries(&self) -> impl Iterator<Item = &RegistryEntry> {
        self.entities.iter().filter(|e| e.enabled)
    }

    pub fn find_by_unique_id(&self, unique_id: &str) -> Option<&RegistryEntry> {
        self.entities.iter().find(|e| e.unique_id == unique_id)
    }

    pub fn find_by_entity_id(&self, entity_id: &str) -> Option<&RegistryEntry> {
        self.entities.iter().find(|e| e.entity_id == entity_id)
    }

    /// Returns false when no such entity is registered.
    pub fn set_enabled(&mut self, entity_id: &str, enabled: bool) -> bool {
        match self.entities.iter_mut().find(|e| e.entity_id == entity_id) {
            Some(entry) => {
                entry.enabled = enabled;
                true
            }
            None => false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Two devices with the same name would otherwise collide on the
    /// presentation id; later registrations get a numeric suffix.
    fn claim_entity_id(&self, wanted: &str) -> String {
        if self.find_by_entity_id(wanted).is_none() {
            return wanted.to_owned();
        }

        let mut n = 2;
        loop {
            let candidate = format!("{}_{}", wanted, n);
            if self.find_by_entity_id(&candidate).is_none() {
                return candidate;
            }
            n += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::entity;

    fn definition(device: &str, key: &'static str, enabled_default: bool) -> EntityDefinition {
        let device_id = DeviceId::from(device);
        EntityDefinition {
            platform: Platform::Sensor,
            key,
            name: key,
            category: None,
            unique_id: entity::unique_id(&device_id, key),
            entity_id: entity::entity_id(Platform::Sensor, "Camper", key),
            device_id,
            enabled_default,
        }
    }

    #[tokio::test]
    async fn missing_file_starts_an_empty_registry() {
        let dir = tempfile::tempdir().unwrap();
        let registry = EntityRegistry::load(dir.path().join("registry.json"), "o@e.com", &[])
            .await
            .unwrap();

        assert!(registry.entries().is_empty());
    }

    #[tokio::test]
    async fn registrations_survive_a_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.json");

        let mut registry = EntityRegistry::load(&path, "o@e.com", &[]).await.unwrap();
        let added = registry.ensure_entities(&[
            definition("WBC1", "temperature", true),
            definition("WBC1", "subscription_expiration", false),
        ]);
        assert_eq!(added, 2);
        registry.persist().await.unwrap();

        let reloaded = EntityRegistry::load(&path, "o@e.com", &[]).await.unwrap();
        assert_eq!(reloaded.entries().len(), 2);
        assert!(!reloaded
            .find_by_unique_id("wbc1_subscription_expiration")
            .unwrap()
            .enabled);
    }

    #[tokio::test]
    async fn re_registration_keeps_user_state() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = EntityRegistry::load(dir.path().join("r.json"), "o@e.com", &[])
            .await
            .unwrap();

        registry.ensure_entities(&[definition("WBC1", "temperature", true)]);
        // user disables the entity out of band
        registry.entities[0].enabled = false;

        let added = registry.ensure_entities(&[definition("WBC1", "temperature", true)]);

        assert_eq!(added, 0);
        assert!(!registry.entries()[0].enabled);
    }

    #[tokio::test]
    async fn colliding_entity_ids_get_a_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = EntityRegistry::load(dir.path().join("r.json"), "o@e.com", &[])
            .await
            .unwrap();

        // two devices named identically produce the same presentation id
        registry.ensure_entities(&[definition("WBC1", "temperature", true)]);
        registry.ensure_entities(&[definition("WBC2", "temperature", true)]);

        let ids: Vec<_> = registry.entries().iter().map(|e| e.entity_id.as_str()).collect();
        assert_eq!(ids, vec!["sensor.camper_temperature", "sensor.camper_temperature_2"]);
    }
}
