use std::collections::HashMap;
use std::sync::Arc;

use infrastructure::{Mqtt, MqttInMessage, MqttSender, MqttSubscription};
use serde::{Deserialize, Serialize};
use tokio::sync::{watch, RwLock};

use crate::core::entity::{EntityState, Platform};
use crate::core::{CoordinatorHandle, CoordinatorState, EntityRegistry};
use crate::platform;

#[derive(Debug, Clone, Deserialize)]
pub struct MqttFrontendConfig {
    pub base_topic: String,
}

impl MqttFrontendConfig {
    pub async fn new_runner(
        &self,
        mqtt_client: &mut Mqtt,
        handle: CoordinatorHandle,
        registry: Arc<RwLock<EntityRegistry>>,
    ) -> anyhow::Result<MqttFrontendRunner> {
        let subscription = mqtt_client
            .subscribe(format!("{}/set", self.base_topic))
            .await?;

        Ok(MqttFrontendRunner {
            base_topic: self.base_topic.clone(),
            sender: mqtt_client.sender(),
            subscription,
            state_rx: handle.subscribe(),
            handle,
            registry,
            last_published: HashMap::new(),
        })
    }
}

/// State document published per entity. Retained, so hosts picking up the
/// bridge later still see the last snapshot.
#[derive(Debug, Serialize)]
struct StateDocument<'a> {
    entity_id: &'a str,
    platform: Platform,
    #[serde(flatten)]
    state: EntityState,
}

#[derive(Debug, Deserialize)]
struct SetRequest {
    entity_id: String,
    value: serde_json::Value,
}

/// Republishes every coordinator broadcast to retained state topics and
/// turns `{base_topic}/set` requests into cloud commands.
pub struct MqttFrontendRunner {
    base_topic: String,
    sender: MqttSender,
    subscription: MqttSubscription,
    state_rx: watch::Receiver<CoordinatorState>,
    handle: CoordinatorHandle,
    registry: Arc<RwLock<EntityRegistry>>,
    last_published: HashMap<String, String>,
}

impl MqttFrontendRunner {
    pub async fn run(mut self) {
        self.publish_states().await;

        loop {
            tokio::select! {
                changed = self.state_rx.changed() => {
                    if changed.is_err() {
                        tracing::error!("Coordinator state channel closed, stopping MQTT frontend");
                        return;
                    }
                    self.publish_states().await;
                }

                message = self.subscription.recv() => match message {
                    Some(message) => self.handle_set_request(&message).await,
                    None => {
                        tracing::error!("MQTT subscription closed, stopping MQTT frontend");
                        return;
                    }
                }
            }
        }
    }

    async fn publish_states(&mut self) {
        let state = self.state_rx.borrow_and_update().clone();
        let registry = self.registry.read().await;

        for entry in registry.enabled_entries() {
            let document = StateDocument {
                entity_id: &entry.entity_id,
                platform: entry.platform,
                state: platform::state_of(entry, &state),
            };

            let payload = match serde_json::to_string(&document) {
                Ok(payload) => payload,
                Err(e) => {
                    tracing::error!("Error serializing state of {}: {:?}", entry.entity_id, e);
                    continue;
                }
            };

            let topic = state_topic(&self.base_topic, &entry.entity_id);

            // retained topics only change when the state does; this also
            // keeps an unchanged tracker position from re-announcing itself
            if self.last_published.get(&topic) == Some(&payload) {
                continue;
            }

            if let Err(e) = self.sender.send_retained(topic.clone(), payload.clone()).await {
                tracing::error!("Error publishing state of {}: {:?}", entry.entity_id, e);
                continue;
            }

            self.last_published.insert(topic, payload);
        }
    }

    async fn handle_set_request(&self, message: &MqttInMessage) {
        let request: SetRequest = match message.json() {
            Ok(request) => request,
            Err(e) => {
                tracing::error!("Error parsing set request {:?}: {:?}", message.payload, e);
                return;
            }
        };

        let command = {
            let registry = self.registry.read().await;

            let Some(entry) = registry.find_by_entity_id(&request.entity_id) else {
                tracing::warn!("Set request for unknown entity {}", request.entity_id);
                return;
            };

            if !entry.enabled {
                tracing::warn!("Set request for disabled entity {}", request.entity_id);
                return;
            }

            match platform::command_for(entry, &request.value) {
                Ok(command) => command,
                Err(e) => {
                    tracing::warn!("Rejected set request for {}: {:?}", request.entity_id, e);
                    return;
                }
            }
        };

        tracing::info!("Processing set request for {}", request.entity_id);

        if let Err(e) = self.handle.execute(command).await {
            tracing::error!("Error executing set request for {}: {:?}", request.entity_id, e);
        }
    }
}

fn state_topic(base_topic: &str, entity_id: &str) -> String {
    format!("{}/{}", base_topic, entity_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::testing::{connected_state, test_device};
    use crate::platform::{sensor, testing};

    #[test]
    fn state_topics_are_entity_scoped() {
        assert_eq!(
            state_topic("webasto", "sensor.camper_temperature"),
            "webasto/sensor.camper_temperature"
        );
    }

    #[test]
    fn state_documents_flatten_the_entity_state() {
        let device = test_device("WBC1");
        let state = connected_state(device.clone());
        let entry = testing::entry_for(&sensor::definitions_for(&device)[0]);

        let document = StateDocument {
            entity_id: &entry.entity_id,
            platform: entry.platform,
            state: platform::state_of(&entry, &state),
        };

        let value = serde_json::to_value(&document).unwrap();
        assert_eq!(value["entity_id"], "sensor.camper_temperature");
        assert_eq!(value["platform"], "sensor");
        assert_eq!(value["value"], 4.5);
        assert_eq!(value["available"], true);
    }

    #[test]
    fn set_requests_parse_the_command_envelope() {
        let request: SetRequest = serde_json::from_str(
            r#"{"entity_id": "switch.camper_parking_heater", "value": true}"#,
        )
        .unwrap();

        assert_eq!(request.entity_id, "switch.camper_parking_heater");
        assert_eq!(request.value, serde_json::json!(true));
    }
}
