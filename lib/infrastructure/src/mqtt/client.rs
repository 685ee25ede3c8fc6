use std::sync::Arc;

use rumqttc::v5::{
    mqttbytes::{v5::ConnectProperties, QoS},
    AsyncClient, Event::Incoming, EventLoop, MqttOptions,
};
use tokio::sync::mpsc;

use super::*;

pub struct Mqtt {
    client: Arc<AsyncClient>,
    event_loop: EventLoop,
    subscriptions: Vec<MqttSubscriptionHandle>,
}

struct MqttSubscriptionHandle {
    filter: String,
    txs: Vec<mpsc::Sender<MqttInMessage>>,
}

impl Mqtt {
    pub fn connect(host: &str, port: u16, client_id: &str) -> Self {
        let mut mqttoptions = MqttOptions::new(client_id, host, port);
        mqttoptions.set_keep_alive(::std::time::Duration::from_secs(5));
        mqttoptions.set_clean_start(false);

        let mut connect_props = ConnectProperties::new();
        connect_props.session_expiry_interval = 60.into();
        connect_props.max_packet_size = Some(1024 * 1024);
        mqttoptions.set_connect_properties(connect_props);

        let (client, event_loop) = AsyncClient::new(mqttoptions, 10);

        Mqtt {
            client: Arc::new(client),
            event_loop,
            subscriptions: vec![],
        }
    }

    pub async fn subscribe(&mut self, filter: impl Into<String>) -> anyhow::Result<MqttSubscription> {
        let filter = filter.into();
        let (tx, rx) = mpsc::channel::<MqttInMessage>(32);

        if let Some(subscription) = self.subscriptions.iter_mut().find(|s| s.filter == filter) {
            tracing::info!("Adding receiver to existing subscription: {:?}", &filter);
            subscription.txs.push(tx);
            return Ok(MqttSubscription::new(rx));
        }

        tracing::info!("Creating new subscription for topic filter: {:?}", &filter);

        self.client.subscribe(&filter, QoS::AtLeastOnce).await?;
        self.subscriptions.push(MqttSubscriptionHandle {
            filter,
            txs: vec![tx],
        });

        Ok(MqttSubscription::new(rx))
    }

    pub fn sender(&self) -> MqttSender {
        MqttSender::new(self.client.clone())
    }

    //Receive and forward MQTT messages
    pub async fn run(mut self) {
        loop {
            match self.event_loop.poll().await {
                Ok(Incoming(rumqttc::v5::mqttbytes::v5::Packet::Publish(publish))) => {
                    self.handle_publish(&publish).await;
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::error!("MQTT connection error, retrying: {}", e);
                    tokio::time::sleep(std::time::Duration::from_secs(1)).await;
                }
            }
        }
    }

    async fn handle_publish(&self, msg: &rumqttc::v5::mqttbytes::v5::Publish) {
        let mqtt_in_message: MqttInMessage = match msg.try_into() {
            Ok(m) => m,
            Err(e) => {
                tracing::error!("Error parsing MQTT message: {}", e);
                return;
            }
        };

        tracing::trace!("Received MQTT message on topic {}", mqtt_in_message.topic);

        for subscription in self
            .subscriptions
            .iter()
            .filter(|s| topic_matches(&s.filter, &mqtt_in_message.topic))
        {
            for tx in subscription.txs.iter() {
                if let Err(e) = tx
                    .send_timeout(mqtt_in_message.clone(), tokio::time::Duration::from_secs(5))
                    .await
                {
                    tracing::error!(
                        "Failed to forward MQTT message to subscriber {}: {}",
                        subscription.filter,
                        e
                    );
                }
            }
        }
    }
}

/// Match a topic against a subscription filter. Only the wildcards actually
/// used by this service are supported: a trailing `#` and single-level `+`.
fn topic_matches(filter: &str, topic: &str) -> bool {
    let mut filter_parts = filter.split('/');
    let mut topic_parts = topic.split('/');

    loop {
        match (filter_parts.next(), topic_parts.next()) {
            (Some("#"), _) => return true,
            (Some("+"), Some(_)) => continue,
            (Some(f), Some(t)) if f == t => continue,
            (None, None) => return true,
            _ => return false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::topic_matches;

    #[test]
    fn exact_topics_match() {
        assert!(topic_matches("bridge/set", "bridge/set"));
        assert!(!topic_matches("bridge/set", "bridge/state"));
    }

    #[test]
    fn trailing_hash_matches_subtree() {
        assert!(topic_matches("bridge/#", "bridge/switch/heater/state"));
        assert!(!topic_matches("bridge/#", "other/switch"));
    }

    #[test]
    fn plus_matches_one_level() {
        assert!(topic_matches("bridge/+/set", "bridge/heater/set"));
        assert!(!topic_matches("bridge/+/set", "bridge/heater/aux/set"));
    }
}
