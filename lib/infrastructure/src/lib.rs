mod http;
mod monitoring;
mod mqtt;

pub use monitoring::{EnvFilterConfig, MonitoringConfig};

pub use http::server::HttpServerConfig;
pub use mqtt::{Mqtt, MqttConfig, MqttInMessage, MqttSender, MqttSubscription};
