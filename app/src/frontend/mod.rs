mod mqtt;

pub use mqtt::{MqttFrontendConfig, MqttFrontendRunner};
