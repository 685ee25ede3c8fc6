use std::path::PathBuf;

use config::{Config, ConfigError, Environment, File};
use infrastructure::{HttpServerConfig, MonitoringConfig, MqttConfig};
use serde::Deserialize;
use support::file::find_file_upwards;
use webasto::Credentials;

use crate::adapter::CloudConfig;
use crate::frontend::MqttFrontendConfig;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub account: Credentials,
    pub cloud: CloudConfig,
    pub storage: StorageSettings,
    pub mqtt: MqttConfig,
    pub frontend: MqttFrontendConfig,
    pub http_server: HttpServerConfig,
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageSettings {
    pub directory: PathBuf,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let source = match find_file_upwards("config.toml") {
            Some(path) => File::from(path),
            None => File::with_name("config.toml"),
        };

        let builder = Config::builder()
            .add_source(source)
            .add_source(Environment::default().separator("_").list_separator(","));

        builder.build()?.try_deserialize()
    }
}
