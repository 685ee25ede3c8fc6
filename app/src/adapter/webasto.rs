use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;
use webasto::{Credentials, Device, DeviceId, WebastoClient};

use crate::core::{CloudPort, Command};

fn default_poll_interval() -> u64 {
    60
}

#[derive(Debug, Clone, Deserialize)]
pub struct CloudConfig {
    /// Override for tests and on-premise API gateways.
    pub base_url: Option<String>,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

impl CloudConfig {
    pub fn new_client(&self, credentials: Credentials) -> WebastoClient {
        match &self.base_url {
            Some(url) => WebastoClient::with_base_url(url, credentials),
            None => WebastoClient::new(credentials),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

impl CloudPort for WebastoClient {
    async fn login(&self) -> webasto::Result<()> {
        WebastoClient::login(self).await
    }

    async fn fetch_devices(&self) -> webasto::Result<HashMap<DeviceId, Device>> {
        WebastoClient::fetch_devices(self).await
    }

    async fn execute(&self, command: &Command) -> webasto::Result<()> {
        match command {
            Command::SetOutput {
                device,
                channel,
                on,
            } => self.set_output(device, *channel, *on).await,
            Command::SetVentilationMode { device, on } => {
                self.set_ventilation_mode(device, *on).await
            }
            Command::SetLowVoltageCutoff { device, value } => {
                self.set_low_voltage_cutoff(device, *value).await
            }
            Command::SetTemperatureCompensation { device, value } => {
                self.set_temperature_compensation(device, *value).await
            }
        }
    }

    async fn replace_credentials(&self, credentials: Credentials) {
        WebastoClient::replace_credentials(self, credentials).await;
    }

    async fn account_email(&self) -> String {
        WebastoClient::account_email(self).await
    }
}
