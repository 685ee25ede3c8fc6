use std::collections::HashMap;

use reqwest::StatusCode;
use reqwest_middleware::ClientWithMiddleware;
use reqwest_tracing::TracingMiddleware;
use serde::{Deserialize, Serialize};
use serde_json::json;
use support::unit::Volt;
use tokio::sync::RwLock;

use crate::model::{into_device_map, Device, DeviceId, OutputChannel};
use crate::{Error, Result};

const DEFAULT_BASE_URL: &str = "https://my.webastoconnect.com";

/// Account credentials for the vendor cloud.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

//password must not leak into logs or error chains
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

/// Authenticated HTTP client for the preheater cloud. Holds the session
/// token behind a lock so a shared reference can be used from the
/// coordinator task.
pub struct WebastoClient {
    http: ClientWithMiddleware,
    base_url: String,
    credentials: RwLock<Credentials>,
    session: RwLock<Option<String>>,
}

#[derive(Deserialize)]
struct SessionResponse {
    token: String,
}

impl WebastoClient {
    pub fn new(credentials: Credentials) -> Self {
        Self::with_base_url(DEFAULT_BASE_URL, credentials)
    }

    pub fn with_base_url(base_url: &str, credentials: Credentials) -> Self {
        let client = reqwest::Client::builder()
            .build()
            .expect("Error creating HTTP client");

        let http = reqwest_middleware::ClientBuilder::new(client)
            .with(TracingMiddleware::default())
            .build();

        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_owned(),
            credentials: RwLock::new(credentials),
            session: RwLock::new(None),
        }
    }

    pub async fn account_email(&self) -> String {
        self.credentials.read().await.email.clone()
    }

    /// Swap the account on a running client. The old session is dropped, the
    /// next call logs in with the new credentials.
    pub async fn replace_credentials(&self, credentials: Credentials) {
        *self.credentials.write().await = credentials;
        *self.session.write().await = None;
    }

    /// Authenticate against the cloud and store the session token.
    pub async fn login(&self) -> Result<()> {
        let credentials = self.credentials.read().await.clone();

        let response = self
            .http
            .post(format!("{}/api/session", self.base_url))
            .json(&credentials)
            .send()
            .await?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(Error::Unauthorized),
            status if !status.is_success() => Err(api_error(response).await),
            _ => {
                let session: SessionResponse = response.json().await?;
                *self.session.write().await = Some(session.token);
                tracing::debug!("Cloud session established for {}", credentials.email);
                Ok(())
            }
        }
    }

    /// Fetch the current snapshot of every device on the account.
    pub async fn fetch_devices(&self) -> Result<HashMap<DeviceId, Device>> {
        let response = self.get("/api/devices").await?;
        let devices: Vec<Device> = response.json().await?;

        Ok(into_device_map(devices))
    }

    pub async fn set_output(&self, device: &DeviceId, channel: OutputChannel, on: bool) -> Result<()> {
        self.post(
            &format!("/api/devices/{}/outputs/{}", device, channel.as_str()),
            json!({ "on": on }),
        )
        .await
    }

    pub async fn set_ventilation_mode(&self, device: &DeviceId, on: bool) -> Result<()> {
        self.post(
            &format!("/api/devices/{}/ventilation-mode", device),
            json!({ "on": on }),
        )
        .await
    }

    pub async fn set_low_voltage_cutoff(&self, device: &DeviceId, value: Volt) -> Result<()> {
        self.post(
            &format!("/api/devices/{}/settings", device),
            json!({ "low_voltage_cutoff": value }),
        )
        .await
    }

    pub async fn set_temperature_compensation(&self, device: &DeviceId, value: f64) -> Result<()> {
        self.post(
            &format!("/api/devices/{}/settings", device),
            json!({ "temperature_compensation": value }),
        )
        .await
    }

    async fn get(&self, path: &str) -> Result<reqwest::Response> {
        let token = self.session_token().await?;

        let response = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .header("X-Auth-Token", token)
            .send()
            .await?;

        check_status(response).await
    }

    async fn post(&self, path: &str, body: serde_json::Value) -> Result<()> {
        let token = self.session_token().await?;

        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .header("X-Auth-Token", token)
            .json(&body)
            .send()
            .await?;

        check_status(response).await.map(|_| ())
    }

    async fn session_token(&self) -> Result<String> {
        match self.session.read().await.as_ref() {
            Some(token) => Ok(token.clone()),
            None => Err(Error::Unauthorized),
        }
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    match response.status() {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(Error::Unauthorized),
        status if !status.is_success() => Err(api_error(response).await),
        _ => Ok(response),
    }
}

async fn api_error(response: reqwest::Response) -> Error {
    let status = response.status().as_u16();
    let message = response.text().await.unwrap_or_default();

    Error::Api { status, message }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_redacts_the_password() {
        let credentials = Credentials {
            email: "owner@example.com".to_owned(),
            password: "hunter2".to_owned(),
        };

        let rendered = format!("{:?}", credentials);
        assert!(rendered.contains("owner@example.com"));
        assert!(!rendered.contains("hunter2"));
    }

    #[tokio::test]
    async fn calls_without_a_session_fail_as_unauthorized() {
        let client = WebastoClient::new(Credentials {
            email: "owner@example.com".to_owned(),
            password: "hunter2".to_owned(),
        });

        let result = client.fetch_devices().await;
        assert!(matches!(result, Err(Error::Unauthorized)));
    }
}
