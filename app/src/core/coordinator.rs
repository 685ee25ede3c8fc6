use std::collections::HashMap;
use std::time::Duration;

use anyhow::Context as _;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::MissedTickBehavior;
use webasto::{Credentials, Device, DeviceId};

use super::{CloudPort, Command};

/// Connection state towards the vendor cloud. `AuthExpired` is the
/// recoverable needs-reauthentication condition: polling keeps running at
/// the normal interval, but entities are unavailable until new credentials
/// arrive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CloudState {
    Connected,
    AuthExpired,
    Offline,
}

/// Latest snapshot as broadcast to every subscriber. The device map is kept
/// across failed refreshes so diagnostics still show the last known data.
#[derive(Debug, Clone)]
pub struct CoordinatorState {
    pub cloud: CloudState,
    pub devices: HashMap<DeviceId, Device>,
    pub last_refresh: Option<DateTime<Utc>>,
}

impl CoordinatorState {
    pub fn needs_reauth(&self) -> bool {
        self.cloud == CloudState::AuthExpired
    }

    pub fn is_connected(&self) -> bool {
        self.cloud == CloudState::Connected
    }
}

enum Request {
    Execute {
        command: Command,
        respond_to: oneshot::Sender<anyhow::Result<()>>,
    },
    ReplaceCredentials {
        credentials: Credentials,
        respond_to: oneshot::Sender<anyhow::Result<()>>,
    },
}

/// Cheap handle for entities and frontends: read or await the snapshot,
/// submit commands. All cloud access stays serialized in the coordinator
/// task, which owns the single client.
#[derive(Clone)]
pub struct CoordinatorHandle {
    state_rx: watch::Receiver<CoordinatorState>,
    request_tx: mpsc::Sender<Request>,
}

impl CoordinatorHandle {
    pub fn current(&self) -> CoordinatorState {
        self.state_rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<CoordinatorState> {
        self.state_rx.clone()
    }

    pub async fn execute(&self, command: Command) -> anyhow::Result<()> {
        let (respond_to, response) = oneshot::channel();

        self.request_tx
            .send(Request::Execute {
                command,
                respond_to,
            })
            .await
            .context("Coordinator task is gone")?;

        response.await.context("Coordinator dropped the command")?
    }

    pub async fn replace_credentials(&self, credentials: Credentials) -> anyhow::Result<()> {
        let (respond_to, response) = oneshot::channel();

        self.request_tx
            .send(Request::ReplaceCredentials {
                credentials,
                respond_to,
            })
            .await
            .context("Coordinator task is gone")?;

        response.await.context("Coordinator dropped the request")?
    }
}

pub struct UpdateCoordinator<C> {
    cloud: C,
    interval: Duration,
    state_tx: watch::Sender<CoordinatorState>,
    request_rx: mpsc::Receiver<Request>,
}

impl<C: CloudPort> UpdateCoordinator<C> {
    pub fn new(cloud: C, interval: Duration) -> (Self, CoordinatorHandle) {
        let (state_tx, state_rx) = watch::channel(CoordinatorState {
            cloud: CloudState::Offline,
            devices: HashMap::new(),
            last_refresh: None,
        });
        let (request_tx, request_rx) = mpsc::channel(16);

        let coordinator = Self {
            cloud,
            interval,
            state_tx,
            request_rx,
        };

        let handle = CoordinatorHandle {
            state_rx,
            request_tx,
        };

        (coordinator, handle)
    }

    /// Startup guard: rejected credentials abort the setup, anything else is
    /// left to the regular retry cycle.
    pub async fn first_refresh(&mut self) -> anyhow::Result<()> {
        match self.cloud.login().await {
            Ok(()) => {}
            Err(e) if e.is_auth() => {
                anyhow::bail!("Invalid email or password specified");
            }
            Err(e) => return Err(e).context("Error connecting to the cloud"),
        }

        tracing::debug!("Connected to {}", self.cloud.account_email().await);
        self.refresh().await;

        Ok(())
    }

    pub async fn run(mut self) {
        let start = tokio::time::Instant::now() + self.interval;
        let mut ticker = tokio::time::interval_at(start, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.refresh().await;
                }

                request = self.request_rx.recv() => match request {
                    Some(Request::Execute { command, respond_to }) => {
                        let result = self.execute(command).await;
                        let _ = respond_to.send(result);
                    }
                    Some(Request::ReplaceCredentials { credentials, respond_to }) => {
                        let result = self.replace_credentials(credentials).await;
                        let _ = respond_to.send(result);
                    }
                    None => {
                        tracing::error!("Coordinator request channel closed, stopping");
                        return;
                    }
                }
            }
        }
    }

    async fn execute(&mut self, command: Command) -> anyhow::Result<()> {
        tracing::info!("Executing {:?}", command);

        match self.cloud.execute(&command).await {
            Ok(()) => {
                self.refresh().await;
                Ok(())
            }
            Err(e) if e.is_auth() => {
                self.set_cloud_state(CloudState::AuthExpired);
                Err(e).context("Command rejected, reauthentication required")
            }
            Err(e) => Err(e).with_context(|| format!("Error executing {:?}", command)),
        }
    }

    async fn replace_credentials(&mut self, credentials: Credentials) -> anyhow::Result<()> {
        self.cloud.replace_credentials(credentials).await;

        match self.cloud.login().await {
            Ok(()) => {
                tracing::info!("Reauthorization OK");
                self.refresh().await;
                Ok(())
            }
            Err(e) if e.is_auth() => {
                self.set_cloud_state(CloudState::AuthExpired);
                anyhow::bail!("Reauthorization failed, credentials rejected");
            }
            Err(e) => Err(e).context("Error logging in with new credentials"),
        }
    }

    async fn refresh(&mut self) {
        match self.try_fetch().await {
            Ok(devices) => {
                tracing::debug!("Refreshed snapshot of {} devices", devices.len());
                self.state_tx.send_modify(|state| {
                    state.cloud = CloudState::Connected;
                    state.devices = devices;
                    state.last_refresh = Some(Utc::now());
                });
            }
            Err(e) if e.is_auth() => {
                tracing::warn!("Cloud session no longer authorized, requesting reauthentication");
                self.set_cloud_state(CloudState::AuthExpired);
            }
            Err(e) => {
                tracing::error!("Error refreshing device snapshot: {:?}", e);
                self.set_cloud_state(CloudState::Offline);
            }
        }
    }

    /// A lapsed session is renewed once per cycle; failing that, the auth
    /// error propagates and flips the state to `AuthExpired`.
    async fn try_fetch(&self) -> webasto::Result<HashMap<DeviceId, Device>> {
        match self.cloud.fetch_devices().await {
            Err(e) if e.is_auth() => {
                tracing::debug!("Session lapsed, logging in again");
                self.cloud.login().await?;
                self.cloud.fetch_devices().await
            }
            other => other,
        }
    }

    fn set_cloud_state(&self, cloud: CloudState) {
        self.state_tx.send_modify(|state| state.cloud = cloud);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use chrono::NaiveDate;
    use webasto::{Error, Output};

    use super::*;

    #[derive(Default)]
    struct FakeCloud {
        login_results: Mutex<VecDeque<webasto::Result<()>>>,
        fetch_results: Mutex<VecDeque<webasto::Result<HashMap<DeviceId, Device>>>>,
        executed: Mutex<Vec<Command>>,
    }

    impl FakeCloud {
        fn next_login(self, result: webasto::Result<()>) -> Self {
            self.login_results.lock().unwrap().push_back(result);
            self
        }

        fn next_fetch(self, result: webasto::Result<HashMap<DeviceId, Device>>) -> Self {
            self.fetch_results.lock().unwrap().push_back(result);
            self
        }

        fn executed(&self) -> Vec<Command> {
            self.executed.lock().unwrap().clone()
        }
    }

    impl CloudPort for &FakeCloud {
        async fn login(&self) -> webasto::Result<()> {
            self.login_results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(()))
        }

        async fn fetch_devices(&self) -> webasto::Result<HashMap<DeviceId, Device>> {
            self.fetch_results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(HashMap::new()))
        }

        async fn execute(&self, command: &Command) -> webasto::Result<()> {
            self.executed.lock().unwrap().push(command.clone());
            Ok(())
        }

        async fn replace_credentials(&self, _credentials: Credentials) {}

        async fn account_email(&self) -> String {
            "owner@example.com".to_owned()
        }
    }

    fn test_device(id: &str) -> (DeviceId, Device) {
        let device = Device {
            id: DeviceId::from(id),
            name: "Camper".to_owned(),
            temperature: 4.5.into(),
            temperature_unit: Default::default(),
            voltage: 12.6.into(),
            low_voltage_cutoff: 11.5.into(),
            temperature_compensation: 0.0,
            output_main: Output {
                on: false,
                name: Some("Heater".to_owned()),
            },
            output_aux1: None,
            output_aux2: None,
            ventilation_mode: false,
            location: None,
            subscription_expiration: NaiveDate::from_ymd_opt(2026, 11, 2).unwrap(),
            hw_version: None,
            sw_version: None,
            attributes: Default::default(),
        };

        (device.id.clone(), device)
    }

    fn api_error() -> Error {
        Error::Api {
            status: 500,
            message: "boom".to_owned(),
        }
    }

    #[tokio::test]
    async fn successful_refresh_broadcasts_the_snapshot() {
        let cloud = FakeCloud::default().next_fetch(Ok(HashMap::from([test_device("WBC1")])));
        let (mut coordinator, handle) = UpdateCoordinator::new(&cloud, Duration::from_secs(60));

        coordinator.first_refresh().await.unwrap();

        let state = handle.current();
        assert_eq!(state.cloud, CloudState::Connected);
        assert!(state.devices.contains_key(&DeviceId::from("WBC1")));
        assert!(state.last_refresh.is_some());
    }

    #[tokio::test]
    async fn rejected_credentials_abort_the_startup() {
        let cloud = FakeCloud::default().next_login(Err(Error::Unauthorized));
        let (mut coordinator, handle) = UpdateCoordinator::new(&cloud, Duration::from_secs(60));

        let result = coordinator.first_refresh().await;

        assert!(result.is_err());
        assert_eq!(handle.current().cloud, CloudState::Offline);
    }

    #[tokio::test]
    async fn lapsed_session_is_renewed_within_one_cycle() {
        let cloud = FakeCloud::default()
            .next_fetch(Err(Error::Unauthorized))
            .next_login(Ok(()))
            .next_fetch(Ok(HashMap::from([test_device("WBC1")])));
        let (mut coordinator, handle) = UpdateCoordinator::new(&cloud, Duration::from_secs(60));

        coordinator.refresh().await;

        assert_eq!(handle.current().cloud, CloudState::Connected);
    }

    #[tokio::test]
    async fn failed_relogin_raises_the_reauth_condition() {
        let cloud = FakeCloud::default()
            .next_fetch(Ok(HashMap::from([test_device("WBC1")])))
            .next_fetch(Err(Error::Unauthorized))
            .next_login(Err(Error::Unauthorized));
        let (mut coordinator, handle) = UpdateCoordinator::new(&cloud, Duration::from_secs(60));

        coordinator.refresh().await;
        coordinator.refresh().await;

        let state = handle.current();
        assert!(state.needs_reauth());
        // last known snapshot is kept for diagnostics
        assert!(state.devices.contains_key(&DeviceId::from("WBC1")));
    }

    #[tokio::test]
    async fn transient_errors_mark_the_cloud_offline_and_recover() {
        let cloud = FakeCloud::default()
            .next_fetch(Err(api_error()))
            .next_fetch(Ok(HashMap::from([test_device("WBC1")])));
        let (mut coordinator, handle) = UpdateCoordinator::new(&cloud, Duration::from_secs(60));

        coordinator.refresh().await;
        assert_eq!(handle.current().cloud, CloudState::Offline);

        coordinator.refresh().await;
        assert_eq!(handle.current().cloud, CloudState::Connected);
    }

    #[tokio::test]
    async fn commands_are_followed_by_a_refresh() {
        let cloud = FakeCloud::default()
            .next_fetch(Ok(HashMap::from([test_device("WBC1")])))
            .next_fetch(Ok(HashMap::from([test_device("WBC1")])));
        let (mut coordinator, handle) = UpdateCoordinator::new(&cloud, Duration::from_secs(60));

        coordinator.refresh().await;
        let before = handle.current().last_refresh;

        coordinator
            .execute(Command::SetVentilationMode {
                device: DeviceId::from("WBC1"),
                on: true,
            })
            .await
            .unwrap();

        assert_eq!(cloud.executed().len(), 1);
        assert!(handle.current().last_refresh >= before);
    }

    #[tokio::test]
    async fn replaced_credentials_trigger_an_immediate_refresh() {
        let cloud = FakeCloud::default()
            .next_login(Ok(()))
            .next_fetch(Ok(HashMap::from([test_device("WBC1")])));
        let (mut coordinator, handle) = UpdateCoordinator::new(&cloud, Duration::from_secs(60));

        coordinator
            .replace_credentials(Credentials {
                email: "owner@example.com".to_owned(),
                password: "new-secret".to_owned(),
            })
            .await
            .unwrap();

        assert_eq!(handle.current().cloud, CloudState::Connected);
    }
}
