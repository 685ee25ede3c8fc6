use std::collections::HashMap;

use webasto::{Credentials, Device, DeviceId};

use super::Command;

/// Outbound port to the vendor cloud. The production implementation lives in
/// `adapter::webasto`, tests use an in-memory fake.
pub trait CloudPort {
    async fn login(&self) -> webasto::Result<()>;
    async fn fetch_devices(&self) -> webasto::Result<HashMap<DeviceId, Device>>;
    async fn execute(&self, command: &Command) -> webasto::Result<()>;
    async fn replace_credentials(&self, credentials: Credentials);
    async fn account_email(&self) -> String;
}
