mod client;
mod error;
mod model;

pub use client::{Credentials, WebastoClient};
pub use error::{Error, Result};
pub use model::{Device, DeviceId, Location, Output, OutputChannel};
