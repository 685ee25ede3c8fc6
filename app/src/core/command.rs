use support::unit::Volt;
use webasto::{DeviceId, OutputChannel};

/// Mutations an entity can request against the cloud. Every command is
/// followed by an immediate refresh so the republished state reflects the
/// change without waiting for the next poll.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SetOutput {
        device: DeviceId,
        channel: OutputChannel,
        on: bool,
    },
    SetVentilationMode {
        device: DeviceId,
        on: bool,
    },
    SetLowVoltageCutoff {
        device: DeviceId,
        value: Volt,
    },
    SetTemperatureCompensation {
        device: DeviceId,
        value: f64,
    },
}

impl Command {
    pub fn device(&self) -> &DeviceId {
        match self {
            Command::SetOutput { device, .. }
            | Command::SetVentilationMode { device, .. }
            | Command::SetLowVoltageCutoff { device, .. }
            | Command::SetTemperatureCompensation { device, .. } => device,
        }
    }
}
