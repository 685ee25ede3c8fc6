use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Display unit the cloud account is configured with. The cloud reports
/// temperatures already converted, so this is carried along, never applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TemperatureUnit {
    #[default]
    #[serde(rename = "C", alias = "°C", alias = "celsius")]
    Celsius,
    #[serde(rename = "F", alias = "°F", alias = "fahrenheit")]
    Fahrenheit,
}

impl TemperatureUnit {
    pub fn symbol(&self) -> &'static str {
        match self {
            TemperatureUnit::Celsius => "°C",
            TemperatureUnit::Fahrenheit => "°F",
        }
    }
}

impl Display for TemperatureUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}
