use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Volt(pub f64);

impl From<f64> for Volt {
    fn from(value: f64) -> Self {
        Self(value)
    }
}

impl From<&Volt> for f64 {
    fn from(value: &Volt) -> Self {
        value.0
    }
}

impl Display for Volt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} V", self.0)
    }
}
