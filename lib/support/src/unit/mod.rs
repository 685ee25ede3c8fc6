mod degree_celsius;
mod temperature_unit;
mod volt;

pub use degree_celsius::DegreeCelsius;
pub use temperature_unit::TemperatureUnit;
pub use volt::Volt;
