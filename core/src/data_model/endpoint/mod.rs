//! Prebuilt endpoint compositions.

pub mod dimmable_light;
pub mod pressure_sensor;
