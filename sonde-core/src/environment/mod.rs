//! Fused environmental reading
//!
//! Two independent devices feed one reading: a temperature/humidity sensor
//! and a pressure/temperature sensor. Either may be missing or fail a poll
//! without affecting the other.

pub mod monitor;
pub mod reading;

pub use monitor::{
    EnvTestOutcome, EnvironmentMonitor, DEFAULT_SEA_LEVEL_HPA, SELF_TEST_ATTEMPTS,
    SELF_TEST_INTERVAL_MS,
};
pub use reading::{
    altitude_m, CombinedStatus, DeviceStatus, EnvironmentalReading, Freshness, HumidityDevice,
    PressureDevice, Reading,
};
