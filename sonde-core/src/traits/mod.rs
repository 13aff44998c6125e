//! Hardware abstraction traits
//!
//! These traits define the interface between the telemetry logic and the
//! board-specific drivers and network stack.

pub mod sensor;
pub mod transport;

pub use sensor::{
    HumidityMeasurement, HumiditySensor, PressureMeasurement, PressureSensor, ProbeError,
    SensorError,
};
pub use transport::{ConnectOptions, MetricsTransport};
