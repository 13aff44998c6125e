//! Environmental sensor traits

/// Errors from a single measurement attempt
///
/// These are transient: the caller keeps the previous values and retries on
/// the next poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorError {
    /// Bus transaction failed (NACK, arbitration loss, ...)
    Bus,
    /// Device reported a conversion still in progress
    Busy,
    /// Raw data could not be compensated
    InvalidData,
}

/// Errors from the one-time probe of a device
///
/// A device that fails its probe stays unavailable for the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ProbeError {
    /// Nothing answered at the expected address(es)
    NotDetected,
    /// Something answered but with an unexpected identity byte
    WrongChipId(u8),
    /// Device answered but configuration or calibration transfer failed
    Bus,
}

/// Result of one humidity sensor conversion
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HumidityMeasurement {
    /// Degrees Celsius
    pub temperature_c: f32,
    /// Relative humidity in percent
    pub humidity_pct: f32,
}

/// Result of one pressure sensor conversion
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PressureMeasurement {
    /// Degrees Celsius
    pub temperature_c: f32,
    /// Hectopascals
    pub pressure_hpa: f32,
}

/// Temperature and relative humidity sensor
pub trait HumiditySensor {
    /// Trigger a conversion and read it back
    ///
    /// May block for the device's conversion time.
    fn read_humidity(&mut self) -> Result<HumidityMeasurement, SensorError>;
}

/// Temperature and barometric pressure sensor
pub trait PressureSensor {
    /// Read the latest conversion
    fn read_pressure(&mut self) -> Result<PressureMeasurement, SensorError>;
}
