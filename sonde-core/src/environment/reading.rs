//! Environmental reading types

/// Whether a value came from the most recent poll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Freshness {
    /// Updated by the latest poll
    Fresh,
    /// Last-known-good value (or never measured)
    #[default]
    Stale,
}

/// A measured quantity and how current it is
///
/// `value == None` means the quantity was never measured.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Reading<T> {
    pub value: Option<T>,
    pub freshness: Freshness,
}

impl<T: Copy> Reading<T> {
    /// Never measured
    pub const fn unknown() -> Self {
        Self {
            value: None,
            freshness: Freshness::Stale,
        }
    }

    /// Store a new value as fresh
    pub fn update(&mut self, value: T) {
        self.value = Some(value);
        self.freshness = Freshness::Fresh;
    }

    /// Keep the value but flag it as last-known
    pub fn mark_stale(&mut self) {
        self.freshness = Freshness::Stale;
    }

    pub fn is_fresh(&self) -> bool {
        self.freshness == Freshness::Fresh
    }

    pub fn get(&self) -> Option<T> {
        self.value
    }
}

/// Per-device acquisition status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceStatus {
    /// Did not answer the probe
    #[default]
    NotDetected,
    /// Probed, not read yet
    Initializing,
    /// Last read succeeded
    Ok,
    /// Last read failed; values are stale
    ReadError,
}

impl DeviceStatus {
    /// Display text
    pub const fn as_str(&self) -> &'static str {
        match self {
            DeviceStatus::NotDetected => "Not detected",
            DeviceStatus::Initializing => "Initializing...",
            DeviceStatus::Ok => "OK",
            DeviceStatus::ReadError => "Read error",
        }
    }
}

/// Fused status over both devices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CombinedStatus {
    BothOk,
    HumidityOnly,
    PressureOnly,
    /// Devices present but none produced a fresh reading
    NoData,
    /// Neither device answered its probe
    #[default]
    NoSensors,
}

impl CombinedStatus {
    /// Display text
    pub const fn as_str(&self) -> &'static str {
        match self {
            CombinedStatus::BothOk => "Both sensors OK",
            CombinedStatus::HumidityOnly => "AHT20 OK",
            CombinedStatus::PressureOnly => "BMP280 OK",
            CombinedStatus::NoData => "No data available",
            CombinedStatus::NoSensors => "No sensors detected",
        }
    }
}

/// Temperature/humidity device state
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HumidityDevice {
    /// Answered the probe; never changes afterwards
    pub available: bool,
    pub status: DeviceStatus,
    /// Degrees Celsius
    pub temperature: Reading<f32>,
    /// Percent relative humidity
    pub humidity: Reading<f32>,
}

/// Pressure/temperature device state
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PressureDevice {
    /// Answered the probe; never changes afterwards
    pub available: bool,
    pub status: DeviceStatus,
    /// Degrees Celsius
    pub temperature: Reading<f32>,
    /// Hectopascals
    pub pressure_hpa: Reading<f32>,
    /// Meters, derived from pressure
    pub altitude_m: Reading<f32>,
}

/// Latest environmental state
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EnvironmentalReading {
    pub aht20: HumidityDevice,
    pub bmp280: PressureDevice,
    /// Best-effort temperature over both devices
    pub average_temperature: Reading<f32>,
    pub combined: CombinedStatus,
}

impl EnvironmentalReading {
    /// Initial state from probe results
    pub fn new(humidity_available: bool, pressure_available: bool) -> Self {
        let initial = |available| {
            if available {
                DeviceStatus::Initializing
            } else {
                DeviceStatus::NotDetected
            }
        };

        Self {
            aht20: HumidityDevice {
                available: humidity_available,
                status: initial(humidity_available),
                ..HumidityDevice::default()
            },
            bmp280: PressureDevice {
                available: pressure_available,
                status: initial(pressure_available),
                ..PressureDevice::default()
            },
            average_temperature: Reading::unknown(),
            combined: if humidity_available || pressure_available {
                CombinedStatus::NoData
            } else {
                CombinedStatus::NoSensors
            },
        }
    }

    /// At least one device answered its probe
    pub fn any_available(&self) -> bool {
        self.aht20.available || self.bmp280.available
    }
}

/// Barometric altitude in meters
///
/// `44330 * (1 - (P / P0)^(1 / 5.255))`
pub fn altitude_m(pressure_hpa: f32, sea_level_hpa: f32) -> f32 {
    44330.0 * (1.0 - libm::powf(pressure_hpa / sea_level_hpa, 1.0 / 5.255))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reading_lifecycle() {
        let mut r = Reading::<f32>::unknown();
        assert_eq!(r.get(), None);
        assert!(!r.is_fresh());

        r.update(21.5);
        assert_eq!(r.get(), Some(21.5));
        assert!(r.is_fresh());

        r.mark_stale();
        assert_eq!(r.get(), Some(21.5));
        assert!(!r.is_fresh());
    }

    #[test]
    fn test_initial_status_from_probe() {
        let reading = EnvironmentalReading::new(true, false);
        assert_eq!(reading.aht20.status.as_str(), "Initializing...");
        assert_eq!(reading.bmp280.status.as_str(), "Not detected");
        assert_eq!(reading.combined, CombinedStatus::NoData);

        let none = EnvironmentalReading::new(false, false);
        assert_eq!(none.combined.as_str(), "No sensors detected");
        assert!(!none.any_available());
    }

    #[test]
    fn test_altitude_at_sea_level_is_zero() {
        assert!(altitude_m(1013.25, 1013.25).abs() < 0.01);
    }

    #[test]
    fn test_altitude_known_point() {
        // Roughly 110 m per 13 hPa near sea level
        let alt = altitude_m(1000.0, 1013.25);
        assert!((alt - 110.9).abs() < 1.0, "altitude {}", alt);
    }
}
