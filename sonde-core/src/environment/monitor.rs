//! Dual-sensor acquisition and fusion

use core::fmt;

use embedded_hal::delay::DelayNs;

use super::reading::{altitude_m, CombinedStatus, DeviceStatus, EnvironmentalReading};
use crate::traits::{HumiditySensor, PressureSensor};

/// Default sea-level reference pressure
pub const DEFAULT_SEA_LEVEL_HPA: f32 = 1013.25;

/// Polls attempted by the self-test before giving up
pub const SELF_TEST_ATTEMPTS: u32 = 5;

/// Pause between self-test polls
pub const SELF_TEST_INTERVAL_MS: u32 = 100;

/// Verdict of the environmental self-test
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EnvTestOutcome {
    Passed,
    ReadFailed,
    NoSensors,
}

impl EnvTestOutcome {
    pub fn passed(&self) -> bool {
        matches!(self, EnvTestOutcome::Passed)
    }
}

impl fmt::Display for EnvTestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EnvTestOutcome::Passed => "OK",
            EnvTestOutcome::ReadFailed => "Error reading data",
            EnvTestOutcome::NoSensors => "No sensors detected",
        })
    }
}

/// Owns the probed devices and the fused reading
///
/// Devices are `None` when they did not answer their probe and are never
/// touched again.
pub struct EnvironmentMonitor<H, P> {
    humidity: Option<H>,
    pressure: Option<P>,
    reading: EnvironmentalReading,
    sea_level_hpa: f32,
}

impl<H: HumiditySensor, P: PressureSensor> EnvironmentMonitor<H, P> {
    /// Create a monitor from probe results
    pub fn new(humidity: Option<H>, pressure: Option<P>, sea_level_hpa: f32) -> Self {
        let reading = EnvironmentalReading::new(humidity.is_some(), pressure.is_some());
        sonde_log::info!(
            "environment: humidity sensor {}, pressure sensor {}",
            reading.aht20.status.as_str(),
            reading.bmp280.status.as_str()
        );
        Self {
            humidity,
            pressure,
            reading,
            sea_level_hpa,
        }
    }

    /// Read every present device once and fuse the results
    pub fn poll(&mut self) -> CombinedStatus {
        let humidity_ok = self.poll_humidity();
        let pressure_ok = self.poll_pressure();
        let reading = &mut self.reading;

        let fused = match (humidity_ok, pressure_ok) {
            (true, true) => reading
                .aht20
                .temperature
                .get()
                .zip(reading.bmp280.temperature.get())
                .map(|(a, b)| (a + b) / 2.0),
            (true, false) => reading.aht20.temperature.get(),
            (false, true) => reading.bmp280.temperature.get(),
            (false, false) => None,
        };

        match fused {
            Some(t) => reading.average_temperature.update(t),
            None => reading.average_temperature.mark_stale(),
        }

        if pressure_ok {
            self.update_altitude();
        }

        self.reading.combined = match (humidity_ok, pressure_ok) {
            (true, true) => CombinedStatus::BothOk,
            (true, false) => CombinedStatus::HumidityOnly,
            (false, true) => CombinedStatus::PressureOnly,
            (false, false) if self.reading.any_available() => CombinedStatus::NoData,
            (false, false) => CombinedStatus::NoSensors,
        };

        self.reading.combined
    }

    fn poll_humidity(&mut self) -> bool {
        let Some(sensor) = self.humidity.as_mut() else {
            return false;
        };
        let device = &mut self.reading.aht20;

        match sensor.read_humidity() {
            Ok(m) => {
                device.temperature.update(m.temperature_c);
                device.humidity.update(m.humidity_pct);
                device.status = DeviceStatus::Ok;
                true
            }
            Err(e) => {
                sonde_log::warn!("humidity sensor read failed: {:?}", e);
                device.temperature.mark_stale();
                device.humidity.mark_stale();
                device.status = DeviceStatus::ReadError;
                false
            }
        }
    }

    fn poll_pressure(&mut self) -> bool {
        let Some(sensor) = self.pressure.as_mut() else {
            return false;
        };
        let device = &mut self.reading.bmp280;

        match sensor.read_pressure() {
            Ok(m) => {
                device.temperature.update(m.temperature_c);
                device.pressure_hpa.update(m.pressure_hpa);
                device.status = DeviceStatus::Ok;
                true
            }
            Err(e) => {
                sonde_log::warn!("pressure sensor read failed: {:?}", e);
                device.temperature.mark_stale();
                device.pressure_hpa.mark_stale();
                device.altitude_m.mark_stale();
                device.status = DeviceStatus::ReadError;
                false
            }
        }
    }

    fn update_altitude(&mut self) {
        let device = &mut self.reading.bmp280;
        match device.pressure_hpa.get() {
            Some(p) if p > 0.0 => device.altitude_m.update(altitude_m(p, self.sea_level_hpa)),
            _ => device.altitude_m.mark_stale(),
        }
    }

    /// Poll until a fresh fused temperature appears
    ///
    /// Up to [`SELF_TEST_ATTEMPTS`] polls, [`SELF_TEST_INTERVAL_MS`] apart.
    pub fn self_test<D: DelayNs>(&mut self, delay: &mut D) -> EnvTestOutcome {
        if !self.reading.any_available() {
            return EnvTestOutcome::NoSensors;
        }

        for attempt in 0..SELF_TEST_ATTEMPTS {
            if attempt > 0 {
                delay.delay_ms(SELF_TEST_INTERVAL_MS);
            }
            self.poll();
            if self.reading.average_temperature.is_fresh() {
                return EnvTestOutcome::Passed;
            }
        }

        EnvTestOutcome::ReadFailed
    }

    /// Latest fused reading
    pub fn reading(&self) -> &EnvironmentalReading {
        &self.reading
    }

    /// Sea-level reference used for altitude
    pub fn sea_level_hpa(&self) -> f32 {
        self.sea_level_hpa
    }

    /// Change the sea-level reference; applies from the next fresh pressure
    pub fn set_sea_level_hpa(&mut self, hpa: f32) {
        self.sea_level_hpa = hpa;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::traits::{HumidityMeasurement, PressureMeasurement, SensorError};
    use std::collections::VecDeque;
    use std::string::ToString;

    /// Humidity sensor fake replaying scripted results
    pub(crate) struct FakeHumidity(pub VecDeque<Result<HumidityMeasurement, SensorError>>);

    impl HumiditySensor for FakeHumidity {
        fn read_humidity(&mut self) -> Result<HumidityMeasurement, SensorError> {
            self.0.pop_front().unwrap_or(Err(SensorError::Bus))
        }
    }

    /// Pressure sensor fake replaying scripted results
    pub(crate) struct FakePressure(pub VecDeque<Result<PressureMeasurement, SensorError>>);

    impl PressureSensor for FakePressure {
        fn read_pressure(&mut self) -> Result<PressureMeasurement, SensorError> {
            self.0.pop_front().unwrap_or(Err(SensorError::Bus))
        }
    }

    /// Delay fake that only accumulates requested time
    #[derive(Default)]
    pub(crate) struct CountingDelay {
        pub total_ns: u64,
    }

    impl DelayNs for CountingDelay {
        fn delay_ns(&mut self, ns: u32) {
            self.total_ns += ns as u64;
        }
    }

    pub(crate) fn humidity(t: f32, h: f32) -> Result<HumidityMeasurement, SensorError> {
        Ok(HumidityMeasurement {
            temperature_c: t,
            humidity_pct: h,
        })
    }

    pub(crate) fn pressure(t: f32, p: f32) -> Result<PressureMeasurement, SensorError> {
        Ok(PressureMeasurement {
            temperature_c: t,
            pressure_hpa: p,
        })
    }

    type Monitor = EnvironmentMonitor<FakeHumidity, FakePressure>;

    fn monitor(
        h: Option<std::vec::Vec<Result<HumidityMeasurement, SensorError>>>,
        p: Option<std::vec::Vec<Result<PressureMeasurement, SensorError>>>,
    ) -> Monitor {
        EnvironmentMonitor::new(
            h.map(|v| FakeHumidity(v.into())),
            p.map(|v| FakePressure(v.into())),
            DEFAULT_SEA_LEVEL_HPA,
        )
    }

    #[test]
    fn test_both_fresh_averages() {
        let mut m = monitor(
            Some(std::vec![humidity(20.0, 45.0)]),
            Some(std::vec![pressure(22.0, 1000.0)]),
        );
        assert_eq!(m.poll(), CombinedStatus::BothOk);

        let r = m.reading();
        assert_eq!(r.combined.as_str(), "Both sensors OK");
        assert_eq!(r.average_temperature.get(), Some(21.0));
        assert!(r.average_temperature.is_fresh());
        assert!(r.bmp280.altitude_m.is_fresh());
        assert_eq!(r.aht20.humidity.get(), Some(45.0));
    }

    #[test]
    fn test_only_pressure_fresh() {
        let mut m = monitor(
            Some(std::vec![Err(SensorError::Busy)]),
            Some(std::vec![pressure(18.5, 1000.0)]),
        );
        assert_eq!(m.poll(), CombinedStatus::PressureOnly);

        let r = m.reading();
        assert_eq!(r.combined.as_str(), "BMP280 OK");
        assert_eq!(r.average_temperature.get(), Some(18.5));
        assert_eq!(r.aht20.status.as_str(), "Read error");
        let altitude = r.bmp280.altitude_m.get().unwrap();
        assert!((altitude - 110.9).abs() < 1.0);
    }

    #[test]
    fn test_only_humidity_fresh() {
        let mut m = monitor(Some(std::vec![humidity(24.0, 50.0)]), None);
        assert_eq!(m.poll(), CombinedStatus::HumidityOnly);
        assert_eq!(m.reading().combined.as_str(), "AHT20 OK");
        assert_eq!(m.reading().average_temperature.get(), Some(24.0));
        assert_eq!(m.reading().bmp280.status, DeviceStatus::NotDetected);
        assert_eq!(m.reading().bmp280.altitude_m.get(), None);
    }

    #[test]
    fn test_failed_poll_keeps_stale_values() {
        let mut m = monitor(
            Some(std::vec![humidity(20.0, 40.0), Err(SensorError::Busy)]),
            Some(std::vec![pressure(22.0, 1005.0), Err(SensorError::Bus)]),
        );
        m.poll();
        let first = *m.reading();

        assert_eq!(m.poll(), CombinedStatus::NoData);
        let r = m.reading();
        assert_eq!(r.combined.as_str(), "No data available");
        assert_eq!(r.average_temperature.get(), first.average_temperature.get());
        assert!(!r.average_temperature.is_fresh());
        assert_eq!(r.aht20.humidity.get(), Some(40.0));
        assert_eq!(r.bmp280.pressure_hpa.get(), Some(1005.0));
        assert_eq!(r.bmp280.altitude_m.get(), first.bmp280.altitude_m.get());
        assert_eq!(r.bmp280.status, DeviceStatus::ReadError);
    }

    #[test]
    fn test_self_test_without_sensors() {
        let mut m = monitor(None, None);
        let mut delay = CountingDelay::default();
        assert_eq!(m.self_test(&mut delay), EnvTestOutcome::NoSensors);
        assert_eq!(delay.total_ns, 0);
        assert_eq!(EnvTestOutcome::NoSensors.to_string(), "No sensors detected");
    }

    #[test]
    fn test_self_test_retries_then_passes() {
        let mut m = monitor(
            Some(std::vec![
                Err(SensorError::Busy),
                Err(SensorError::Busy),
                humidity(21.0, 30.0)
            ]),
            None,
        );
        let mut delay = CountingDelay::default();
        assert_eq!(m.self_test(&mut delay), EnvTestOutcome::Passed);
        assert_eq!(delay.total_ns, 2 * 100_000_000);
    }

    #[test]
    fn test_self_test_gives_up_after_five_polls() {
        let mut m = monitor(None, Some(std::vec::Vec::new()));
        let mut delay = CountingDelay::default();
        let outcome = m.self_test(&mut delay);
        assert_eq!(outcome, EnvTestOutcome::ReadFailed);
        assert_eq!(outcome.to_string(), "Error reading data");
        assert_eq!(delay.total_ns, 4 * 100_000_000);
    }
}
