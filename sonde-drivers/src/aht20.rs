//! AHT20 temperature and humidity sensor (I2C)
//!
//! # Protocol
//!
//! - Init: `0xBE 0x08 0x00`, then wait for calibration to load
//! - Trigger: `0xAC 0x33 0x00`, conversion takes about 80 ms
//! - Result: 6 bytes
//!
//! ```text
//! byte 0      status (bit 7 = busy)
//! byte 1..3   humidity, 20 bits, high nibble first
//! byte 3..6   temperature, 20 bits (low nibble of byte 3 on top)
//! ```

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use sonde_core::traits::{HumidityMeasurement, HumiditySensor, ProbeError, SensorError};

/// Fixed 7-bit address
pub const ADDRESS: u8 = 0x38;

/// Calibration/init command
pub const CMD_INIT: [u8; 3] = [0xBE, 0x08, 0x00];

/// Start-measurement command
pub const CMD_TRIGGER: [u8; 3] = [0xAC, 0x33, 0x00];

/// Wait after the init command
pub const INIT_DELAY_MS: u32 = 100;

/// Conversion time after a trigger
pub const MEASUREMENT_DELAY_MS: u32 = 80;

/// Status bit set while a conversion is running
const STATUS_BUSY: u8 = 0x80;

/// Full scale of the 20-bit raw values
const FULL_SCALE: f32 = 1_048_576.0;

/// Decode a 6-byte result frame
///
/// Returns [`SensorError::Busy`] when the status byte says the conversion
/// has not finished; the data bytes are not looked at in that case.
pub fn decode_frame(frame: &[u8; 6]) -> Result<HumidityMeasurement, SensorError> {
    if frame[0] & STATUS_BUSY != 0 {
        return Err(SensorError::Busy);
    }

    let humidity_raw =
        ((frame[1] as u32) << 12) | ((frame[2] as u32) << 4) | ((frame[3] as u32) >> 4);
    let temperature_raw =
        (((frame[3] as u32) & 0x0F) << 16) | ((frame[4] as u32) << 8) | frame[5] as u32;

    Ok(HumidityMeasurement {
        temperature_c: temperature_raw as f32 / FULL_SCALE * 200.0 - 50.0,
        humidity_pct: humidity_raw as f32 / FULL_SCALE * 100.0,
    })
}

/// AHT20 driver
///
/// Owns its bus handle; pass a shared-bus device to put it next to other
/// devices on the same bus.
pub struct Aht20<I2C, D> {
    i2c: I2C,
    delay: D,
}

impl<I2C: I2c, D: DelayNs> Aht20<I2C, D> {
    /// Detect and initialize the sensor
    ///
    /// A device that does not answer its status read is reported as
    /// [`ProbeError::NotDetected`].
    pub fn probe(mut i2c: I2C, mut delay: D) -> Result<Self, ProbeError> {
        let mut status = [0u8; 1];
        if i2c.read(ADDRESS, &mut status).is_err() {
            sonde_log::info!("AHT20: not detected");
            return Err(ProbeError::NotDetected);
        }

        i2c.write(ADDRESS, &CMD_INIT).map_err(|_| ProbeError::Bus)?;
        delay.delay_ms(INIT_DELAY_MS);

        sonde_log::info!("AHT20: detected at {}", ADDRESS);
        Ok(Self { i2c, delay })
    }

    /// Trigger a conversion, wait for it and decode the result
    pub fn measure(&mut self) -> Result<HumidityMeasurement, SensorError> {
        self.i2c
            .write(ADDRESS, &CMD_TRIGGER)
            .map_err(|_| SensorError::Bus)?;

        self.delay.delay_ms(MEASUREMENT_DELAY_MS);

        let mut frame = [0u8; 6];
        self.i2c
            .read(ADDRESS, &mut frame)
            .map_err(|_| SensorError::Bus)?;

        decode_frame(&frame)
    }

    /// Give the bus and delay back
    pub fn release(self) -> (I2C, D) {
        (self.i2c, self.delay)
    }
}

impl<I2C: I2c, D: DelayNs> HumiditySensor for Aht20<I2C, D> {
    fn read_humidity(&mut self) -> Result<HumidityMeasurement, SensorError> {
        self.measure()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::i2c::{ErrorKind, ErrorType, NoAcknowledgeSource, Operation};
    use proptest::prelude::*;
    use std::collections::VecDeque;
    use std::vec::Vec;

    /// Bus fake emulating a single AHT20
    #[derive(Default)]
    struct FakeAht20 {
        present: bool,
        status: u8,
        frames: VecDeque<[u8; 6]>,
        writes: Vec<Vec<u8>>,
    }

    impl FakeAht20 {
        fn present(frames: &[[u8; 6]]) -> Self {
            Self {
                present: true,
                status: 0x18,
                frames: frames.iter().copied().collect(),
                writes: Vec::new(),
            }
        }
    }

    impl ErrorType for FakeAht20 {
        type Error = ErrorKind;
    }

    impl I2c for FakeAht20 {
        fn transaction(
            &mut self,
            address: u8,
            operations: &mut [Operation<'_>],
        ) -> Result<(), Self::Error> {
            if !self.present || address != ADDRESS {
                return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
            }

            for op in operations {
                match op {
                    Operation::Write(bytes) => self.writes.push(bytes.to_vec()),
                    Operation::Read(buf) if buf.len() == 1 => buf[0] = self.status,
                    Operation::Read(buf) => {
                        let frame = self.frames.pop_front().ok_or(ErrorKind::Other)?;
                        buf.copy_from_slice(&frame[..buf.len()]);
                    }
                }
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct CountingDelay {
        total_ns: u64,
    }

    impl DelayNs for CountingDelay {
        fn delay_ns(&mut self, ns: u32) {
            self.total_ns += ns as u64;
        }
    }

    // 50 % humidity, 25 C
    const FRAME_50_25: [u8; 6] = [0x1C, 0x80, 0x00, 0x06, 0x00, 0x00];

    #[test]
    fn test_decode_half_scale_humidity() {
        let m = decode_frame(&FRAME_50_25).unwrap();
        assert_eq!(m.humidity_pct, 50.0);
        assert_eq!(m.temperature_c, 25.0);
    }

    #[test]
    fn test_decode_busy() {
        let mut frame = FRAME_50_25;
        frame[0] |= 0x80;
        assert_eq!(decode_frame(&frame), Err(SensorError::Busy));
    }

    #[test]
    fn test_decode_extremes() {
        let low = decode_frame(&[0, 0, 0, 0, 0, 0]).unwrap();
        assert_eq!(low.humidity_pct, 0.0);
        assert_eq!(low.temperature_c, -50.0);

        let high = decode_frame(&[0, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]).unwrap();
        assert!(high.humidity_pct < 100.0 && high.humidity_pct > 99.99);
        assert!(high.temperature_c < 150.0 && high.temperature_c > 149.99);
    }

    #[test]
    fn test_probe_sends_init() {
        let mut delay = CountingDelay::default();
        let sensor = Aht20::probe(FakeAht20::present(&[]), &mut delay).unwrap();
        let (bus, _) = sensor.release();

        assert_eq!(bus.writes, [CMD_INIT.to_vec()]);
        assert_eq!(delay.total_ns, INIT_DELAY_MS as u64 * 1_000_000);
    }

    #[test]
    fn test_probe_absent() {
        let result = Aht20::probe(FakeAht20::default(), CountingDelay::default());
        assert!(matches!(result, Err(ProbeError::NotDetected)));
    }

    #[test]
    fn test_measure_waits_for_conversion() {
        let mut delay = CountingDelay::default();
        let mut sensor = Aht20::probe(FakeAht20::present(&[FRAME_50_25]), &mut delay).unwrap();
        let before = delay_total(&sensor);

        let m = sensor.read_humidity().unwrap();
        assert_eq!(m.humidity_pct, 50.0);

        assert_eq!(
            delay_total(&sensor) - before,
            MEASUREMENT_DELAY_MS as u64 * 1_000_000
        );
        let (bus, _) = sensor.release();
        assert_eq!(bus.writes.last().unwrap(), &CMD_TRIGGER.to_vec());
    }

    fn delay_total(sensor: &Aht20<FakeAht20, &mut CountingDelay>) -> u64 {
        sensor.delay.total_ns
    }

    #[test]
    fn test_measure_bus_error() {
        let mut sensor = Aht20::probe(FakeAht20::present(&[]), CountingDelay::default()).unwrap();
        // No frame queued: the read fails
        assert_eq!(sensor.read_humidity(), Err(SensorError::Bus));
    }

    proptest! {
        #[test]
        fn decoded_values_stay_in_range(frame in any::<[u8; 6]>()) {
            if let Ok(m) = decode_frame(&frame) {
                prop_assert!((0.0..=100.0).contains(&m.humidity_pct));
                prop_assert!((-50.0..=150.0).contains(&m.temperature_c));
            }
        }
    }
}
