//! BMP280 barometric pressure sensor (I2C)
//!
//! The sensor runs in normal mode and converts continuously; a read is a
//! single burst of the six data registers followed by integer compensation
//! with the factory calibration block.

use embedded_hal::i2c::I2c;
use sonde_core::traits::{PressureMeasurement, PressureSensor, ProbeError, SensorError};

/// Address with SDO low
pub const ADDRESS_PRIMARY: u8 = 0x76;

/// Address with SDO high
pub const ADDRESS_SECONDARY: u8 = 0x77;

/// Value of the chip id register
pub const CHIP_ID: u8 = 0x58;

/// Register addresses
pub mod reg {
    /// Start of the calibration block (`dig_T1` LSB)
    pub const CALIB: u8 = 0x88;
    /// Chip identification
    pub const ID: u8 = 0xD0;
    /// Oversampling and power mode
    pub const CTRL_MEAS: u8 = 0xF4;
    /// Start of the data block (`press_msb`)
    pub const DATA: u8 = 0xF7;
}

/// Temperature x16, pressure x16, normal mode
pub const CTRL_MEAS_NORMAL_X16: u8 = 0xFF;

/// Size of the calibration block
pub const CALIB_LEN: usize = 24;

/// Raw value reported for a skipped conversion
const ADC_SKIPPED: i32 = 0x80000;

/// Factory calibration words
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Calibration {
    pub t1: u16,
    pub t2: i16,
    pub t3: i16,
    pub p1: u16,
    pub p2: i16,
    pub p3: i16,
    pub p4: i16,
    pub p5: i16,
    pub p6: i16,
    pub p7: i16,
    pub p8: i16,
    pub p9: i16,
}

impl Calibration {
    /// Unpack the little-endian block read from [`reg::CALIB`]
    pub fn from_bytes(b: &[u8; CALIB_LEN]) -> Self {
        let u = |i: usize| u16::from_le_bytes([b[i], b[i + 1]]);
        let s = |i: usize| i16::from_le_bytes([b[i], b[i + 1]]);

        Self {
            t1: u(0),
            t2: s(2),
            t3: s(4),
            p1: u(6),
            p2: s(8),
            p3: s(10),
            p4: s(12),
            p5: s(14),
            p6: s(16),
            p7: s(18),
            p8: s(20),
            p9: s(22),
        }
    }
}

/// Integer compensation from the datasheet
pub mod compensation {
    use super::Calibration;

    /// Largest |t_fine| accepted by [`compensate_pressure`], far outside
    /// the device's operating range
    const T_FINE_LIMIT: i32 = 1 << 20;

    /// Compensate a raw temperature
    ///
    /// Returns the temperature in hundredths of a degree Celsius and the
    /// `t_fine` value pressure compensation needs.
    pub fn compensate_temperature(adc_t: i32, cal: &Calibration) -> (i32, i32) {
        let adc_t = adc_t as i64;
        let t1 = cal.t1 as i64;
        let t2 = cal.t2 as i64;
        let t3 = cal.t3 as i64;

        let var1 = (((adc_t >> 3) - (t1 << 1)) * t2) >> 11;
        let var2 = (((((adc_t >> 4) - t1) * ((adc_t >> 4) - t1)) >> 12) * t3) >> 14;
        let t_fine = var1 + var2;

        (((t_fine * 5 + 128) >> 8) as i32, t_fine as i32)
    }

    /// Compensate a raw pressure
    ///
    /// Returns pascals in Q24.8 fixed point, or `None` when the calibration
    /// makes the division degenerate or the arithmetic overflow.
    pub fn compensate_pressure(adc_p: i32, t_fine: i32, cal: &Calibration) -> Option<u32> {
        if !(-T_FINE_LIMIT..=T_FINE_LIMIT).contains(&t_fine) {
            return None;
        }

        let mut var1 = t_fine as i64 - 128_000;
        let mut var2 = var1 * var1 * cal.p6 as i64;
        var2 += (var1 * cal.p5 as i64) << 17;
        var2 += (cal.p4 as i64) << 35;
        var1 = ((var1 * var1 * cal.p3 as i64) >> 8) + ((var1 * cal.p2 as i64) << 12);
        var1 = ((1i64 << 47) + var1).checked_mul(cal.p1 as i64)? >> 33;

        if var1 == 0 {
            return None;
        }

        let mut p = 1_048_576 - adc_p as i64;
        p = ((p << 31) - var2).checked_mul(3125)?.checked_div(var1)?;
        var1 = (cal.p9 as i64)
            .checked_mul(p >> 13)?
            .checked_mul(p >> 13)?
            >> 25;
        var2 = (cal.p8 as i64).checked_mul(p)? >> 19;
        p = (p.checked_add(var1)?.checked_add(var2)? >> 8) + ((cal.p7 as i64) << 4);

        u32::try_from(p).ok()
    }
}

/// Split the data block into 20-bit `(adc_p, adc_t)`
fn unpack_data(d: &[u8; 6]) -> (i32, i32) {
    let adc = |msb: u8, lsb: u8, xlsb: u8| {
        ((msb as i32) << 12) | ((lsb as i32) << 4) | ((xlsb as i32) >> 4)
    };
    (adc(d[0], d[1], d[2]), adc(d[3], d[4], d[5]))
}

/// Compensate one data block
pub fn convert(data: &[u8; 6], cal: &Calibration) -> Result<PressureMeasurement, SensorError> {
    let (adc_p, adc_t) = unpack_data(data);
    if adc_t == ADC_SKIPPED || adc_p == ADC_SKIPPED {
        return Err(SensorError::InvalidData);
    }

    let (centi_c, t_fine) = compensation::compensate_temperature(adc_t, cal);
    let q24_8 =
        compensation::compensate_pressure(adc_p, t_fine, cal).ok_or(SensorError::InvalidData)?;

    Ok(PressureMeasurement {
        temperature_c: centi_c as f32 / 100.0,
        pressure_hpa: q24_8 as f32 / 25_600.0,
    })
}

/// BMP280 driver
pub struct Bmp280<I2C> {
    i2c: I2C,
    address: u8,
    calibration: Calibration,
}

impl<I2C: I2c> Bmp280<I2C> {
    /// Find the sensor on either address, configure it and load calibration
    pub fn probe(mut i2c: I2C) -> Result<Self, ProbeError> {
        let mut wrong_id = None;
        let mut found = None;

        for address in [ADDRESS_PRIMARY, ADDRESS_SECONDARY] {
            let mut id = [0u8; 1];
            if i2c.write_read(address, &[reg::ID], &mut id).is_err() {
                continue;
            }
            if id[0] == CHIP_ID {
                found = Some(address);
                break;
            }
            sonde_log::warn!("BMP280: unexpected chip id {} at {}", id[0], address);
            wrong_id = Some(id[0]);
        }

        let Some(address) = found else {
            return Err(match wrong_id {
                Some(id) => ProbeError::WrongChipId(id),
                None => ProbeError::NotDetected,
            });
        };

        i2c.write(address, &[reg::CTRL_MEAS, CTRL_MEAS_NORMAL_X16])
            .map_err(|_| ProbeError::Bus)?;

        let mut block = [0u8; CALIB_LEN];
        i2c.write_read(address, &[reg::CALIB], &mut block)
            .map_err(|_| ProbeError::Bus)?;
        let calibration = Calibration::from_bytes(&block);

        sonde_log::info!("BMP280: detected at {}", address);
        Ok(Self {
            i2c,
            address,
            calibration,
        })
    }

    /// Address the sensor answered on
    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    /// Burst-read the data registers and compensate them
    pub fn measure(&mut self) -> Result<PressureMeasurement, SensorError> {
        let mut data = [0u8; 6];
        self.i2c
            .write_read(self.address, &[reg::DATA], &mut data)
            .map_err(|_| SensorError::Bus)?;

        convert(&data, &self.calibration)
    }

    /// Give the bus back
    pub fn release(self) -> I2C {
        self.i2c
    }
}

impl<I2C: I2c> PressureSensor for Bmp280<I2C> {
    fn read_pressure(&mut self) -> Result<PressureMeasurement, SensorError> {
        self.measure()
    }
}
