//! Position/fix state
//!
//! `PositionFix` is created once and then patched by every decoded sentence.
//! Each sentence kind owns a different subset of the fields; nothing ever
//! resets the whole struct.

use sonde_nmea::{FixMode, Gga, Gsa, Rmc, Sentence, UtcDate, UtcTime};

/// Dilution of precision before any receiver reported one
pub const DOP_UNKNOWN: f32 = 999.0;

/// Fix dimension from the DOP sentence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FixType {
    /// No DOP sentence seen yet
    #[default]
    Unknown,
    NoFix,
    TwoD,
    ThreeD,
}

impl FixType {
    /// Display text
    pub const fn as_str(&self) -> &'static str {
        match self {
            FixType::Unknown => "",
            FixType::NoFix => "No Fix",
            FixType::TwoD => "2D",
            FixType::ThreeD => "3D",
        }
    }
}

impl From<FixMode> for FixType {
    fn from(mode: FixMode) -> Self {
        match mode {
            FixMode::NoFix => FixType::NoFix,
            FixMode::TwoD => FixType::TwoD,
            FixMode::ThreeD => FixType::ThreeD,
        }
    }
}

/// Human readable fix status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FixStatus {
    #[default]
    NoFix,
    /// Active RMC, or a GGA quality outside the known classes
    Fix,
    /// GGA quality 0
    Invalid,
    /// GGA quality 1
    GpsFix,
    /// GGA quality 2
    DgpsFix,
    /// GGA quality 3 to 5
    RtkFix,
}

impl FixStatus {
    /// Map a GGA quality indicator
    pub const fn from_quality(quality: u8) -> Self {
        match quality {
            0 => FixStatus::Invalid,
            1 => FixStatus::GpsFix,
            2 => FixStatus::DgpsFix,
            3..=5 => FixStatus::RtkFix,
            _ => FixStatus::Fix,
        }
    }

    /// Display text
    pub const fn as_str(&self) -> &'static str {
        match self {
            FixStatus::NoFix => "No Fix",
            FixStatus::Fix => "Fix",
            FixStatus::Invalid => "Invalid",
            FixStatus::GpsFix => "GPS Fix",
            FixStatus::DgpsFix => "DGPS Fix",
            FixStatus::RtkFix => "RTK Fix",
        }
    }
}

/// Latest known GPS solution
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PositionFix {
    /// Last RMC status was active
    pub valid: bool,
    /// A current position solution exists
    pub has_fix: bool,
    pub has_time: bool,
    pub has_date: bool,
    /// A PPS edge was observed
    pub has_pps: bool,
    pub fix_type: FixType,
    /// Last GGA quality indicator
    pub fix_quality: u8,
    pub status: FixStatus,
    /// Decimal degrees, south negative
    pub latitude: f64,
    /// Decimal degrees, west negative
    pub longitude: f64,
    /// Meters above mean sea level
    pub altitude_m: f32,
    pub speed_knots: f32,
    pub course_deg: f32,
    pub hdop: f32,
    pub vdop: f32,
    pub pdop: f32,
    pub satellites_visible: u8,
    pub satellites_used: u8,
    pub time: UtcTime,
    pub date: UtcDate,
}

impl Default for PositionFix {
    fn default() -> Self {
        Self::new()
    }
}

impl PositionFix {
    /// Startup state: no fix, unknown DOPs
    pub const fn new() -> Self {
        Self {
            valid: false,
            has_fix: false,
            has_time: false,
            has_date: false,
            has_pps: false,
            fix_type: FixType::Unknown,
            fix_quality: 0,
            status: FixStatus::NoFix,
            latitude: 0.0,
            longitude: 0.0,
            altitude_m: 0.0,
            speed_knots: 0.0,
            course_deg: 0.0,
            hdop: DOP_UNKNOWN,
            vdop: DOP_UNKNOWN,
            pdop: DOP_UNKNOWN,
            satellites_visible: 0,
            satellites_used: 0,
            time: UtcTime {
                hour: 0,
                minute: 0,
                second: 0,
            },
            date: UtcDate {
                year: 0,
                month: 0,
                day: 0,
            },
        }
    }

    /// Apply a decoded sentence
    pub fn apply(&mut self, sentence: &Sentence) {
        match sentence {
            Sentence::Rmc(rmc) => self.apply_rmc(rmc),
            Sentence::Gga(gga) => self.apply_gga(gga),
            Sentence::Gsa(gsa) => self.apply_gsa(gsa),
            // Satellites-in-view data is decoded but not tracked
            Sentence::Gsv(_) => {}
        }
    }

    fn apply_rmc(&mut self, rmc: &Rmc) {
        self.valid = rmc.active;

        if !rmc.active {
            // Position fields keep their last values; has_fix marks them stale
            self.has_fix = false;
            self.status = FixStatus::NoFix;
            return;
        }

        self.has_fix = true;
        self.status = FixStatus::Fix;

        if let Some(time) = rmc.time {
            self.time = time;
            self.has_time = true;
        }
        if let Some(latitude) = rmc.latitude {
            self.latitude = latitude;
        }
        if let Some(longitude) = rmc.longitude {
            self.longitude = longitude;
        }
        if let Some(speed) = rmc.speed_knots {
            self.speed_knots = speed;
        }
        if let Some(course) = rmc.course_deg {
            self.course_deg = course;
        }
        if let Some(date) = rmc.date {
            self.date = date;
            self.has_date = true;
        }
    }

    fn apply_gga(&mut self, gga: &Gga) {
        self.fix_quality = gga.quality;
        self.has_fix = gga.quality > 0;

        if let Some(satellites) = gga.satellites {
            self.satellites_visible = satellites;
        }
        if let Some(hdop) = gga.hdop {
            self.hdop = hdop;
        }
        if let Some(altitude) = gga.altitude_m {
            self.altitude_m = altitude;
        }

        self.status = FixStatus::from_quality(gga.quality);
    }

    fn apply_gsa(&mut self, gsa: &Gsa) {
        if let Some(mode) = gsa.mode {
            self.fix_type = mode.into();
        }
        self.satellites_used = gsa.satellites_used;

        if let Some(pdop) = gsa.pdop {
            self.pdop = pdop;
        }
        if let Some(hdop) = gsa.hdop {
            self.hdop = hdop;
        }
        if let Some(vdop) = gsa.vdop {
            self.vdop = vdop;
        }
    }
}
