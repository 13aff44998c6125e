//! Typed NMEA sentences
//!
//! Field indices count the tag as field 0, so in
//! `$GPGGA,123519,4807.038,N,...` the time is field 1.
//!
//! Supported formatters: RMC, GGA, GSA and GSV, from any talker.

use heapless::Vec;

use crate::checksum::{self, ChecksumPolicy};
use crate::fields::{
    parse_coordinate, parse_date, parse_f32, parse_time, parse_u8, UtcDate, UtcTime,
};
use crate::line::SENTENCE_START;

/// Maximum number of comma separated fields in one sentence
pub const MAX_FIELDS: usize = 32;

/// Maximum satellite blocks carried by one GSV sentence
pub const GSV_MAX_SATELLITES: usize = 4;

/// Why a line was not turned into a sentence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SentenceError {
    /// Line does not start with `$` or has no tag
    NotASentence,
    /// Formatter is not one of the decoded kinds
    Unsupported,
    /// Checksum required but absent
    MissingChecksum,
    /// Checksum present but wrong or malformed
    BadChecksum,
    /// Fewer fields than the kind requires
    TooFewFields,
    /// A non-empty field did not decode
    InvalidField,
}

/// Sentence kinds selected by the three-letter formatter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SentenceKind {
    /// Recommended minimum position/velocity
    Rmc,
    /// Fix quality
    Gga,
    /// DOP and active satellites
    Gsa,
    /// Satellites in view
    Gsv,
}

impl SentenceKind {
    /// Classify a tag such as `GPRMC` or `gnrmc`
    ///
    /// The first two characters are the talker id and are not checked beyond
    /// being ASCII letters.
    pub fn from_tag(tag: &str) -> Option<Self> {
        let bytes = tag.as_bytes();
        if bytes.len() != 5 || !bytes[..2].iter().all(u8::is_ascii_alphabetic) {
            return None;
        }

        let formatter = &tag[2..];
        if formatter.eq_ignore_ascii_case("RMC") {
            Some(SentenceKind::Rmc)
        } else if formatter.eq_ignore_ascii_case("GGA") {
            Some(SentenceKind::Gga)
        } else if formatter.eq_ignore_ascii_case("GSA") {
            Some(SentenceKind::Gsa)
        } else if formatter.eq_ignore_ascii_case("GSV") {
            Some(SentenceKind::Gsv)
        } else {
            None
        }
    }

    /// Minimum field count (tag included) for a frame to be decoded
    pub const fn min_fields(self) -> usize {
        match self {
            SentenceKind::Rmc => 9,
            SentenceKind::Gga => 9,
            SentenceKind::Gsa => 3,
            SentenceKind::Gsv => 4,
        }
    }
}

/// Position and velocity
///
/// A void frame (`V`) carries no further data: everything else is `None`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Rmc {
    pub active: bool,
    pub time: Option<UtcTime>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub speed_knots: Option<f32>,
    pub course_deg: Option<f32>,
    pub date: Option<UtcDate>,
}

/// Fix quality
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Gga {
    /// 0 invalid, 1 GPS, 2 DGPS, 3-5 RTK class
    pub quality: u8,
    pub satellites: Option<u8>,
    pub hdop: Option<f32>,
    pub altitude_m: Option<f32>,
}

/// Fix dimension reported by GSA
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FixMode {
    NoFix,
    TwoD,
    ThreeD,
}

impl FixMode {
    fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(FixMode::NoFix),
            2 => Some(FixMode::TwoD),
            3 => Some(FixMode::ThreeD),
            _ => None,
        }
    }
}

/// DOP and active satellites
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Gsa {
    /// `None` when the code is missing or not 1-3
    pub mode: Option<FixMode>,
    /// Non-empty satellite id slots among fields 3-14
    pub satellites_used: u8,
    pub pdop: Option<f32>,
    pub hdop: Option<f32>,
    pub vdop: Option<f32>,
}

/// One satellite block of a GSV sentence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SatelliteInfo {
    pub prn: u8,
    pub elevation_deg: Option<u8>,
    pub azimuth_deg: Option<u16>,
    pub snr_db: Option<u8>,
}

/// Satellites in view
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Gsv {
    pub total_messages: Option<u8>,
    pub message_number: Option<u8>,
    pub satellites_in_view: Option<u8>,
    pub satellites: Vec<SatelliteInfo, GSV_MAX_SATELLITES>,
}

/// A decoded sentence
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Sentence {
    Rmc(Rmc),
    Gga(Gga),
    Gsa(Gsa),
    Gsv(Gsv),
}

impl Sentence {
    /// Decode a complete line (with its leading `$`)
    ///
    /// Decoding is all or nothing: any error leaves no partial result.
    pub fn parse(line: &str, policy: ChecksumPolicy) -> Result<Self, SentenceError> {
        if line.as_bytes().first() != Some(&SENTENCE_START) {
            return Err(SentenceError::NotASentence);
        }

        let payload = checksum::verify(line, policy)?;

        let mut fields: Vec<&str, MAX_FIELDS> = Vec::new();
        for field in payload.split(',') {
            // Extra fields beyond the table are never indexed
            if fields.push(field).is_err() {
                break;
            }
        }

        let tag = fields.first().copied().unwrap_or("");
        if tag.is_empty() {
            return Err(SentenceError::NotASentence);
        }
        let kind = SentenceKind::from_tag(tag).ok_or(SentenceError::Unsupported)?;

        if fields.len() < kind.min_fields() {
            return Err(SentenceError::TooFewFields);
        }

        let fields = Fields(&fields);
        match kind {
            SentenceKind::Rmc => decode_rmc(&fields).map(Sentence::Rmc),
            SentenceKind::Gga => decode_gga(&fields).map(Sentence::Gga),
            SentenceKind::Gsa => decode_gsa(&fields).map(Sentence::Gsa),
            SentenceKind::Gsv => decode_gsv(&fields).map(Sentence::Gsv),
        }
    }

    /// Kind of this sentence
    pub fn kind(&self) -> SentenceKind {
        match self {
            Sentence::Rmc(_) => SentenceKind::Rmc,
            Sentence::Gga(_) => SentenceKind::Gga,
            Sentence::Gsa(_) => SentenceKind::Gsa,
            Sentence::Gsv(_) => SentenceKind::Gsv,
        }
    }
}

/// Indexed field access where missing trailing fields read as empty
struct Fields<'a, 'b>(&'b [&'a str]);

impl<'a, 'b> Fields<'a, 'b> {
    fn get(&self, index: usize) -> &'a str {
        self.0.get(index).copied().unwrap_or("")
    }

    fn len(&self) -> usize {
        self.0.len()
    }
}

fn decode_rmc(fields: &Fields) -> Result<Rmc, SentenceError> {
    if fields.get(2) != "A" {
        return Ok(Rmc::default());
    }

    Ok(Rmc {
        active: true,
        time: parse_time(fields.get(1))?,
        latitude: parse_coordinate(fields.get(3), fields.get(4), "S")?,
        longitude: parse_coordinate(fields.get(5), fields.get(6), "W")?,
        speed_knots: parse_f32(fields.get(7))?,
        course_deg: parse_f32(fields.get(8))?,
        date: parse_date(fields.get(9))?,
    })
}

fn decode_gga(fields: &Fields) -> Result<Gga, SentenceError> {
    Ok(Gga {
        quality: parse_u8(fields.get(6))?.unwrap_or(0),
        satellites: parse_u8(fields.get(7))?,
        hdop: parse_f32(fields.get(8))?,
        altitude_m: parse_f32(fields.get(9))?,
    })
}

fn decode_gsa(fields: &Fields) -> Result<Gsa, SentenceError> {
    let mode = parse_u8(fields.get(2))?.and_then(FixMode::from_code);

    let satellites_used = (3..15)
        .take_while(|&i| i < fields.len())
        .filter(|&i| !fields.get(i).is_empty())
        .count() as u8;

    let mut gsa = Gsa {
        mode,
        satellites_used,
        ..Gsa::default()
    };

    if fields.len() >= 17 {
        let n = fields.len();
        gsa.pdop = parse_f32(fields.get(n - 3))?;
        gsa.hdop = parse_f32(fields.get(n - 2))?;
        gsa.vdop = parse_f32(fields.get(n - 1))?;
    }

    Ok(gsa)
}

fn decode_gsv(fields: &Fields) -> Result<Gsv, SentenceError> {
    let mut gsv = Gsv {
        total_messages: parse_u8(fields.get(1))?,
        message_number: parse_u8(fields.get(2))?,
        satellites_in_view: parse_u8(fields.get(3))?,
        satellites: Vec::new(),
    };

    // Blocks of four fields starting at field 4: prn, elevation, azimuth, snr
    for block in 0..GSV_MAX_SATELLITES {
        let base = 4 + block * 4;
        let Some(prn) = parse_u8(fields.get(base))? else {
            continue;
        };
        let azimuth = fields.get(base + 2);
        let azimuth_deg = if azimuth.is_empty() {
            None
        } else {
            Some(
                azimuth
                    .parse::<u16>()
                    .map_err(|_| SentenceError::InvalidField)?,
            )
        };
        let info = SatelliteInfo {
            prn,
            elevation_deg: parse_u8(fields.get(base + 1))?,
            azimuth_deg,
            snr_db: parse_u8(fields.get(base + 3))?,
        };
        // Capacity equals the block count
        let _ = gsv.satellites.push(info);
    }

    Ok(gsv)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const RMC: &str =
        "$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6A";
    const GGA: &str =
        "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47";

    fn parse(line: &str) -> Result<Sentence, SentenceError> {
        Sentence::parse(line, ChecksumPolicy::Lenient)
    }

    #[test]
    fn test_rmc_active() {
        let Sentence::Rmc(rmc) = parse(RMC).unwrap() else {
            panic!("expected RMC");
        };
        assert!(rmc.active);
        assert_eq!(
            rmc.time,
            Some(UtcTime {
                hour: 12,
                minute: 35,
                second: 19
            })
        );
        assert!((rmc.latitude.unwrap() - 48.1173).abs() < 1e-4);
        assert!((rmc.longitude.unwrap() - 11.516_666).abs() < 1e-4);
        assert_eq!(rmc.speed_knots, Some(22.4));
        assert_eq!(rmc.course_deg, Some(84.4));
        assert_eq!(
            rmc.date,
            Some(UtcDate {
                year: 2094,
                month: 3,
                day: 23
            })
        );
    }

    #[test]
    fn test_rmc_void_carries_nothing() {
        let line = "$GPRMC,123519,V,4807.038,N,01131.000,E,022.4,084.4,230394";
        assert_eq!(parse(line), Ok(Sentence::Rmc(Rmc::default())));
    }

    #[test]
    fn test_rmc_without_date_field() {
        let line = "$GNRMC,123519,A,4807.038,S,01131.000,W,0.0,0.0";
        let Sentence::Rmc(rmc) = parse(line).unwrap() else {
            panic!("expected RMC");
        };
        assert!(rmc.latitude.unwrap() < 0.0);
        assert!(rmc.longitude.unwrap() < 0.0);
        assert_eq!(rmc.date, None);
    }

    #[test]
    fn test_gga() {
        let Sentence::Gga(gga) = parse(GGA).unwrap() else {
            panic!("expected GGA");
        };
        assert_eq!(gga.quality, 1);
        assert_eq!(gga.satellites, Some(8));
        assert_eq!(gga.hdop, Some(0.9));
        assert_eq!(gga.altitude_m, Some(545.4));
    }

    #[test]
    fn test_gga_empty_quality_is_invalid() {
        let line = "$GPGGA,,,,,,,,,";
        let Sentence::Gga(gga) = parse(line).unwrap() else {
            panic!("expected GGA");
        };
        assert_eq!(gga.quality, 0);
        assert_eq!(gga.satellites, None);
    }

    #[test]
    fn test_gsa_with_dops() {
        let line = "$GPGSA,A,3,04,05,,09,12,,,24,,,,,2.5,1.3,2.1*39";
        let Sentence::Gsa(gsa) = Sentence::parse(line, ChecksumPolicy::Ignore).unwrap() else {
            panic!("expected GSA");
        };
        assert_eq!(gsa.mode, Some(FixMode::ThreeD));
        assert_eq!(gsa.satellites_used, 5);
        assert_eq!(gsa.pdop, Some(2.5));
        assert_eq!(gsa.hdop, Some(1.3));
        assert_eq!(gsa.vdop, Some(2.1));
    }

    #[test]
    fn test_gsa_short_frame_has_no_dops() {
        let Sentence::Gsa(gsa) = parse("$GNGSA,A,2,07,11").unwrap() else {
            panic!("expected GSA");
        };
        assert_eq!(gsa.mode, Some(FixMode::TwoD));
        assert_eq!(gsa.satellites_used, 2);
        assert_eq!(gsa.pdop, None);
    }

    #[test]
    fn test_gsv_blocks() {
        let line = "$GPGSV,3,1,11,03,03,111,00,04,15,270,00,06,01,010,,13,06,292,00";
        let Sentence::Gsv(gsv) = parse(line).unwrap() else {
            panic!("expected GSV");
        };
        assert_eq!(gsv.total_messages, Some(3));
        assert_eq!(gsv.message_number, Some(1));
        assert_eq!(gsv.satellites_in_view, Some(11));
        assert_eq!(gsv.satellites.len(), 4);
        assert_eq!(gsv.satellites[2].azimuth_deg, Some(10));
        assert_eq!(gsv.satellites[2].snr_db, None);
    }

    #[test]
    fn test_talker_ids_and_case() {
        for line in ["$GNGSA,A,1", "$GLGSA,A,1", "$gpgsa,A,1", "$BDgsa,A,1"] {
            assert_eq!(parse(line).map(|s| s.kind()), Ok(SentenceKind::Gsa));
        }
    }

    #[test]
    fn test_unsupported_and_malformed() {
        assert_eq!(parse("$GPVTG,1,2,3"), Err(SentenceError::Unsupported));
        assert_eq!(parse("$GPGGA,1,2,3"), Err(SentenceError::TooFewFields));
        assert_eq!(parse("GPGGA,1,2,3"), Err(SentenceError::NotASentence));
        assert_eq!(parse("$,1,2"), Err(SentenceError::NotASentence));
        assert_eq!(
            parse("$GPGGA,123519,4807.038,N,01131.000,E,x,08,0.9,545.4"),
            Err(SentenceError::InvalidField)
        );
    }

    #[test]
    fn test_checksum_rejection_propagates() {
        let corrupted = RMC.replace("022.4", "099.9");
        assert_eq!(parse(&corrupted), Err(SentenceError::BadChecksum));
    }

    proptest! {
        #[test]
        fn parse_never_panics(line in "\\$[A-Za-z]{0,6}(,[0-9A-Za-z.]{0,10}){0,25}(\\*[0-9A-Fa-f]{0,3})?") {
            for policy in [ChecksumPolicy::Strict, ChecksumPolicy::Lenient, ChecksumPolicy::Ignore] {
                let _ = Sentence::parse(&line, policy);
            }
        }

        #[test]
        fn gsa_used_count_bounded(ids in proptest::collection::vec("[0-9]{0,2}", 0..20)) {
            let mut line = std::string::String::from("$GPGSA,A,3");
            for id in &ids {
                line.push(',');
                line.push_str(id);
            }
            if let Ok(Sentence::Gsa(gsa)) = Sentence::parse(&line, ChecksumPolicy::Ignore) {
                prop_assert!(gsa.satellites_used <= 12);
            }
        }
    }
}
