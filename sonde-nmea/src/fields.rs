//! Field-level decoding helpers
//!
//! Empty fields are "not supplied" and decode to `None`. A non-empty field
//! that does not decode makes the whole sentence invalid.

use crate::sentence::SentenceError;

/// UTC time of day from a `HHMMSS[.ss]` field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UtcTime {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

/// UTC calendar date from a `DDMMYY` field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UtcDate {
    pub year: u16,
    pub month: u8,
    pub day: u8,
}

/// Two ASCII digits to a number
fn two_digits(bytes: &[u8]) -> Result<u8, SentenceError> {
    match bytes {
        [hi @ b'0'..=b'9', lo @ b'0'..=b'9'] => Ok((hi - b'0') * 10 + (lo - b'0')),
        _ => Err(SentenceError::InvalidField),
    }
}

/// Decode a `HHMMSS[.ss]` time field
///
/// Fields shorter than six characters are treated as not supplied.
pub fn parse_time(field: &str) -> Result<Option<UtcTime>, SentenceError> {
    let bytes = field.as_bytes();
    if bytes.len() < 6 {
        return Ok(None);
    }
    Ok(Some(UtcTime {
        hour: two_digits(&bytes[0..2])?,
        minute: two_digits(&bytes[2..4])?,
        second: two_digits(&bytes[4..6])?,
    }))
}

/// Decode a `DDMMYY` date field; years are offset by 2000
pub fn parse_date(field: &str) -> Result<Option<UtcDate>, SentenceError> {
    let bytes = field.as_bytes();
    if bytes.len() < 6 {
        return Ok(None);
    }
    Ok(Some(UtcDate {
        day: two_digits(&bytes[0..2])?,
        month: two_digits(&bytes[2..4])?,
        year: 2000 + two_digits(&bytes[4..6])? as u16,
    }))
}

/// Decode an optional decimal field
pub fn parse_f32(field: &str) -> Result<Option<f32>, SentenceError> {
    if field.is_empty() {
        return Ok(None);
    }
    field
        .parse::<f32>()
        .map(Some)
        .map_err(|_| SentenceError::InvalidField)
}

/// Decode an optional unsigned integer field
pub fn parse_u8(field: &str) -> Result<Option<u8>, SentenceError> {
    if field.is_empty() {
        return Ok(None);
    }
    field
        .parse::<u8>()
        .map(Some)
        .map_err(|_| SentenceError::InvalidField)
}

/// Convert packed `DDDMM.MMMM` degrees to decimal degrees
///
/// `degrees = trunc(v / 100) + (v - trunc(v / 100) * 100) / 60`
pub fn packed_to_degrees(packed: f64) -> f64 {
    let whole = (packed / 100.0) as i32 as f64;
    whole + (packed - whole * 100.0) / 60.0
}

/// Decode a packed coordinate and its hemisphere field
///
/// `negative` is the hemisphere letter that flips the sign (`S` or `W`).
pub fn parse_coordinate(
    value: &str,
    hemisphere: &str,
    negative: &str,
) -> Result<Option<f64>, SentenceError> {
    if value.is_empty() {
        return Ok(None);
    }
    let packed = value
        .parse::<f64>()
        .map_err(|_| SentenceError::InvalidField)?;
    let degrees = packed_to_degrees(packed);
    if hemisphere == negative {
        Ok(Some(-degrees))
    } else {
        Ok(Some(degrees))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn test_packed_latitude() {
        let north = parse_coordinate("4807.038", "N", "S").unwrap().unwrap();
        let south = parse_coordinate("4807.038", "S", "S").unwrap().unwrap();
        assert!(close(north, 48.1173));
        assert!(close(south, -48.1173));
    }

    #[test]
    fn test_packed_longitude() {
        let east = parse_coordinate("01131.000", "E", "W").unwrap().unwrap();
        let west = parse_coordinate("01131.000", "W", "W").unwrap().unwrap();
        assert!(close(east, 11.516_666));
        assert!(close(west, -11.516_666));
    }

    #[test]
    fn test_empty_coordinate_not_supplied() {
        assert_eq!(parse_coordinate("", "N", "S"), Ok(None));
    }

    #[test]
    fn test_garbage_coordinate_rejected() {
        assert_eq!(
            parse_coordinate("48x7.0", "N", "S"),
            Err(SentenceError::InvalidField)
        );
    }

    #[test]
    fn test_time_with_fraction() {
        let time = parse_time("092750.000").unwrap().unwrap();
        assert_eq!(
            time,
            UtcTime {
                hour: 9,
                minute: 27,
                second: 50
            }
        );
    }

    #[test]
    fn test_short_time_not_supplied() {
        assert_eq!(parse_time("0927"), Ok(None));
    }

    #[test]
    fn test_date_year_offset() {
        let date = parse_date("230394").unwrap().unwrap();
        assert_eq!(
            date,
            UtcDate {
                year: 2094,
                month: 3,
                day: 23
            }
        );
    }

    #[test]
    fn test_numeric_fields() {
        assert_eq!(parse_f32("022.4"), Ok(Some(22.4)));
        assert_eq!(parse_f32(""), Ok(None));
        assert_eq!(parse_u8("08"), Ok(Some(8)));
        assert_eq!(parse_u8("x"), Err(SentenceError::InvalidField));
    }
}
