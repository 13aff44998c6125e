//! NMEA checksum handling
//!
//! The checksum is the XOR of every byte between `$` and `*`, written as two
//! hexadecimal digits after the `*`.

use crate::sentence::SentenceError;

/// How strictly the trailing `*HH` checksum is enforced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ChecksumPolicy {
    /// Checksum must be present and correct
    Strict,
    /// Checksum must be correct when present; frames without one are accepted
    #[default]
    Lenient,
    /// Checksum is never looked at
    Ignore,
}

/// XOR of all bytes
pub fn compute(data: &[u8]) -> u8 {
    data.iter().fold(0, |acc, &b| acc ^ b)
}

/// Split a line into its payload (between `$` and `*`) and checksum digits
///
/// The line must already start with `$`.
pub fn split(line: &str) -> (&str, Option<&str>) {
    let body = &line[1..];
    match body.find('*') {
        Some(star) => (&body[..star], Some(&body[star + 1..])),
        None => (body, None),
    }
}

/// Parse two hexadecimal checksum digits
fn parse_hex(digits: &str) -> Option<u8> {
    if digits.len() != 2 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u8::from_str_radix(digits, 16).ok()
}

/// Verify a line against `policy` and return its payload
pub fn verify(line: &str, policy: ChecksumPolicy) -> Result<&str, SentenceError> {
    let (payload, digits) = split(line);

    match (policy, digits) {
        (ChecksumPolicy::Ignore, _) => Ok(payload),
        (ChecksumPolicy::Strict, None) => Err(SentenceError::MissingChecksum),
        (ChecksumPolicy::Lenient, None) => Ok(payload),
        (_, Some(digits)) => {
            let expected = parse_hex(digits).ok_or(SentenceError::BadChecksum)?;
            if compute(payload.as_bytes()) != expected {
                return Err(SentenceError::BadChecksum);
            }
            Ok(payload)
        }
    }
}
