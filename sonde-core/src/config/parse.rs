//! Minimal TOML reader for station configuration
//!
//! Handles only the subset the station file needs. It does NOT support the
//! full TOML language.
//!
//! Supported:
//! - `key = value` pairs (string, integer, float, boolean)
//! - `[gps]`, `[environment]` and `[metrics]` section headers
//! - Comments (`# ...`), including trailing ones outside strings
//!
//! Unknown keys are ignored so newer files still load on older firmware.
//!
//! ```toml
//! [gps]
//! baud_rate = 9600
//! checksum = "strict"
//!
//! [metrics]
//! enabled = true
//! broker = "broker.lan"   # local mosquitto
//! port = 1883
//! ```

use heapless::String;
use sonde_nmea::ChecksumPolicy;

use super::types::StationConfig;

/// Parse error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    /// Unknown or malformed section header
    InvalidSection,
    /// Value of the wrong type or out of range
    InvalidValue,
    /// String longer than its field
    ValueTooLong,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Root,
    Gps,
    Environment,
    Metrics,
}

/// Parse a TOML document on top of the defaults
pub fn parse_config(input: &str) -> Result<StationConfig, ParseError> {
    let mut config = StationConfig::new();
    let mut section = Section::Root;

    for line in input.lines() {
        let line = line.trim();

        // Skip empty lines and comments
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if line.starts_with('[') {
            let header = line.split('#').next().unwrap_or(line).trim_end();
            let header = header
                .strip_prefix('[')
                .and_then(|h| h.strip_suffix(']'))
                .ok_or(ParseError::InvalidSection)?;
            section = parse_section_header(header)?;
            continue;
        }

        if let Some((key, value)) = parse_key_value(line) {
            apply_value(section, key, value, &mut config)?;
        }
    }

    Ok(config)
}

fn parse_section_header(header: &str) -> Result<Section, ParseError> {
    match header.trim() {
        "gps" => Ok(Section::Gps),
        "environment" | "env" => Ok(Section::Environment),
        "metrics" | "mqtt" => Ok(Section::Metrics),
        _ => Err(ParseError::InvalidSection),
    }
}

/// Parse "key = value" line
fn parse_key_value(line: &str) -> Option<(&str, &str)> {
    let eq_pos = line.find('=')?;
    let key = line[..eq_pos].trim();
    let value = line[eq_pos + 1..].trim();

    // Remove inline comments, a # inside a string is kept
    let mut in_string = false;
    let mut end = value.len();
    for (i, c) in value.char_indices() {
        match c {
            '"' => in_string = !in_string,
            '#' if !in_string => {
                end = i;
                break;
            }
            _ => {}
        }
    }
    let value = value[..end].trim();

    if key.is_empty() || value.is_empty() {
        return None;
    }

    Some((key, value))
}

/// Parse a string value (removes quotes)
fn parse_string(value: &str) -> &str {
    if value.starts_with('"') && value.ends_with('"') && value.len() >= 2 {
        &value[1..value.len() - 1]
    } else {
        // Allow unquoted strings for simple values
        value
    }
}

fn parse_fixed<const N: usize>(value: &str) -> Result<String<N>, ParseError> {
    String::try_from(parse_string(value)).map_err(|_| ParseError::ValueTooLong)
}

/// Parse an integer or float value
fn parse_number<T: core::str::FromStr>(value: &str) -> Result<T, ParseError> {
    value.parse().map_err(|_| ParseError::InvalidValue)
}

fn parse_bool(value: &str) -> Result<bool, ParseError> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ParseError::InvalidValue),
    }
}

fn parse_checksum(value: &str) -> Result<ChecksumPolicy, ParseError> {
    match parse_string(value) {
        "strict" => Ok(ChecksumPolicy::Strict),
        "lenient" => Ok(ChecksumPolicy::Lenient),
        "ignore" => Ok(ChecksumPolicy::Ignore),
        _ => Err(ParseError::InvalidValue),
    }
}

fn apply_value(
    section: Section,
    key: &str,
    value: &str,
    config: &mut StationConfig,
) -> Result<(), ParseError> {
    match section {
        Section::Gps => {
            let g = &mut config.gps;
            match key {
                "enabled" => g.enabled = parse_bool(value)?,
                "baud" | "baud_rate" => g.baud_rate = parse_number(value)?,
                "checksum" => g.checksum = parse_checksum(value)?,
                _ => {}
            }
        }
        Section::Environment => {
            let e = &mut config.environment;
            match key {
                "enabled" => e.enabled = parse_bool(value)?,
                "poll_interval_ms" => e.poll_interval_ms = parse_number(value)?,
                "sea_level_hpa" => {
                    let hpa: f32 = parse_number(value)?;
                    if hpa.is_nan() || hpa <= 0.0 {
                        return Err(ParseError::InvalidValue);
                    }
                    e.sea_level_hpa = hpa;
                }
                _ => {}
            }
        }
        Section::Metrics => {
            let m = &mut config.metrics;
            match key {
                "enabled" => m.enabled = parse_bool(value)?,
                "broker" | "server" => m.broker = parse_fixed(value)?,
                "port" => m.port = parse_number(value)?,
                "username" | "user" => m.username = parse_fixed(value)?,
                "password" => m.password = parse_fixed(value)?,
                "topic_prefix" | "prefix" => m.topic_prefix = parse_fixed(value)?,
                "hostname" => m.hostname = parse_fixed(value)?,
                "keep_alive_s" => m.keep_alive_s = parse_number(value)?,
                _ => {}
            }
        }
        Section::Root => {
            // No root-level keys
        }
    }

    Ok(())
}
