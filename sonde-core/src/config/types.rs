//! Configuration type definitions
//!
//! These types represent the station configuration. It can be written as a
//! small TOML file or stored as postcard-serialized binary data.

use heapless::String;
use sonde_nmea::ChecksumPolicy;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Current binary layout version
pub const CONFIG_VERSION: u8 = 1;

/// Maximum broker host name length
pub const MAX_HOST_LEN: usize = 64;

/// Maximum user name, password and device name length
pub const MAX_CREDENTIAL_LEN: usize = 32;

/// Maximum topic prefix length
pub const MAX_PREFIX_LEN: usize = 48;

/// Copy `text` into a fixed string, dropping whatever does not fit
pub fn truncated<const N: usize>(text: &str) -> String<N> {
    let mut out = String::new();
    for c in text.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}

/// GPS receiver configuration
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GpsConfig {
    /// Feed the receiver from the UART
    pub enabled: bool,
    /// UART baud rate, applied by the board glue
    pub baud_rate: u32,
    /// How trailing checksums are enforced
    pub checksum: ChecksumPolicy,
}

impl Default for GpsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            baud_rate: 9600,
            checksum: ChecksumPolicy::Lenient,
        }
    }
}

/// Environmental sensor configuration
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EnvironmentConfig {
    /// Poll the sensors while acquisition runs
    pub enabled: bool,
    /// Minimum spacing between polls
    pub poll_interval_ms: u32,
    /// Reference pressure for altitude, hPa
    pub sea_level_hpa: f32,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_ms: 2_000,
            sea_level_hpa: crate::environment::DEFAULT_SEA_LEVEL_HPA,
        }
    }
}

/// Metrics bridge configuration
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MetricsConfig {
    /// Bridge starts enabled
    pub enabled: bool,
    pub broker: String<MAX_HOST_LEN>,
    pub port: u16,
    /// Empty means anonymous
    pub username: String<MAX_CREDENTIAL_LEN>,
    pub password: String<MAX_CREDENTIAL_LEN>,
    /// Prepended to every topic
    pub topic_prefix: String<MAX_PREFIX_LEN>,
    /// Device name, also used as the client id
    pub hostname: String<MAX_CREDENTIAL_LEN>,
    pub keep_alive_s: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            broker: truncated("mqtt.example.com"),
            port: 1883,
            username: String::new(),
            password: String::new(),
            topic_prefix: truncated("esp32-diagnostic"),
            hostname: truncated("esp32-diagnostic"),
            keep_alive_s: 15,
        }
    }
}

/// Complete station configuration
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StationConfig {
    /// Config format version
    pub version: u8,
    pub gps: GpsConfig,
    pub environment: EnvironmentConfig,
    pub metrics: MetricsConfig,
}

impl StationConfig {
    /// Create a configuration with defaults
    pub fn new() -> Self {
        Self {
            version: CONFIG_VERSION,
            gps: GpsConfig::default(),
            environment: EnvironmentConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for StationConfig {
    fn default() -> Self {
        Self::new()
    }
}
