//! Binary configuration persistence
//!
//! Postcard encoding for storing the configuration in flash. The board glue
//! owns the storage; this module only turns bytes into a checked config.

use super::types::{StationConfig, CONFIG_VERSION};

/// Largest encoded configuration
pub const MAX_CONFIG_SIZE: usize = 512;

/// Configuration persistence errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Output buffer too small
    Serialize,
    /// Deserialization failed
    Deserialize,
    /// Config version mismatch
    VersionMismatch,
}

/// Encode into `buf`, returning the used part
pub fn to_bytes<'b>(config: &StationConfig, buf: &'b mut [u8]) -> Result<&'b mut [u8], ConfigError> {
    postcard::to_slice(config, buf).map_err(|_| ConfigError::Serialize)
}

/// Decode and check the layout version
pub fn from_bytes(bytes: &[u8]) -> Result<StationConfig, ConfigError> {
    let config: StationConfig = postcard::from_bytes(bytes).map_err(|_| ConfigError::Deserialize)?;

    if config.version != CONFIG_VERSION {
        sonde_log::warn!(
            "Config version mismatch: found {}, expected {}",
            config.version,
            CONFIG_VERSION
        );
        return Err(ConfigError::VersionMismatch);
    }

    log_config_summary(&config);
    Ok(config)
}

fn log_config_summary(config: &StationConfig) {
    sonde_log::info!("Configuration loaded");
    sonde_log::debug!(
        "  gps: {} @ {} baud",
        config.gps.enabled,
        config.gps.baud_rate
    );
    sonde_log::debug!(
        "  environment: {} every {} ms",
        config.environment.enabled,
        config.environment.poll_interval_ms
    );
    sonde_log::debug!(
        "  metrics: {} -> {}:{}",
        config.metrics.enabled,
        config.metrics.broker.as_str(),
        config.metrics.port
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::truncated;
    use sonde_nmea::ChecksumPolicy;

    #[test]
    fn test_store_and_load() {
        let mut config = StationConfig::new();
        config.gps.checksum = ChecksumPolicy::Strict;
        config.metrics.enabled = true;
        config.metrics.broker = truncated("10.1.2.3");
        config.environment.sea_level_hpa = 1009.0;

        let mut buf = [0u8; MAX_CONFIG_SIZE];
        let used = to_bytes(&config, &mut buf).unwrap().len();
        assert_eq!(from_bytes(&buf[..used]).unwrap(), config);
    }

    #[test]
    fn test_version_mismatch() {
        let mut config = StationConfig::new();
        config.version = 2;

        let mut buf = [0u8; MAX_CONFIG_SIZE];
        let used = to_bytes(&config, &mut buf).unwrap().len();
        assert_eq!(from_bytes(&buf[..used]), Err(ConfigError::VersionMismatch));
    }

    #[test]
    fn test_garbage_rejected() {
        assert_eq!(from_bytes(&[]), Err(ConfigError::Deserialize));
    }

    #[test]
    fn test_buffer_too_small() {
        let mut buf = [0u8; 4];
        assert_eq!(
            to_bytes(&StationConfig::new(), &mut buf).map(|b| b.len()),
            Err(ConfigError::Serialize)
        );
    }
}
