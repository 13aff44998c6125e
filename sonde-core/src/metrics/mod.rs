//! Outbound metrics bridge
//!
//! A connection state machine with backoff that periodically pushes the
//! latest telemetry to an MQTT-style broker, one message per value.
//!
//! ```text
//! <prefix>/system/uptime_seconds
//! <prefix>/memory/{heap_free,heap_total,heap_percent,psram_*}
//! <prefix>/network/{wifi_rssi,wifi_channel}
//! <prefix>/sensors/env/{temperature,humidity,pressure_hpa,altitude_m}
//! <prefix>/sensors/gps/{latitude,longitude,altitude,satellites,hdop}
//! <prefix>/tests/<name>/{status,duration_ms}
//! <prefix>/status/startup   (retained)
//! ```

pub mod client;
pub mod link;
pub mod payload;

pub use client::MetricsClient;
pub use link::{
    LinkAction, LinkEvent, LinkInputs, LinkState, LinkStep, PUBLISH_INTERVAL_MS,
    RECONNECT_BACKOFF_MS,
};

use crate::environment::EnvironmentalReading;
use crate::position::PositionFix;

/// A memory pool as reported by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MemoryPool {
    /// Bytes free
    pub free: u32,
    /// Bytes total
    pub total: u32,
}

/// Host metrics supplied by the board glue on every publish
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HostMetrics {
    pub uptime_s: u32,
    pub heap_free: u32,
    pub heap_total: u32,
    /// External RAM, `None` when the board has none
    pub psram: Option<MemoryPool>,
    /// dBm
    pub wifi_rssi: i32,
    pub wifi_channel: u8,
}

/// Read-only view of everything a publish needs
#[derive(Debug, Clone, Copy)]
pub struct TelemetrySnapshot<'a> {
    pub host: &'a HostMetrics,
    /// `None` when no GPS receiver is configured
    pub position: Option<&'a PositionFix>,
    pub environment: &'a EnvironmentalReading,
}

/// Outcome of one batch of publishes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PublishReport {
    pub attempted: u16,
    pub failed: u16,
}

impl PublishReport {
    fn record(&mut self, ok: bool) {
        self.attempted = self.attempted.saturating_add(1);
        if !ok {
            self.failed = self.failed.saturating_add(1);
        }
    }

    /// Every message in the batch went out
    pub fn all_ok(&self) -> bool {
        self.failed == 0
    }

    /// Messages that went out
    pub fn succeeded(&self) -> u16 {
        self.attempted - self.failed
    }
}
