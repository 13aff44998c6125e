//! GPS self-test
//!
//! Polled, never blocking: the caller keeps feeding the receiver and asks the
//! test for a verdict on each loop iteration.

use core::fmt;

use super::fix::PositionFix;

/// Time allowed for a fix before the test gives up
pub const GPS_SELF_TEST_TIMEOUT_MS: u32 = 10_000;

/// Verdict of a GPS self-test
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GpsTestOutcome {
    /// Fix with at least one satellite
    Passed,
    /// Timed out without a single frame
    NoData,
    /// Frames arrived but no fix within the timeout
    NoFix { satellites: u8 },
    /// Receiver disabled or acquisition stopped
    NotInitialized,
}

impl GpsTestOutcome {
    pub fn passed(&self) -> bool {
        matches!(self, GpsTestOutcome::Passed)
    }
}

impl fmt::Display for GpsTestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpsTestOutcome::Passed => f.write_str("OK"),
            GpsTestOutcome::NoData => f.write_str("Timeout - no data received"),
            GpsTestOutcome::NoFix { satellites } => {
                write!(f, "{} satellites visible, waiting for fix...", satellites)
            }
            GpsTestOutcome::NotInitialized => f.write_str("GPS not initialized"),
        }
    }
}

/// A running GPS self-test
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GpsSelfTest {
    started_ms: u32,
    lines_at_start: u32,
}

impl GpsSelfTest {
    /// Start a test at `now_ms`; `lines_seen` is the receiver's line counter
    pub const fn start(now_ms: u32, lines_seen: u32) -> Self {
        Self {
            started_ms: now_ms,
            lines_at_start: lines_seen,
        }
    }

    /// Milliseconds since the test started
    pub fn elapsed_ms(&self, now_ms: u32) -> u32 {
        now_ms.wrapping_sub(self.started_ms)
    }

    /// Check the current fix
    ///
    /// Returns `None` while the test is still waiting.
    pub fn poll(&self, now_ms: u32, fix: &PositionFix, lines_seen: u32) -> Option<GpsTestOutcome> {
        if fix.has_fix && fix.satellites_visible > 0 {
            return Some(GpsTestOutcome::Passed);
        }

        if self.elapsed_ms(now_ms) < GPS_SELF_TEST_TIMEOUT_MS {
            return None;
        }

        if lines_seen == self.lines_at_start {
            Some(GpsTestOutcome::NoData)
        } else {
            Some(GpsTestOutcome::NoFix {
                satellites: fix.satellites_visible,
            })
        }
    }
}
