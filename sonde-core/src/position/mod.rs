//! GPS position tracking
//!
//! ```text
//! serial ──► GpsReceiver ──► Sentence::parse ──► PositionFix::apply
//!                 │
//!                 └── GpsStats (lines, rejections, overflows)
//! ```

pub mod fix;
pub mod receiver;
pub mod selftest;

pub use fix::{FixStatus, FixType, PositionFix, DOP_UNKNOWN};
pub use receiver::{GpsReceiver, GpsStats};
pub use selftest::{GpsSelfTest, GpsTestOutcome, GPS_SELF_TEST_TIMEOUT_MS};
