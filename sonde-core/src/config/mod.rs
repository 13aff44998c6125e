//! Station configuration
//!
//! Board-agnostic configuration structures. A text form (TOML subset) is read
//! at provisioning time; the binary form is stored as postcard data.

pub mod parse;
#[cfg(feature = "serde")]
pub mod persist;
pub mod types;

pub use parse::{parse_config, ParseError};
pub use types::*;
