//! Board-agnostic telemetry core for the Sonde diagnostic device
//!
//! This crate contains all acquisition and fan-out logic that does not depend
//! on specific hardware implementations:
//!
//! - Hardware abstraction traits (sensors, metrics transport)
//! - GPS receiver and position state
//! - Environmental sensor fusion
//! - Metrics link state machine and publish client
//! - Configuration types, text parser and binary persistence
//! - The [`Station`] polling loop tying it together

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod config;
pub mod environment;
pub mod metrics;
pub mod position;
pub mod station;
pub mod traits;

pub use station::{EnvTestReport, GpsTestReport, PollReport, Station};

/// Firmware version announced on connect
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
