//! Hardware driver implementations
//!
//! This crate provides concrete implementations of the sensor traits defined
//! in sonde-core, talking to the devices over `embedded-hal` I2C:
//!
//! - AHT20 temperature/humidity sensor
//! - BMP280 pressure/temperature sensor with integer compensation

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod aht20;
pub mod bmp280;

pub use aht20::Aht20;
pub use bmp280::Bmp280;
