//! NMEA 0183 sentence handling for GPS receivers
//!
//! This crate turns the raw byte stream of a GPS UART into typed sentences.
//! It is split in three layers:
//!
//! ```text
//! UART bytes ──► LineAssembler ──► checksum ──► Sentence::parse
//!                 (\r dropped,      (policy)     (RMC, GGA, GSA, GSV)
//!                  \n terminates)
//! ```
//!
//! Every frame looks like:
//! ```text
//! $GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6A
//! │ │ │  └──────────── comma separated fields ────────────────────┘ └┴ XOR checksum
//! │ └─┴─ sentence formatter
//! └──── talker id (GP, GN, GL, ...)
//! ```
//!
//! Decoding never mutates anything: applying a sentence to shared state is the
//! job of the caller, which only happens once a frame decoded completely.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod checksum;
pub mod fields;
pub mod line;
pub mod sentence;

pub use checksum::ChecksumPolicy;
pub use fields::{UtcDate, UtcTime};
pub use line::{LineAssembler, LineError, MAX_LINE_LEN, SENTENCE_START};
pub use sentence::{
    FixMode, Gga, Gsa, Gsv, Rmc, SatelliteInfo, Sentence, SentenceError, SentenceKind,
};
