//! GPS receiver front end
//!
//! Drains the serial port, reassembles lines, decodes them and applies them
//! to the owned [`PositionFix`]. Rejected frames only touch the counters.

use embedded_io::{Read, ReadReady};
use sonde_nmea::{ChecksumPolicy, LineAssembler, LineError, Sentence, SentenceError, SentenceKind};

use super::fix::PositionFix;

/// Bytes pulled from the serial port per read call
const READ_CHUNK: usize = 64;

/// Frame counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GpsStats {
    /// Complete `$` lines seen, accepted or not
    pub lines: u32,
    /// Lines decoded and applied
    pub accepted: u32,
    /// Formatters that are not decoded
    pub unsupported: u32,
    /// Missing or wrong checksums
    pub checksum_errors: u32,
    /// Too few fields or undecodable field contents
    pub malformed: u32,
    /// Lines longer than the reassembly buffer
    pub overflows: u32,
    /// Lines that were not UTF-8
    pub invalid_utf8: u32,
    /// Serial read failures
    pub serial_errors: u32,
}

impl GpsStats {
    fn record(&mut self, error: SentenceError) {
        match error {
            SentenceError::Unsupported => self.unsupported += 1,
            SentenceError::MissingChecksum | SentenceError::BadChecksum => {
                self.checksum_errors += 1
            }
            SentenceError::NotASentence
            | SentenceError::TooFewFields
            | SentenceError::InvalidField => self.malformed += 1,
        }
    }
}

/// NMEA receiver owning the position state
#[derive(Debug, Clone)]
pub struct GpsReceiver {
    assembler: LineAssembler,
    fix: PositionFix,
    stats: GpsStats,
    policy: ChecksumPolicy,
}

impl GpsReceiver {
    /// Create a receiver with no fix
    pub const fn new(policy: ChecksumPolicy) -> Self {
        Self {
            assembler: LineAssembler::new(),
            fix: PositionFix::new(),
            stats: GpsStats {
                lines: 0,
                accepted: 0,
                unsupported: 0,
                checksum_errors: 0,
                malformed: 0,
                overflows: 0,
                invalid_utf8: 0,
                serial_errors: 0,
            },
            policy,
        }
    }

    /// Feed one byte
    ///
    /// Returns the kind of sentence applied when this byte completed one.
    pub fn feed(&mut self, byte: u8) -> Option<SentenceKind> {
        let line = match self.assembler.feed(byte) {
            Ok(Some(line)) => line,
            Ok(None) => return None,
            Err(LineError::Overflow) => {
                self.stats.overflows += 1;
                sonde_log::trace!("nmea line overflow");
                return None;
            }
            Err(LineError::InvalidUtf8) => {
                self.stats.invalid_utf8 += 1;
                return None;
            }
        };

        self.stats.lines = self.stats.lines.wrapping_add(1);

        match Sentence::parse(line, self.policy) {
            Ok(sentence) => {
                self.fix.apply(&sentence);
                self.stats.accepted = self.stats.accepted.wrapping_add(1);
                Some(sentence.kind())
            }
            Err(e) => {
                sonde_log::trace!("nmea frame rejected: {:?}", e);
                self.stats.record(e);
                None
            }
        }
    }

    /// Feed a chunk of bytes, returning how many sentences were applied
    pub fn feed_bytes(&mut self, bytes: &[u8]) -> usize {
        bytes.iter().filter_map(|&b| self.feed(b)).count()
    }

    /// Drain whatever the serial port already holds
    ///
    /// Never waits for data. Returns the number of bytes consumed.
    pub fn poll_serial<S: Read + ReadReady>(&mut self, serial: &mut S) -> Result<usize, S::Error> {
        let mut buf = [0u8; READ_CHUNK];
        let mut consumed = 0;

        while serial.read_ready()? {
            let n = serial.read(&mut buf)?;
            if n == 0 {
                break;
            }
            self.feed_bytes(&buf[..n]);
            consumed += n;
        }

        Ok(consumed)
    }

    /// Record a pulse-per-second edge
    pub fn mark_pps(&mut self) {
        self.fix.has_pps = true;
    }

    /// Note a serial failure seen by the caller
    pub fn record_serial_error(&mut self) {
        self.stats.serial_errors += 1;
    }

    /// Current position state
    pub fn fix(&self) -> &PositionFix {
        &self.fix
    }

    /// Frame counters
    pub fn stats(&self) -> &GpsStats {
        &self.stats
    }

    /// Checksum policy in force
    pub fn policy(&self) -> ChecksumPolicy {
        self.policy
    }
}
