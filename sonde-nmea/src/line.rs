//! Line reassembly for the NMEA byte stream.
//!
//! Line format:
//! - START: `$`
//! - BODY: printable ASCII
//! - END: `\n` (an optional `\r` before it is dropped)
//!
//! Lines that do not start with `$` are noise (boot banners, partial lines
//! after power-up) and are skipped without error.

use heapless::Vec;

/// Sentence start marker
pub const SENTENCE_START: u8 = b'$';

/// Maximum buffered line length in bytes
///
/// NMEA limits sentences to 82 characters; the extra room tolerates receivers
/// that emit longer proprietary lines without losing sync.
pub const MAX_LINE_LEN: usize = 120;

/// Errors that can occur while reassembling lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LineError {
    /// Line exceeded [`MAX_LINE_LEN`]; the rest of it is discarded
    Overflow,
    /// Completed line is not valid UTF-8
    InvalidUtf8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AssembleState {
    /// Appending bytes to the current line
    Collecting,
    /// Dropping bytes until the next line terminator
    Discarding,
}

/// Accumulates serial bytes into newline-terminated lines
#[derive(Debug, Clone)]
pub struct LineAssembler {
    buffer: Vec<u8, MAX_LINE_LEN>,
    state: AssembleState,
    /// The buffer holds a line handed out by the previous `feed`
    complete: bool,
}

impl Default for LineAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl LineAssembler {
    /// Create an empty assembler
    pub const fn new() -> Self {
        Self {
            buffer: Vec::new(),
            state: AssembleState::Collecting,
            complete: false,
        }
    }

    /// Drop any partially buffered line
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.state = AssembleState::Collecting;
        self.complete = false;
    }

    /// Number of bytes buffered for the line in progress
    pub fn pending(&self) -> usize {
        if self.complete {
            0
        } else {
            self.buffer.len()
        }
    }

    /// Feed a single byte
    ///
    /// Returns `Ok(Some(line))` when a `\n` completes a non-empty line starting
    /// with `$`. The returned line is trimmed and stays borrowed until the next
    /// call. `Ok(None)` means more bytes are needed (or the line was noise).
    pub fn feed(&mut self, byte: u8) -> Result<Option<&str>, LineError> {
        if self.complete {
            self.buffer.clear();
            self.complete = false;
        }

        match byte {
            b'\r' => Ok(None),
            b'\n' => {
                if self.state == AssembleState::Discarding {
                    self.state = AssembleState::Collecting;
                    self.buffer.clear();
                    return Ok(None);
                }

                self.complete = true;
                let line = core::str::from_utf8(&self.buffer)
                    .map_err(|_| LineError::InvalidUtf8)?
                    .trim();

                if line.is_empty() || line.as_bytes()[0] != SENTENCE_START {
                    return Ok(None);
                }
                Ok(Some(line))
            }
            _ => {
                if self.state == AssembleState::Discarding {
                    return Ok(None);
                }
                if self.buffer.push(byte).is_err() {
                    self.buffer.clear();
                    self.state = AssembleState::Discarding;
                    return Err(LineError::Overflow);
                }
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_all(assembler: &mut LineAssembler, bytes: &[u8]) -> std::vec::Vec<std::string::String> {
        let mut lines = std::vec::Vec::new();
        for &b in bytes {
            if let Ok(Some(line)) = assembler.feed(b) {
                lines.push(line.into());
            }
        }
        lines
    }

    #[test]
    fn test_single_line() {
        let mut assembler = LineAssembler::new();
        let lines = feed_all(&mut assembler, b"$GPGGA,1,2,3\r\n");
        assert_eq!(lines, ["$GPGGA,1,2,3"]);
    }

    #[test]
    fn test_carriage_return_never_buffered() {
        let mut assembler = LineAssembler::new();
        for &b in b"$GP\rRMC\r" {
            assert_eq!(assembler.feed(b), Ok(None));
        }
        assert_eq!(assembler.pending(), 6);
        assert_eq!(assembler.feed(b'\n'), Ok(Some("$GPRMC")));
    }

    #[test]
    fn test_noise_lines_skipped() {
        let mut assembler = LineAssembler::new();
        let lines = feed_all(&mut assembler, b"boot banner\n\n   \n$GNGSA,A,3\n");
        assert_eq!(lines, ["$GNGSA,A,3"]);
    }

    #[test]
    fn test_partial_line_across_chunks() {
        let mut assembler = LineAssembler::new();
        assert!(feed_all(&mut assembler, b"$GPRMC,12").is_empty());
        let lines = feed_all(&mut assembler, b"3519,A\n$GPGGA");
        assert_eq!(lines, ["$GPRMC,123519,A"]);
        assert_eq!(assembler.pending(), 6);
    }

    #[test]
    fn test_overflow_discards_whole_line() {
        let mut assembler = LineAssembler::new();
        let mut overflows = 0;
        assert_eq!(assembler.feed(b'$'), Ok(None));
        for _ in 0..MAX_LINE_LEN + 10 {
            if assembler.feed(b'A') == Err(LineError::Overflow) {
                overflows += 1;
            }
        }
        assert_eq!(overflows, 1);

        // Terminator ends the discarded line without yielding it
        assert_eq!(assembler.feed(b'\n'), Ok(None));

        // Next line is intact
        let lines = feed_all(&mut assembler, b"$GPGSV,1,1,00\n");
        assert_eq!(lines, ["$GPGSV,1,1,00"]);
    }

    #[test]
    fn test_invalid_utf8_line() {
        let mut assembler = LineAssembler::new();
        assert_eq!(assembler.feed(b'$'), Ok(None));
        assert_eq!(assembler.feed(0xFF), Ok(None));
        assert_eq!(assembler.feed(b'\n'), Err(LineError::InvalidUtf8));

        // Recovers on the following line
        let lines = feed_all(&mut assembler, b"$GPRMC\n");
        assert_eq!(lines, ["$GPRMC"]);
    }
}
