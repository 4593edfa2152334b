use crate::transport::ByteSource;
use tracing::trace;

/// Incremental reader for control words sent as decimal text.
///
/// A word is complete once a non-digit byte follows at least one digit.
/// Bytes before the first digit are skipped, apart from a `-` which negates
/// the number. The result keeps the low 16 bits of the parsed value, so no
/// input is ever refused.
#[derive(Debug, Clone, Default)]
pub struct ControlWordReader {
    value: u32,
    digits: usize,
    negative: bool,
}

impl ControlWordReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// True while some digits have arrived but no terminator yet.
    pub fn is_partial(&self) -> bool {
        self.digits > 0 || self.negative
    }

    fn finish(&mut self) -> u16 {
        let value = if self.negative {
            self.value.wrapping_neg()
        } else {
            self.value
        };
        *self = Self::default();
        value as u16
    }

    /// Feed one byte, returning a word when this byte terminates one.
    pub fn feed(&mut self, byte: u8) -> Option<u16> {
        match byte {
            b'0'..=b'9' => {
                self.value = self
                    .value
                    .wrapping_mul(10)
                    .wrapping_add(u32::from(byte - b'0'));
                self.digits += 1;
                None
            }
            _ if self.digits > 0 => Some(self.finish()),
            b'-' => {
                self.negative = true;
                None
            }
            _ => {
                self.negative = false;
                None
            }
        }
    }

    /// Read from `source` until one word completes or the source runs dry.
    /// Bytes after the terminator stay in the source.
    pub fn poll<S>(&mut self, source: &mut S) -> Option<u16>
    where
        S: ByteSource + ?Sized,
    {
        while let Some(byte) = source.read_byte() {
            if let Some(word) = self.feed(byte) {
                trace!(word, "Received control word");
                return Some(word);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    fn source(text: &str) -> VecDeque<u8> {
        text.bytes().collect()
    }

    #[test]
    fn word_needs_terminator() {
        let mut reader = ControlWordReader::new();
        let mut input = source("3376");
        assert_eq!(reader.poll(&mut input), None);
        assert!(reader.is_partial());

        input.extend(b"\n".iter());
        assert_eq!(reader.poll(&mut input), Some(3376));
        assert!(!reader.is_partial());
    }

    #[test]
    fn one_word_per_poll() {
        let mut reader = ControlWordReader::new();
        let mut input = source("12 34\n");
        assert_eq!(reader.poll(&mut input), Some(12));
        assert_eq!(input.len(), 3);
        assert_eq!(reader.poll(&mut input), Some(34));
        assert!(input.is_empty());
    }

    #[test]
    fn leading_noise_is_skipped() {
        let mut reader = ControlWordReader::new();
        let mut input = source("\r\nabc42,");
        assert_eq!(reader.poll(&mut input), Some(42));
    }

    #[test]
    fn values_wrap_to_sixteen_bits() {
        let mut reader = ControlWordReader::new();
        let mut input = source("65536\n65537\n-1\n");
        assert_eq!(reader.poll(&mut input), Some(0));
        assert_eq!(reader.poll(&mut input), Some(1));
        assert_eq!(reader.poll(&mut input), Some(0xFFFF));
    }

    #[test]
    fn lone_minus_is_dropped() {
        let mut reader = ControlWordReader::new();
        let mut input = source("- 5\n");
        assert_eq!(reader.poll(&mut input), Some(5));
    }
}
