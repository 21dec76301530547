//! UTF-8 decoding for the terminal parser
//!
//! Handles streaming UTF-8 decoding with proper error handling. A sequence
//! may be split across any number of `feed` calls. Overlong forms, UTF-16
//! surrogates and code points above U+10FFFF are rejected.

/// Replacement character emitted for every malformed sequence
pub const REPLACEMENT: char = '\u{FFFD}';

/// UTF-8 decoder state
#[derive(Debug, Clone, Default)]
pub struct Utf8Decoder {
    /// Code point bits accumulated so far
    codepoint: u32,
    /// Number of continuation bytes still expected
    remaining: u8,
    /// Valid range for the next continuation byte
    lower: u8,
    upper: u8,
}

/// Result of feeding a byte to the decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Utf8Result {
    /// Need more bytes
    Pending,
    /// Successfully decoded a character
    Char(char),
    /// Invalid byte, consumed
    Invalid,
    /// The pending sequence was cut short by this byte. The sequence is
    /// invalid and the byte has not been consumed.
    Interrupted,
}

impl Utf8Decoder {
    /// Create a new decoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset the decoder state
    pub fn reset(&mut self) {
        self.codepoint = 0;
        self.remaining = 0;
    }

    /// Check if decoder is in the middle of a sequence
    pub fn is_pending(&self) -> bool {
        self.remaining > 0
    }

    /// Feed a byte to the decoder
    pub fn feed(&mut self, byte: u8) -> Utf8Result {
        if self.remaining == 0 {
            return self.start(byte);
        }

        if byte < self.lower || byte > self.upper {
            self.reset();
            return Utf8Result::Interrupted;
        }

        self.codepoint = (self.codepoint << 6) | (byte & 0x3F) as u32;
        self.remaining -= 1;
        self.lower = 0x80;
        self.upper = 0xBF;

        if self.remaining > 0 {
            return Utf8Result::Pending;
        }

        let cp = self.codepoint;
        self.reset();
        char::from_u32(cp)
            .map(Utf8Result::Char)
            .unwrap_or(Utf8Result::Invalid)
    }

    fn start(&mut self, byte: u8) -> Utf8Result {
        // ASCII fast path
        if byte < 0x80 {
            return Utf8Result::Char(byte as char);
        }

        // The second byte range is narrowed for leads that could otherwise
        // produce overlong forms, surrogates or values past U+10FFFF.
        let (bits, remaining, lower, upper) = match byte {
            0xC2..=0xDF => (byte & 0x1F, 1, 0x80, 0xBF),
            0xE0 => (byte & 0x0F, 2, 0xA0, 0xBF),
            0xE1..=0xEC | 0xEE..=0xEF => (byte & 0x0F, 2, 0x80, 0xBF),
            0xED => (byte & 0x0F, 2, 0x80, 0x9F),
            0xF0 => (byte & 0x07, 3, 0x90, 0xBF),
            0xF1..=0xF3 => (byte & 0x07, 3, 0x80, 0xBF),
            0xF4 => (byte & 0x07, 3, 0x80, 0x8F),
            // Stray continuation, overlong lead (C0, C1) or F5..FF
            _ => return Utf8Result::Invalid,
        };

        self.codepoint = bits as u32;
        self.remaining = remaining;
        self.lower = lower;
        self.upper = upper;
        Utf8Result::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(bytes: &[u8]) -> Vec<Utf8Result> {
        let mut decoder = Utf8Decoder::new();
        bytes
            .iter()
            .map(|&b| decoder.feed(b))
            .filter(|r| *r != Utf8Result::Pending)
            .collect()
    }

    #[test]
    fn test_ascii() {
        assert_eq!(decode(b"A"), vec![Utf8Result::Char('A')]);
    }

    #[test]
    fn test_multibyte() {
        assert_eq!(decode("é".as_bytes()), vec![Utf8Result::Char('é')]);
        assert_eq!(decode("中".as_bytes()), vec![Utf8Result::Char('中')]);
        assert_eq!(decode("😀".as_bytes()), vec![Utf8Result::Char('😀')]);
    }

    #[test]
    fn test_split_sequence() {
        let mut decoder = Utf8Decoder::new();
        let bytes = "中".as_bytes();
        assert_eq!(decoder.feed(bytes[0]), Utf8Result::Pending);
        assert!(decoder.is_pending());
        assert_eq!(decoder.feed(bytes[1]), Utf8Result::Pending);
        assert_eq!(decoder.feed(bytes[2]), Utf8Result::Char('中'));
        assert!(!decoder.is_pending());
    }

    #[test]
    fn test_overlong_rejected() {
        // C0 80 is an overlong NUL
        assert_eq!(decode(&[0xC0]), vec![Utf8Result::Invalid]);
        // E0 80 80 is an overlong NUL in three bytes
        assert_eq!(decode(&[0xE0, 0x80]), vec![Utf8Result::Interrupted]);
    }

    #[test]
    fn test_surrogate_rejected() {
        assert_eq!(decode(&[0xED, 0xA0]), vec![Utf8Result::Interrupted]);
    }

    #[test]
    fn test_out_of_range_rejected() {
        assert_eq!(decode(&[0xF4, 0x90]), vec![Utf8Result::Interrupted]);
        assert_eq!(decode(&[0xF5]), vec![Utf8Result::Invalid]);
    }

    #[test]
    fn test_stray_continuation() {
        assert_eq!(decode(&[0x80]), vec![Utf8Result::Invalid]);
    }

    #[test]
    fn test_interrupted_by_ascii() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.feed(0xE4), Utf8Result::Pending);
        assert_eq!(decoder.feed(b'A'), Utf8Result::Interrupted);
        assert!(!decoder.is_pending());
        assert_eq!(decoder.feed(b'A'), Utf8Result::Char('A'));
    }
}
