//! Character set handling for terminal emulation
//!
//! Supports DEC Special Graphics (line drawing) and the UK national set.

use serde::{Deserialize, Serialize};

/// Character set designations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Charset {
    /// ASCII (US) - default
    #[default]
    Ascii,
    /// DEC Special Graphics (line drawing characters)
    DecSpecialGraphics,
    /// UK character set
    Uk,
}

impl Charset {
    /// Map the final byte of an SCS sequence (`ESC ( 0` and friends)
    pub fn from_designator(byte: u8) -> Option<Self> {
        match byte {
            b'B' => Some(Charset::Ascii),
            b'0' => Some(Charset::DecSpecialGraphics),
            b'A' => Some(Charset::Uk),
            _ => None,
        }
    }

    /// Translate a character through this charset
    pub fn map(self, c: char) -> char {
        match self {
            Charset::Ascii => c,
            Charset::Uk => {
                if c == '#' {
                    '£'
                } else {
                    c
                }
            }
            Charset::DecSpecialGraphics => dec_special_graphics(c),
        }
    }
}

/// DEC Special Graphics mapping for 0x5F..=0x7E
fn dec_special_graphics(c: char) -> char {
    match c {
        '_' => ' ',
        '`' => '◆',
        'a' => '▒',
        'b' => '␉',
        'c' => '␌',
        'd' => '␍',
        'e' => '␊',
        'f' => '°',
        'g' => '±',
        'h' => '␤',
        'i' => '␋',
        'j' => '┘',
        'k' => '┐',
        'l' => '┌',
        'm' => '└',
        'n' => '┼',
        'o' => '⎺',
        'p' => '⎻',
        'q' => '─',
        'r' => '⎼',
        's' => '⎽',
        't' => '├',
        'u' => '┤',
        'v' => '┴',
        'w' => '┬',
        'x' => '│',
        'y' => '≤',
        'z' => '≥',
        '{' => 'π',
        '|' => '≠',
        '}' => '£',
        '~' => '·',
        _ => c,
    }
}

/// Character set state for G0-G3 slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CharsetState {
    slots: [Charset; 4],
    /// Slot invoked into GL (0 = G0, 1 = G1)
    active: u8,
}

impl CharsetState {
    /// Create new charset state with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset to default state
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Get the currently active charset
    pub fn current(&self) -> Charset {
        self.slots[self.active as usize]
    }

    /// Set charset for a slot (0-3); other slots are ignored
    pub fn designate(&mut self, slot: u8, charset: Charset) {
        if let Some(s) = self.slots.get_mut(slot as usize) {
            *s = charset;
        }
    }

    pub fn slot(&self, slot: u8) -> Option<Charset> {
        self.slots.get(slot as usize).copied()
    }

    /// Shift In (SI) - select G0 into GL
    pub fn shift_in(&mut self) {
        self.active = 0;
    }

    /// Shift Out (SO) - select G1 into GL
    pub fn shift_out(&mut self) {
        self.active = 1;
    }

    /// Translate a printable character through the active charset
    pub fn map(&self, c: char) -> char {
        self.current().map(c)
    }
}
