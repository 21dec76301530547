//! Terminal actions produced by the parser
//!
//! Actions represent the semantic meaning of parsed escape sequences.
//! They are produced by the parser and consumed only by the screen buffer.
//! Coordinates and counts are already decoded: rows and columns are
//! 0-indexed, and counts have their defaults applied.

use serde::{Deserialize, Serialize};

use crate::core::{Charset, Color};

/// Actions produced by the parser
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminalAction {
    /// Print a character at the current cursor position
    Print(char),

    /// BEL
    Bell,
    /// BS
    Backspace,
    /// HT
    Tab,
    /// LF, VT and FF
    LineFeed,
    /// CR
    CarriageReturn,
    /// SO: invoke G1 into GL
    ShiftOut,
    /// SI: invoke G0 into GL
    ShiftIn,

    /// IND: move down one line, scrolling at the bottom margin
    Index,
    /// RI: move up one line, scrolling at the top margin
    ReverseIndex,
    /// NEL: carriage return plus index
    NextLine,

    /// Cursor movement, absolute or relative
    MoveCursor(CursorMotion),

    /// Erase part of the line, the screen or the scrollback
    Erase(EraseRegion),

    /// DECSTBM. `bottom` of `None` means the last row.
    SetScrollRegion { top: u16, bottom: Option<u16> },

    /// One SGR attribute change
    SetAttribute(SgrAttribute),

    /// Set or reset a terminal mode
    SetMode { mode: Mode, enabled: bool },

    /// SU: scroll the region up by n lines
    ScrollUp(u16),
    /// SD: scroll the region down by n lines
    ScrollDown(u16),
    /// IL
    InsertLines(u16),
    /// DL
    DeleteLines(u16),
    /// ICH
    InsertChars(u16),
    /// DCH
    DeleteChars(u16),
    /// REP: repeat the last printed character n times
    RepeatLast(u16),

    /// DECSC / CSI s
    SaveCursor,
    /// DECRC / CSI u
    RestoreCursor,

    /// HTS: set a tab stop at the cursor column
    SetTabStop,
    /// TBC: clear the tab stop at the cursor, or all of them
    ClearTabStop { all: bool },
    /// CHT: advance n tab stops
    TabForward(u16),
    /// CBT: go back n tab stops
    TabBackward(u16),

    /// SCS: designate a character set into G0..G3
    DesignateCharset { slot: u8, charset: Charset },

    /// OSC 0 / OSC 2
    SetTitle(String),

    /// DSR
    DeviceStatus(StatusReport),
    /// DA1 (`secondary == false`) or DA2
    DeviceAttributes { secondary: bool },

    /// DECSTR
    SoftReset,
    /// RIS
    FullReset,
    /// DECALN: fill the screen with 'E'
    AlignmentTest,

    /// XTWINOPS 8: the application asked for a new text area size
    Resize { cols: u16, rows: u16 },
}

impl TerminalAction {
    /// Check if this is a print action
    pub fn is_print(&self) -> bool {
        matches!(self, TerminalAction::Print(_))
    }
}

/// Cursor motion carried by [`TerminalAction::MoveCursor`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CursorMotion {
    /// CUP / HVP (0-indexed)
    To { row: u16, col: u16 },
    /// VPA (0-indexed)
    ToRow(u16),
    /// CHA / HPA (0-indexed)
    ToCol(u16),
    /// CUU
    Up(u16),
    /// CUD / VPR
    Down(u16),
    /// CUF / HPR
    Forward(u16),
    /// CUB
    Backward(u16),
    /// CNL
    NextLine(u16),
    /// CPL
    PrevLine(u16),
}

/// Region affected by [`TerminalAction::Erase`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EraseRegion {
    /// EL 0
    ToEndOfLine,
    /// EL 1
    ToStartOfLine,
    /// EL 2
    Line,
    /// ED 0
    ToEndOfScreen,
    /// ED 1
    ToStartOfScreen,
    /// ED 2
    Screen,
    /// ED 3 (xterm): clear the scrollback
    Scrollback,
    /// ECH: n characters from the cursor
    Chars(u16),
}

/// A single SGR (Select Graphic Rendition) attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SgrAttribute {
    Reset,
    Bold,
    Faint,
    Italic,
    Underline,
    Blink,
    Inverse,
    Hidden,
    Strikethrough,
    NormalIntensity,
    NotItalic,
    NotUnderlined,
    NotBlinking,
    NotInverse,
    NotHidden,
    NotStrikethrough,
    Foreground(Color),
    Background(Color),
}

/// Terminal modes understood by the screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    /// IRM (4)
    Insert,
    /// LNM (20)
    LineFeedNewLine,
    /// DECCKM (?1)
    ApplicationCursor,
    /// DECSCNM (?5)
    ReverseVideo,
    /// DECOM (?6)
    Origin,
    /// DECAWM (?7)
    AutoWrap,
    /// att610 (?12)
    CursorBlink,
    /// DECTCEM (?25)
    CursorVisible,
    /// DECNKM (?66), DECKPAM / DECKPNM
    ApplicationKeypad,
    /// ?1000
    MouseNormal,
    /// ?1002
    MouseButtonEvent,
    /// ?1003
    MouseAnyEvent,
    /// ?1004
    FocusReporting,
    /// ?1006
    MouseSgr,
    /// ?47 and ?1047
    AlternateScreen,
    /// ?1048
    SaveCursor,
    /// ?1049
    AlternateScreenSaveCursor,
    /// ?2004
    BracketedPaste,
}

impl Mode {
    /// Map an ANSI (SM/RM) mode number
    pub fn from_ansi(code: u16) -> Option<Self> {
        match code {
            4 => Some(Mode::Insert),
            20 => Some(Mode::LineFeedNewLine),
            _ => None,
        }
    }

    /// Map a DEC private (DECSET/DECRST) mode number
    pub fn from_dec(code: u16) -> Option<Self> {
        match code {
            1 => Some(Mode::ApplicationCursor),
            5 => Some(Mode::ReverseVideo),
            6 => Some(Mode::Origin),
            7 => Some(Mode::AutoWrap),
            12 => Some(Mode::CursorBlink),
            25 => Some(Mode::CursorVisible),
            47 | 1047 => Some(Mode::AlternateScreen),
            66 => Some(Mode::ApplicationKeypad),
            1000 => Some(Mode::MouseNormal),
            1002 => Some(Mode::MouseButtonEvent),
            1003 => Some(Mode::MouseAnyEvent),
            1004 => Some(Mode::FocusReporting),
            1006 => Some(Mode::MouseSgr),
            1048 => Some(Mode::SaveCursor),
            1049 => Some(Mode::AlternateScreenSaveCursor),
            2004 => Some(Mode::BracketedPaste),
            _ => None,
        }
    }
}

/// DSR request kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusReport {
    /// DSR 5: operating status
    Operating,
    /// DSR 6: cursor position report
    CursorPosition,
}

/// C0 control characters
pub mod c0 {
    pub const NUL: u8 = 0x00;
    pub const BEL: u8 = 0x07;
    pub const BS: u8 = 0x08;
    pub const HT: u8 = 0x09;
    pub const LF: u8 = 0x0A;
    pub const VT: u8 = 0x0B;
    pub const FF: u8 = 0x0C;
    pub const CR: u8 = 0x0D;
    pub const SO: u8 = 0x0E;
    pub const SI: u8 = 0x0F;
    pub const CAN: u8 = 0x18;
    pub const SUB: u8 = 0x1A;
    pub const ESC: u8 = 0x1B;
    pub const DEL: u8 = 0x7F;
}

/// C1 control characters (8-bit)
pub mod c1 {
    pub const IND: u8 = 0x84;
    pub const NEL: u8 = 0x85;
    pub const HTS: u8 = 0x88;
    pub const RI: u8 = 0x8D;
    pub const DCS: u8 = 0x90;
    pub const SOS: u8 = 0x98;
    pub const CSI: u8 = 0x9B;
    pub const ST: u8 = 0x9C;
    pub const OSC: u8 = 0x9D;
    pub const PM: u8 = 0x9E;
    pub const APC: u8 = 0x9F;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_tables() {
        assert_eq!(Mode::from_ansi(4), Some(Mode::Insert));
        assert_eq!(Mode::from_ansi(25), None);
        assert_eq!(Mode::from_dec(25), Some(Mode::CursorVisible));
        assert_eq!(Mode::from_dec(1047), Some(Mode::AlternateScreen));
        assert_eq!(Mode::from_dec(9999), None);
    }

    #[test]
    fn test_action_serialization() {
        let action = TerminalAction::SetAttribute(SgrAttribute::Foreground(Color::Rgb(1, 2, 3)));
        let json = serde_json::to_string(&action).unwrap();
        let restored: TerminalAction = serde_json::from_str(&json).unwrap();
        assert_eq!(action, restored);
        assert!(TerminalAction::Print('x').is_print());
        assert!(!TerminalAction::Bell.is_print());
    }
}
