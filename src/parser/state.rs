//! VT/xterm escape sequence parser
//!
//! This parser implements a state machine based on the VT500-series parser
//! described in the DEC documentation and Paul Williams' state machine diagram.
//!
//! The parser is streaming and can handle arbitrary chunk boundaries.
//! All state lives in [`Parser`], so a sequence split between two `feed`
//! calls resumes where it stopped.

use std::collections::VecDeque;

use super::action::{c0, c1, TerminalAction};
use super::dispatch;
use super::params::Params;
use super::utf8::{Utf8Decoder, Utf8Result, REPLACEMENT};

/// Maximum intermediate bytes collected for ESC and CSI sequences
pub const MAX_INTERMEDIATES: usize = 4;

/// Default cap on OSC payload size
pub const MAX_OSC_LEN: usize = 64 * 1024;

/// Parser state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParserState {
    /// Normal character processing
    #[default]
    Ground,
    /// After ESC
    Escape,
    /// After ESC and one or more intermediate bytes
    EscapeIntermediate,
    /// After ESC [ or 0x9B
    CsiEntry,
    /// CSI parameter bytes
    CsiParam,
    /// CSI intermediate bytes
    CsiIntermediate,
    /// Malformed CSI, consumed until its final byte
    CsiIgnore,
    /// After ESC ] or 0x9D
    OscString,
    /// After ESC P or 0x90
    DcsEntry,
    DcsParam,
    DcsIntermediate,
    /// DCS data, dropped
    DcsPassthrough,
    /// Malformed DCS, consumed until ST
    DcsIgnore,
    /// SOS, PM or APC data, dropped
    SosPmApcString,
}

/// The VT/xterm parser
#[derive(Debug)]
pub struct Parser {
    state: ParserState,
    utf8: Utf8Decoder,
    params: Params,
    intermediates: Vec<u8>,
    intermediates_overflowed: bool,
    /// Private marker for CSI sequences (`?`, `>`, `<` or `=`)
    private: Option<u8>,
    osc: Vec<u8>,
    osc_truncated: bool,
    max_osc_len: usize,
    /// Actions produced but not yet handed out
    pending: VecDeque<TerminalAction>,
    malformed: u64,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    /// Create a new parser
    pub fn new() -> Self {
        Parser {
            state: ParserState::Ground,
            utf8: Utf8Decoder::new(),
            params: Params::new(),
            intermediates: Vec::with_capacity(MAX_INTERMEDIATES),
            intermediates_overflowed: false,
            private: None,
            osc: Vec::with_capacity(256),
            osc_truncated: false,
            max_osc_len: MAX_OSC_LEN,
            pending: VecDeque::new(),
            malformed: 0,
        }
    }

    /// Set maximum OSC length
    pub fn set_max_osc_len(&mut self, len: usize) {
        self.max_osc_len = len;
    }

    /// Current state of the machine
    pub fn state(&self) -> ParserState {
        self.state
    }

    /// Number of malformed sequences recovered from so far
    pub fn malformed_count(&self) -> u64 {
        self.malformed
    }

    /// Reset parser state to ground.
    ///
    /// Actions already produced but not yet consumed are kept.
    pub fn reset(&mut self) {
        self.state = ParserState::Ground;
        self.utf8.reset();
        self.clear();
    }

    /// Feed a chunk of bytes.
    ///
    /// The returned iterator produces actions lazily. Dropping it early is
    /// allowed: the rest of the chunk is still consumed, and its actions are
    /// returned first by the next call.
    pub fn feed<'a>(&'a mut self, bytes: &'a [u8]) -> Actions<'a> {
        Actions {
            parser: self,
            bytes,
            pos: 0,
        }
    }

    /// Parse bytes and invoke callback for each action
    pub fn parse<F>(&mut self, data: &[u8], mut callback: F)
    where
        F: FnMut(TerminalAction),
    {
        for action in self.feed(data) {
            callback(action);
        }
    }

    /// Parse bytes and collect actions into a vector
    pub fn parse_collect(&mut self, data: &[u8]) -> Vec<TerminalAction> {
        self.feed(data).collect()
    }

    fn clear(&mut self) {
        self.params.clear();
        self.intermediates.clear();
        self.intermediates_overflowed = false;
        self.private = None;
        self.osc.clear();
        self.osc_truncated = false;
    }

    fn emit(&mut self, action: TerminalAction) {
        self.pending.push_back(action);
    }

    fn malformed(&mut self, reason: &str) {
        self.malformed += 1;
        tracing::trace!(state = ?self.state, reason, "Malformed sequence");
    }

    fn enter(&mut self, state: ParserState) {
        self.clear();
        self.state = state;
    }

    /// Advance the state machine by one byte
    fn advance(&mut self, byte: u8) {
        if self.state == ParserState::Ground && self.utf8.is_pending() {
            match self.utf8.feed(byte) {
                Utf8Result::Pending => return,
                Utf8Result::Char(c) => {
                    self.emit(TerminalAction::Print(c));
                    return;
                }
                Utf8Result::Invalid => {
                    self.malformed("invalid UTF-8");
                    self.emit(TerminalAction::Print(REPLACEMENT));
                    return;
                }
                Utf8Result::Interrupted => {
                    // Sequence cut short: replace it and reprocess this byte
                    self.malformed("truncated UTF-8");
                    self.emit(TerminalAction::Print(REPLACEMENT));
                }
            }
        }

        match self.state {
            ParserState::Ground => self.ground(byte),
            ParserState::Escape => self.escape(byte),
            ParserState::EscapeIntermediate => self.escape_intermediate(byte),
            ParserState::CsiEntry => self.csi_entry(byte),
            ParserState::CsiParam => self.csi_param(byte),
            ParserState::CsiIntermediate => self.csi_intermediate(byte),
            ParserState::CsiIgnore => self.csi_ignore(byte),
            ParserState::OscString => self.osc_string(byte),
            ParserState::DcsEntry | ParserState::DcsParam | ParserState::DcsIntermediate => {
                self.dcs_header(byte)
            }
            ParserState::DcsPassthrough
            | ParserState::DcsIgnore
            | ParserState::SosPmApcString => self.dropped_string(byte),
        }
    }

    /// Execute a C0 control
    fn execute(&mut self, byte: u8) {
        let action = match byte {
            c0::BEL => TerminalAction::Bell,
            c0::BS => TerminalAction::Backspace,
            c0::HT => TerminalAction::Tab,
            c0::LF | c0::VT | c0::FF => TerminalAction::LineFeed,
            c0::CR => TerminalAction::CarriageReturn,
            c0::SO => TerminalAction::ShiftOut,
            c0::SI => TerminalAction::ShiftIn,
            _ => return,
        };
        self.emit(action);
    }

    /// Handle C1 control characters (8-bit), valid outside UTF-8 sequences
    fn handle_c1(&mut self, byte: u8) {
        if self.state != ParserState::Ground {
            self.malformed("sequence interrupted by C1 control");
        }
        match byte {
            c1::CSI => self.enter(ParserState::CsiEntry),
            c1::OSC => self.enter(ParserState::OscString),
            c1::DCS => self.enter(ParserState::DcsEntry),
            c1::SOS | c1::PM | c1::APC => self.enter(ParserState::SosPmApcString),
            _ => {
                self.state = ParserState::Ground;
                match byte {
                    c1::IND => self.emit(TerminalAction::Index),
                    c1::NEL => self.emit(TerminalAction::NextLine),
                    c1::HTS => self.emit(TerminalAction::SetTabStop),
                    c1::RI => self.emit(TerminalAction::ReverseIndex),
                    _ => {}
                }
            }
        }
    }

    /// Bytes shared by every non-string state: CAN/SUB abort, ESC restarts
    /// and C1 controls take over. Returns true if the byte was consumed.
    fn interrupt(&mut self, byte: u8) -> bool {
        match byte {
            c0::CAN | c0::SUB => {
                self.malformed("sequence cancelled");
                self.state = ParserState::Ground;
                true
            }
            c0::ESC => {
                self.malformed("sequence interrupted by ESC");
                self.enter(ParserState::Escape);
                true
            }
            0x80..=0x9F => {
                self.handle_c1(byte);
                true
            }
            _ => false,
        }
    }

    fn ground(&mut self, byte: u8) {
        match byte {
            c0::ESC => self.enter(ParserState::Escape),
            0x00..=0x1F => self.execute(byte),
            0x20..=0x7E => self.emit(TerminalAction::Print(byte as char)),
            c0::DEL => {}
            0x80..=0x9F => self.handle_c1(byte),
            _ => match self.utf8.feed(byte) {
                Utf8Result::Char(c) => self.emit(TerminalAction::Print(c)),
                Utf8Result::Pending => {}
                Utf8Result::Invalid | Utf8Result::Interrupted => {
                    self.malformed("invalid UTF-8 lead byte");
                    self.emit(TerminalAction::Print(REPLACEMENT));
                }
            },
        }
    }

    fn escape(&mut self, byte: u8) {
        if self.interrupt(byte) {
            return;
        }
        match byte {
            0x00..=0x1F => self.execute(byte),
            0x20..=0x2F => {
                self.collect(byte);
                self.state = ParserState::EscapeIntermediate;
            }
            b'[' => self.enter(ParserState::CsiEntry),
            b']' => self.enter(ParserState::OscString),
            b'P' => self.enter(ParserState::DcsEntry),
            b'X' | b'^' | b'_' => self.enter(ParserState::SosPmApcString),
            0x30..=0x7E => self.esc_dispatch(byte),
            c0::DEL => {}
            _ => {
                self.malformed("non-ASCII byte in escape sequence");
                self.state = ParserState::Ground;
                self.ground(byte);
            }
        }
    }

    fn escape_intermediate(&mut self, byte: u8) {
        if self.interrupt(byte) {
            return;
        }
        match byte {
            0x00..=0x1F => self.execute(byte),
            0x20..=0x2F => self.collect(byte),
            0x30..=0x7E => self.esc_dispatch(byte),
            c0::DEL => {}
            _ => {
                self.malformed("non-ASCII byte in escape sequence");
                self.state = ParserState::Ground;
                self.ground(byte);
            }
        }
    }

    fn csi_entry(&mut self, byte: u8) {
        if self.interrupt(byte) {
            return;
        }
        match byte {
            0x00..=0x1F => self.execute(byte),
            b'0'..=b'9' => {
                self.params.push_digit(byte);
                self.state = ParserState::CsiParam;
            }
            b';' | b':' => {
                self.param_separator();
            }
            0x3C..=0x3F => {
                self.private = Some(byte);
                self.state = ParserState::CsiParam;
            }
            0x20..=0x2F => {
                self.collect(byte);
                self.state = ParserState::CsiIntermediate;
            }
            0x40..=0x7E => self.csi_dispatch(byte),
            c0::DEL => {}
            _ => self.csi_abort("non-ASCII byte in CSI"),
        }
    }

    fn csi_param(&mut self, byte: u8) {
        if self.interrupt(byte) {
            return;
        }
        match byte {
            0x00..=0x1F => self.execute(byte),
            b'0'..=b'9' => self.params.push_digit(byte),
            b';' | b':' => self.param_separator(),
            0x3C..=0x3F => self.csi_abort("misplaced private marker"),
            0x20..=0x2F => {
                self.collect(byte);
                if self.state == ParserState::CsiParam {
                    self.state = ParserState::CsiIntermediate;
                }
            }
            0x40..=0x7E => self.csi_dispatch(byte),
            c0::DEL => {}
            _ => self.csi_abort("non-ASCII byte in CSI"),
        }
    }

    fn csi_intermediate(&mut self, byte: u8) {
        if self.interrupt(byte) {
            return;
        }
        match byte {
            0x00..=0x1F => self.execute(byte),
            0x20..=0x2F => self.collect(byte),
            0x30..=0x3F => self.csi_abort("parameter after intermediate"),
            0x40..=0x7E => self.csi_dispatch(byte),
            c0::DEL => {}
            _ => self.csi_abort("non-ASCII byte in CSI"),
        }
    }

    /// Ignored sequences end at their final byte; any other control ends
    /// them early.
    fn csi_ignore(&mut self, byte: u8) {
        match byte {
            c0::CAN | c0::SUB => self.state = ParserState::Ground,
            c0::ESC => self.enter(ParserState::Escape),
            0x00..=0x1F => {
                self.execute(byte);
                self.state = ParserState::Ground;
            }
            0x40..=0x7E => self.state = ParserState::Ground,
            0x80..=0x9F => self.handle_c1(byte),
            _ => {}
        }
    }

    fn csi_abort(&mut self, reason: &str) {
        self.malformed(reason);
        self.state = ParserState::CsiIgnore;
    }

    fn param_separator(&mut self) {
        if self.params.separator() {
            self.state = ParserState::CsiParam;
        } else {
            self.csi_abort("too many parameters");
        }
    }

    fn collect(&mut self, byte: u8) {
        if self.intermediates.len() < MAX_INTERMEDIATES {
            self.intermediates.push(byte);
            return;
        }
        self.intermediates_overflowed = true;
        match self.state {
            ParserState::CsiEntry | ParserState::CsiParam | ParserState::CsiIntermediate => {
                self.csi_abort("too many intermediates")
            }
            ParserState::DcsEntry | ParserState::DcsParam | ParserState::DcsIntermediate => {
                self.malformed("too many intermediates");
                self.state = ParserState::DcsIgnore;
            }
            _ => {}
        }
    }

    fn esc_dispatch(&mut self, final_byte: u8) {
        self.state = ParserState::Ground;
        if self.intermediates_overflowed {
            self.malformed("too many intermediates");
            return;
        }
        let full_reset = final_byte == b'c' && self.intermediates.is_empty();
        dispatch::esc(&self.intermediates, final_byte, &mut self.pending);
        if full_reset {
            self.reset();
        }
    }

    fn csi_dispatch(&mut self, final_byte: u8) {
        self.state = ParserState::Ground;
        if !self.params.finish() {
            self.malformed("too many parameters");
            return;
        }
        dispatch::csi(
            &self.params,
            &self.intermediates,
            self.private,
            final_byte,
            &mut self.pending,
        );
    }

    /// Inside a string, 0x9C only terminates when it is not the
    /// continuation of a UTF-8 sequence in the payload.
    fn string_byte(&mut self, byte: u8) -> StringByte {
        if self.utf8.is_pending() {
            match self.utf8.feed(byte) {
                Utf8Result::Interrupted => {}
                _ => return StringByte::Data,
            }
        }
        match byte {
            c0::BEL => StringByte::Bell,
            c0::CAN | c0::SUB => StringByte::Cancel,
            c0::ESC => StringByte::Escape,
            c1::ST => StringByte::Terminator,
            0x00..=0x1F => StringByte::Control,
            0x80..=0xFF => {
                if byte <= 0x9F {
                    // Raw C1 inside a string: only ST is meaningful
                    return StringByte::Data;
                }
                self.utf8.feed(byte);
                StringByte::Data
            }
            _ => StringByte::Data,
        }
    }

    fn osc_string(&mut self, byte: u8) {
        match self.string_byte(byte) {
            StringByte::Data => {
                if self.osc.len() < self.max_osc_len {
                    self.osc.push(byte);
                } else if !self.osc_truncated {
                    self.osc_truncated = true;
                    tracing::debug!(limit = self.max_osc_len, "OSC payload truncated");
                }
            }
            StringByte::Bell | StringByte::Terminator => {
                self.osc_dispatch();
                self.state = ParserState::Ground;
            }
            StringByte::Escape => {
                // ESC \ is the normal terminator; the backslash is then
                // dispatched as a no-op escape.
                self.osc_dispatch();
                self.enter(ParserState::Escape);
            }
            StringByte::Cancel => {
                self.malformed("OSC cancelled");
                self.utf8.reset();
                self.enter(ParserState::Ground);
            }
            StringByte::Control => {}
        }
    }

    fn osc_dispatch(&mut self) {
        self.utf8.reset();
        dispatch::osc(&self.osc, &mut self.pending);
    }

    fn dcs_header(&mut self, byte: u8) {
        if self.interrupt(byte) {
            return;
        }
        match (self.state, byte) {
            (_, 0x00..=0x1F) | (_, c0::DEL) => {}
            (ParserState::DcsIntermediate, 0x30..=0x3F) => {
                self.malformed("parameter after intermediate");
                self.state = ParserState::DcsIgnore;
            }
            (ParserState::DcsEntry, 0x3C..=0x3F) => {
                self.private = Some(byte);
                self.state = ParserState::DcsParam;
            }
            (ParserState::DcsParam, 0x3C..=0x3F) => {
                self.malformed("misplaced private marker");
                self.state = ParserState::DcsIgnore;
            }
            (_, b'0'..=b'9') => {
                self.params.push_digit(byte);
                self.state = ParserState::DcsParam;
            }
            (_, b';' | b':') => {
                if self.params.separator() {
                    self.state = ParserState::DcsParam;
                } else {
                    self.malformed("too many parameters");
                    self.state = ParserState::DcsIgnore;
                }
            }
            (_, 0x20..=0x2F) => {
                self.collect(byte);
                if self.state != ParserState::DcsIgnore {
                    self.state = ParserState::DcsIntermediate;
                }
            }
            (_, 0x40..=0x7E) => {
                tracing::trace!(final_byte = %(byte as char), "DCS string dropped");
                self.state = ParserState::DcsPassthrough;
            }
            _ => {
                self.malformed("non-ASCII byte in DCS");
                self.state = ParserState::DcsIgnore;
            }
        }
    }

    /// DCS data and SOS/PM/APC strings are consumed without effect
    fn dropped_string(&mut self, byte: u8) {
        match self.string_byte(byte) {
            StringByte::Terminator => {
                self.utf8.reset();
                self.state = ParserState::Ground;
            }
            StringByte::Escape => {
                self.utf8.reset();
                self.enter(ParserState::Escape);
            }
            StringByte::Cancel => {
                self.malformed("string cancelled");
                self.utf8.reset();
                self.state = ParserState::Ground;
            }
            _ => {}
        }
    }
}

/// Classification of a byte inside a string payload
enum StringByte {
    Data,
    Bell,
    Cancel,
    Escape,
    Terminator,
    Control,
}

/// Lazy iterator of the actions produced by one [`Parser::feed`] call
pub struct Actions<'a> {
    parser: &'a mut Parser,
    bytes: &'a [u8],
    pos: usize,
}

impl Iterator for Actions<'_> {
    type Item = TerminalAction;

    fn next(&mut self) -> Option<TerminalAction> {
        loop {
            if let Some(action) = self.parser.pending.pop_front() {
                return Some(action);
            }
            let &byte = self.bytes.get(self.pos)?;
            self.pos += 1;
            self.parser.advance(byte);
        }
    }
}

impl Drop for Actions<'_> {
    fn drop(&mut self) {
        while let Some(&byte) = self.bytes.get(self.pos) {
            self.pos += 1;
            self.parser.advance(byte);
        }
    }
}
