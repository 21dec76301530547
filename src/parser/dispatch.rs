//! Translation of complete sequences into [`TerminalAction`]s.
//!
//! The state machine hands over a finished ESC, CSI or OSC sequence; the
//! functions here decide what it means. Sequences without a known meaning
//! are dropped.

use std::collections::VecDeque;

use super::action::{CursorMotion, EraseRegion, Mode, SgrAttribute, StatusReport, TerminalAction};
use super::params::Params;
use crate::core::{Charset, Color};

type Out = VecDeque<TerminalAction>;

/// Dispatch an ESC sequence
pub fn esc(intermediates: &[u8], final_byte: u8, out: &mut Out) {
    let action = match (intermediates, final_byte) {
        ([], b'7') => TerminalAction::SaveCursor,
        ([], b'8') => TerminalAction::RestoreCursor,
        ([], b'D') => TerminalAction::Index,
        ([], b'E') => TerminalAction::NextLine,
        ([], b'H') => TerminalAction::SetTabStop,
        ([], b'M') => TerminalAction::ReverseIndex,
        ([], b'Z') => TerminalAction::DeviceAttributes { secondary: false },
        ([], b'c') => TerminalAction::FullReset,
        ([], b'=') => TerminalAction::SetMode {
            mode: Mode::ApplicationKeypad,
            enabled: true,
        },
        ([], b'>') => TerminalAction::SetMode {
            mode: Mode::ApplicationKeypad,
            enabled: false,
        },
        // String terminator left over from ESC \
        ([], b'\\') => return,
        ([b'#'], b'8') => TerminalAction::AlignmentTest,
        ([slot @ (b'(' | b')' | b'*' | b'+')], _) => match Charset::from_designator(final_byte) {
            Some(charset) => TerminalAction::DesignateCharset {
                slot: slot - b'(',
                charset,
            },
            None => {
                tracing::trace!(final_byte = %(final_byte as char), "Unsupported charset");
                return;
            }
        },
        _ => {
            tracing::trace!(
                ?intermediates,
                final_byte = %(final_byte as char),
                "Unknown ESC sequence"
            );
            return;
        }
    };
    out.push_back(action);
}

/// Dispatch a CSI sequence
pub fn csi(
    params: &Params,
    intermediates: &[u8],
    private: Option<u8>,
    final_byte: u8,
    out: &mut Out,
) {
    match (private, intermediates) {
        (None, []) => csi_standard(params, final_byte, out),
        (Some(b'?'), []) => csi_dec(params, final_byte, out),
        (Some(b'>'), []) if final_byte == b'c' => {
            if params.get_or(0, 0) == 0 {
                out.push_back(TerminalAction::DeviceAttributes { secondary: true });
            }
        }
        (None, [b'!']) if final_byte == b'p' => out.push_back(TerminalAction::SoftReset),
        _ => unknown_csi(params, intermediates, private, final_byte),
    }
}

fn unknown_csi(params: &Params, intermediates: &[u8], private: Option<u8>, final_byte: u8) {
    tracing::trace!(
        ?params,
        ?intermediates,
        private = ?private.map(char::from),
        final_byte = %(final_byte as char),
        "Unknown CSI sequence"
    );
}

fn csi_standard(params: &Params, final_byte: u8, out: &mut Out) {
    let n = params.get_nonzero_or(0, 1);
    let motion = |m: CursorMotion| TerminalAction::MoveCursor(m);

    let action = match final_byte {
        b'@' => TerminalAction::InsertChars(n),
        b'A' => motion(CursorMotion::Up(n)),
        b'B' | b'e' => motion(CursorMotion::Down(n)),
        b'C' | b'a' => motion(CursorMotion::Forward(n)),
        b'D' => motion(CursorMotion::Backward(n)),
        b'E' => motion(CursorMotion::NextLine(n)),
        b'F' => motion(CursorMotion::PrevLine(n)),
        b'G' | b'`' => motion(CursorMotion::ToCol(n - 1)),
        b'd' => motion(CursorMotion::ToRow(n - 1)),
        b'H' | b'f' => motion(CursorMotion::To {
            row: n - 1,
            col: params.get_nonzero_or(1, 1) - 1,
        }),
        b'I' => TerminalAction::TabForward(n),
        b'Z' => TerminalAction::TabBackward(n),
        b'J' => match erase_display(params.get_or(0, 0)) {
            Some(region) => TerminalAction::Erase(region),
            None => return unknown_csi(params, &[], None, final_byte),
        },
        b'K' => match erase_line(params.get_or(0, 0)) {
            Some(region) => TerminalAction::Erase(region),
            None => return unknown_csi(params, &[], None, final_byte),
        },
        b'X' => TerminalAction::Erase(EraseRegion::Chars(n)),
        b'L' => TerminalAction::InsertLines(n),
        b'M' => TerminalAction::DeleteLines(n),
        b'P' => TerminalAction::DeleteChars(n),
        b'S' => TerminalAction::ScrollUp(n),
        // CSI T with several parameters is the mouse highlight request
        b'T' if params.len() <= 1 => TerminalAction::ScrollDown(n),
        b'b' => TerminalAction::RepeatLast(n),
        b'c' if params.get_or(0, 0) == 0 => TerminalAction::DeviceAttributes { secondary: false },
        b'g' => match params.get_or(0, 0) {
            0 => TerminalAction::ClearTabStop { all: false },
            3 => TerminalAction::ClearTabStop { all: true },
            _ => return,
        },
        b'h' | b'l' => {
            let enabled = final_byte == b'h';
            for code in params.iter() {
                match Mode::from_ansi(code) {
                    Some(mode) => out.push_back(TerminalAction::SetMode { mode, enabled }),
                    None => tracing::debug!(code, enabled, "Unsupported ANSI mode"),
                }
            }
            return;
        }
        b'm' => return sgr(params, out),
        b'n' => match params.get_or(0, 0) {
            5 => TerminalAction::DeviceStatus(StatusReport::Operating),
            6 => TerminalAction::DeviceStatus(StatusReport::CursorPosition),
            _ => return unknown_csi(params, &[], None, final_byte),
        },
        b'r' => {
            let top = params.get_nonzero_or(0, 1) - 1;
            let bottom = match params.get(1) {
                Some(0) | None => None,
                Some(b) => Some(b - 1),
            };
            TerminalAction::SetScrollRegion { top, bottom }
        }
        b's' => TerminalAction::SaveCursor,
        b'u' => TerminalAction::RestoreCursor,
        b't' if params.get_or(0, 0) == 8 => TerminalAction::Resize {
            rows: params.get_or(1, 0),
            cols: params.get_or(2, 0),
        },
        _ => return unknown_csi(params, &[], None, final_byte),
    };
    out.push_back(action);
}

fn csi_dec(params: &Params, final_byte: u8, out: &mut Out) {
    match final_byte {
        b'h' | b'l' => {
            let enabled = final_byte == b'h';
            for code in params.iter() {
                match Mode::from_dec(code) {
                    Some(mode) => out.push_back(TerminalAction::SetMode { mode, enabled }),
                    None => tracing::debug!(code, enabled, "Unsupported DEC private mode"),
                }
            }
        }
        // DECSED / DECSEL: no protected cells, so same as ED / EL
        b'J' => {
            if let Some(region) = erase_display(params.get_or(0, 0)) {
                out.push_back(TerminalAction::Erase(region));
            }
        }
        b'K' => {
            if let Some(region) = erase_line(params.get_or(0, 0)) {
                out.push_back(TerminalAction::Erase(region));
            }
        }
        b'n' if params.get_or(0, 0) == 6 => {
            out.push_back(TerminalAction::DeviceStatus(StatusReport::CursorPosition));
        }
        _ => unknown_csi(params, &[], Some(b'?'), final_byte),
    }
}

fn erase_display(mode: u16) -> Option<EraseRegion> {
    match mode {
        0 => Some(EraseRegion::ToEndOfScreen),
        1 => Some(EraseRegion::ToStartOfScreen),
        2 => Some(EraseRegion::Screen),
        3 => Some(EraseRegion::Scrollback),
        _ => None,
    }
}

fn erase_line(mode: u16) -> Option<EraseRegion> {
    match mode {
        0 => Some(EraseRegion::ToEndOfLine),
        1 => Some(EraseRegion::ToStartOfLine),
        2 => Some(EraseRegion::Line),
        _ => None,
    }
}

/// Expand an SGR sequence into one action per attribute
fn sgr(params: &Params, out: &mut Out) {
    if params.is_empty() {
        out.push_back(TerminalAction::SetAttribute(SgrAttribute::Reset));
        return;
    }

    let values = params.as_slice();
    let mut i = 0;
    while i < values.len() {
        let attr = match values[i] {
            0 => SgrAttribute::Reset,
            1 => SgrAttribute::Bold,
            2 => SgrAttribute::Faint,
            3 => SgrAttribute::Italic,
            4 | 21 => SgrAttribute::Underline,
            5 | 6 => SgrAttribute::Blink,
            7 => SgrAttribute::Inverse,
            8 => SgrAttribute::Hidden,
            9 => SgrAttribute::Strikethrough,
            22 => SgrAttribute::NormalIntensity,
            23 => SgrAttribute::NotItalic,
            24 => SgrAttribute::NotUnderlined,
            25 => SgrAttribute::NotBlinking,
            27 => SgrAttribute::NotInverse,
            28 => SgrAttribute::NotHidden,
            29 => SgrAttribute::NotStrikethrough,
            n @ 30..=37 => SgrAttribute::Foreground(Color::Indexed((n - 30) as u8)),
            39 => SgrAttribute::Foreground(Color::Default),
            n @ 40..=47 => SgrAttribute::Background(Color::Indexed((n - 40) as u8)),
            49 => SgrAttribute::Background(Color::Default),
            n @ 90..=97 => SgrAttribute::Foreground(Color::Indexed((n - 90 + 8) as u8)),
            n @ 100..=107 => SgrAttribute::Background(Color::Indexed((n - 100 + 8) as u8)),
            code @ (38 | 48) => {
                let Some((color, used)) = extended_color(&values[i + 1..]) else {
                    tracing::trace!(?params, "Incomplete extended color");
                    return;
                };
                i += used;
                if code == 38 {
                    SgrAttribute::Foreground(color)
                } else {
                    SgrAttribute::Background(color)
                }
            }
            code => {
                tracing::trace!(code, "Unsupported SGR attribute");
                i += 1;
                continue;
            }
        };
        out.push_back(TerminalAction::SetAttribute(attr));
        i += 1;
    }
}

/// Parse `5;n` or `2;r;g;b`, returning the color and the number of
/// parameters consumed
fn extended_color(rest: &[u16]) -> Option<(Color, usize)> {
    let channel = |v: u16| v.min(255) as u8;
    match rest {
        [5, n, ..] => Some((Color::Indexed(channel(*n)), 2)),
        [2, r, g, b, ..] => Some((Color::Rgb(channel(*r), channel(*g), channel(*b)), 4)),
        _ => None,
    }
}

/// Dispatch an OSC payload
pub fn osc(payload: &[u8], out: &mut Out) {
    let (command, text) = match payload.iter().position(|&b| b == b';') {
        Some(idx) => (&payload[..idx], &payload[idx + 1..]),
        None => (payload, &[][..]),
    };

    match command {
        b"0" | b"2" => {
            let title = String::from_utf8_lossy(text).into_owned();
            out.push_back(TerminalAction::SetTitle(title));
        }
        // Icon name
        b"1" => {}
        _ => tracing::debug!(
            command = %String::from_utf8_lossy(command),
            len = text.len(),
            "Unhandled OSC"
        ),
    }
}
