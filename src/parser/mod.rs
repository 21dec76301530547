//! Terminal escape sequence parser
//!
//! A stateful parser that converts bytes into terminal actions.
//! Based on the VT500-series parser model from <https://vt100.net/emu/dec_ansi_parser>
//!
//! The parser never fails. Malformed input is dropped and the machine
//! returns to the ground state; [`Parser::malformed_count`] records how
//! often that happened.

mod action;
mod dispatch;
mod params;
mod state;
mod utf8;

pub use action::{
    c0, c1, CursorMotion, EraseRegion, Mode, SgrAttribute, StatusReport, TerminalAction,
};
pub use params::{Params, MAX_PARAMS};
pub use state::{Actions, Parser, ParserState, MAX_INTERMEDIATES, MAX_OSC_LEN};
pub use utf8::{Utf8Decoder, Utf8Result, REPLACEMENT};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Color;

    fn parse(input: &[u8]) -> Vec<TerminalAction> {
        Parser::new().parse_collect(input)
    }

    fn print(s: &str) -> Vec<TerminalAction> {
        s.chars().map(TerminalAction::Print).collect()
    }

    #[test]
    fn test_plain_text() {
        assert_eq!(parse(b"Hello"), print("Hello"));
    }

    #[test]
    fn test_c0_controls() {
        assert_eq!(
            parse(b"a\r\n\x07\x08\t"),
            vec![
                TerminalAction::Print('a'),
                TerminalAction::CarriageReturn,
                TerminalAction::LineFeed,
                TerminalAction::Bell,
                TerminalAction::Backspace,
                TerminalAction::Tab,
            ]
        );
    }

    #[test]
    fn test_csi_cursor_position() {
        assert_eq!(
            parse(b"\x1b[5;10H"),
            vec![TerminalAction::MoveCursor(CursorMotion::To { row: 4, col: 9 })]
        );
        assert_eq!(
            parse(b"\x9b3A"),
            vec![TerminalAction::MoveCursor(CursorMotion::Up(3))]
        );
    }

    #[test]
    fn test_sgr_sequence() {
        assert_eq!(
            parse(b"\x1b[1;38;2;255;128;0m"),
            vec![
                TerminalAction::SetAttribute(SgrAttribute::Bold),
                TerminalAction::SetAttribute(SgrAttribute::Foreground(Color::Rgb(255, 128, 0))),
            ]
        );
    }

    #[test]
    fn test_split_across_feeds() {
        let mut parser = Parser::new();
        assert!(parser.parse_collect(b"\x1b[3").is_empty());
        assert_eq!(parser.state(), ParserState::CsiParam);
        assert!(parser.parse_collect(b"1").is_empty());
        assert_eq!(
            parser.parse_collect(b"mX"),
            vec![
                TerminalAction::SetAttribute(SgrAttribute::Foreground(Color::Indexed(1))),
                TerminalAction::Print('X'),
            ]
        );
    }

    #[test]
    fn test_utf8_split_across_feeds() {
        let mut parser = Parser::new();
        let bytes = "日本".as_bytes();
        assert!(parser.parse_collect(&bytes[..2]).is_empty());
        assert_eq!(parser.parse_collect(&bytes[2..]), print("日本"));
    }

    #[test]
    fn test_invalid_utf8_reprocesses_byte() {
        let mut parser = Parser::new();
        assert_eq!(
            parser.parse_collect(b"\xe4A"),
            vec![TerminalAction::Print(REPLACEMENT), TerminalAction::Print('A')]
        );
        assert_eq!(parser.malformed_count(), 1);
        assert_eq!(
            parser.parse_collect(b"\xe4\x1b[2J"),
            vec![
                TerminalAction::Print(REPLACEMENT),
                TerminalAction::Erase(EraseRegion::Screen)
            ]
        );
    }

    #[test]
    fn test_c1_inside_utf8_is_continuation() {
        // U+011C is C4 9C: the 0x9C must not act as ST or anything else
        assert_eq!(parse("Ĝ".as_bytes()), print("Ĝ"));
    }

    #[test]
    fn test_osc_title_terminators() {
        let expected = vec![TerminalAction::SetTitle("title".to_string())];
        assert_eq!(parse(b"\x1b]0;title\x07"), expected);
        assert_eq!(parse(b"\x1b]2;title\x1b\\"), expected);
        assert_eq!(parse(b"\x1b]2;title\x9c"), expected);
    }

    #[test]
    fn test_osc_utf8_title() {
        // "Ĝ" ends in 0x9C, which must stay part of the payload
        assert_eq!(
            parse("\x1b]2;Ĝx\x07".as_bytes()),
            vec![TerminalAction::SetTitle("Ĝx".to_string())]
        );
    }

    #[test]
    fn test_osc_truncated() {
        let mut parser = Parser::new();
        parser.set_max_osc_len(8);
        assert_eq!(
            parser.parse_collect(b"\x1b]2;abcdefghij\x07"),
            vec![TerminalAction::SetTitle("abcdef".to_string())]
        );
    }

    #[test]
    fn test_dcs_and_apc_dropped() {
        assert_eq!(parse(b"\x1bPq#0;2;0;0;0\x1b\\ok"), print("ok"));
        assert_eq!(parse(b"\x1b_payload\x9cok"), print("ok"));
        assert_eq!(parse(b"\x1bXsos\x1b\\ok"), print("ok"));
    }

    #[test]
    fn test_param_overflow_ignored() {
        let mut parser = Parser::new();
        let mut seq = b"\x1b[".to_vec();
        for _ in 0..40 {
            seq.extend_from_slice(b"1;");
        }
        seq.extend_from_slice(b"mZ");
        assert_eq!(parser.parse_collect(&seq), print("Z"));
        assert_eq!(parser.state(), ParserState::Ground);
        assert!(parser.malformed_count() >= 1);
    }

    #[test]
    fn test_misplaced_private_marker() {
        assert_eq!(parse(b"\x1b[1?25hA"), print("A"));
    }

    #[test]
    fn test_ignore_ends_on_control() {
        let mut parser = Parser::new();
        assert!(parser.parse_collect(b"\x1b[1?").is_empty());
        assert_eq!(parser.state(), ParserState::CsiIgnore);
        assert_eq!(parser.parse_collect(b"\n"), vec![TerminalAction::LineFeed]);
        assert_eq!(parser.state(), ParserState::Ground);
    }

    #[test]
    fn test_cancel_aborts_sequence() {
        let mut parser = Parser::new();
        assert_eq!(parser.parse_collect(b"\x1b[31\x18m"), print("m"));
        assert_eq!(parser.malformed_count(), 1);
    }

    #[test]
    fn test_esc_interrupts_csi() {
        assert_eq!(
            parse(b"\x1b[12\x1b[2K"),
            vec![TerminalAction::Erase(EraseRegion::Line)]
        );
    }

    #[test]
    fn test_full_reset_resets_parser() {
        let mut parser = Parser::new();
        let actions = parser.parse_collect(b"\x1bc");
        assert_eq!(actions, vec![TerminalAction::FullReset]);
        assert_eq!(parser.state(), ParserState::Ground);
    }

    #[test]
    fn test_controls_inside_csi_execute() {
        assert_eq!(
            parse(b"\x1b[2\rC"),
            vec![
                TerminalAction::CarriageReturn,
                TerminalAction::MoveCursor(CursorMotion::Forward(2)),
            ]
        );
    }

    #[test]
    fn test_soft_reset_and_secondary_da() {
        assert_eq!(parse(b"\x1b[!p"), vec![TerminalAction::SoftReset]);
        assert_eq!(
            parse(b"\x1b[>c"),
            vec![TerminalAction::DeviceAttributes { secondary: true }]
        );
    }

    #[test]
    fn test_lazy_iterator_dropped_early() {
        let mut parser = Parser::new();
        let first = parser.feed(b"abc").next();
        assert_eq!(first, Some(TerminalAction::Print('a')));
        // The rest of the chunk was consumed and is handed out first
        assert_eq!(parser.parse_collect(b"d"), print("bcd"));
    }

    #[test]
    fn test_callback_parse() {
        let mut parser = Parser::new();
        let mut count = 0;
        parser.parse(b"\x1b[?1049hxy", |_| count += 1);
        assert_eq!(count, 3);
    }
}
