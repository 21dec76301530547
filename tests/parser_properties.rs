//! Property tests for the parser and screen model

use proptest::prelude::*;

use shellterm::core::Screen;
use shellterm::parser::{Parser, ParserState, TerminalAction};

fn printable_text() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(prop_oneof![Just(b'\r'), Just(b'\n'), 0x20u8..0x7F], 0..400)
}

proptest! {
    #[test]
    fn chunking_does_not_change_actions(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
        let mut whole = Parser::new();
        let expected = whole.parse_collect(&bytes);

        let mut split = Parser::new();
        let mut actual = Vec::new();
        for byte in &bytes {
            actual.extend(split.feed(std::slice::from_ref(byte)));
        }

        prop_assert_eq!(actual, expected);
        prop_assert_eq!(split.state(), whole.state());
    }

    #[test]
    fn cancel_returns_to_ground(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
        let mut parser = Parser::new();
        let _ = parser.parse_collect(&bytes);
        let _ = parser.parse_collect(&[0x18]);
        prop_assert_eq!(parser.state(), ParserState::Ground);

        // Plain text after the cancel prints as-is
        let actions = parser.parse_collect(b"ok");
        prop_assert_eq!(actions, vec![TerminalAction::Print('o'), TerminalAction::Print('k')]);
    }

    #[test]
    fn controls_are_never_printed(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
        let mut parser = Parser::new();
        for action in parser.feed(&bytes) {
            if let TerminalAction::Print(c) = action {
                prop_assert!(!c.is_ascii_control(), "printed control {:?}", c);
            }
        }
    }

    #[test]
    fn arbitrary_input_keeps_cursor_in_bounds(
        bytes in prop::collection::vec(any::<u8>(), 0..512),
        cols in 1usize..40,
        rows in 1usize..20,
    ) {
        let mut screen = Screen::new(cols, rows);
        let mut parser = Parser::new();
        for action in parser.feed(&bytes) {
            screen.apply(action);
        }
        prop_assert!(screen.cursor().row < screen.rows());
        prop_assert!(screen.cursor().col < screen.cols());
    }

    #[test]
    fn resize_shape_and_top_left(
        text in printable_text(),
        cols in 1usize..60,
        rows in 1usize..30,
        new_cols in 0usize..60,
        new_rows in 0usize..30,
    ) {
        let mut screen = Screen::new(cols, rows);
        let mut parser = Parser::new();
        for action in parser.feed(&text) {
            screen.apply(action);
        }
        let before = screen.snapshot();

        screen.resize(new_cols, new_rows);
        let after = screen.snapshot();

        prop_assert_eq!(after.cols, new_cols.max(1));
        prop_assert_eq!(after.rows, new_rows.max(1));
        prop_assert_eq!(after.grid.len(), after.rows);
        prop_assert!(after.grid.iter().all(|row| row.len() == after.cols));
        prop_assert!(after.cursor.row < after.rows && after.cursor.col < after.cols);

        for r in 0..before.rows.min(after.rows) {
            for c in 0..before.cols.min(after.cols) {
                prop_assert_eq!(after.grid[r][c].ch, before.grid[r][c].ch, "cell ({}, {})", r, c);
            }
        }
    }
}
