//! Golden tests for the parser and screen model
//!
//! Each test feeds a byte stream through a fresh parser into a screen and
//! checks the resulting state.

use shellterm::core::{Color, Screen, SelectionPoint, SelectionType};
use shellterm::parser::Parser;

fn run(cols: usize, rows: usize, input: &[u8]) -> Screen {
    let mut screen = Screen::new(cols, rows);
    let mut parser = Parser::new();
    for action in parser.feed(input) {
        screen.apply(action);
    }
    screen
}

#[test]
fn test_cursor_movement() {
    // Hello[3C]World[2D]XX[H][2J][5;10H]Positioned
    let screen = run(80, 24, b"Hello\x1b[3CWorld\x1b[2DXX\x1b[H\x1b[2J\x1b[5;10HPositioned");

    assert_eq!(screen.row_text(0), "");
    assert_eq!(screen.row_text(4), "         Positioned");
    assert_eq!(screen.cursor().row, 4);
    assert_eq!(screen.cursor().col, 19);
}

#[test]
fn test_cup_then_print_touches_one_cell() {
    let screen = run(80, 24, b"\x1b[5;10HX");
    let snapshot = screen.snapshot();
    for (r, row) in snapshot.grid.iter().enumerate() {
        for (c, cell) in row.iter().enumerate() {
            let expected = if (r, c) == (4, 9) { 'X' } else { ' ' };
            assert_eq!(cell.ch, expected, "cell ({}, {})", r, c);
        }
    }
}

#[test]
fn test_basic_colors() {
    let screen = run(80, 24, b"\x1b[31mRed\x1b[0m \x1b[32mGreen\x1b[0m \x1b[34mBlue\x1b[0m");

    assert_eq!(screen.row_text(0), "Red Green Blue");
    assert_eq!(screen.cell(0, 0).unwrap().fg, Color::RED);
    assert_eq!(screen.cell(0, 3).unwrap().fg, Color::Default);
    assert_eq!(screen.cell(0, 4).unwrap().fg, Color::GREEN);
    assert_eq!(screen.cell(0, 10).unwrap().fg, Color::BLUE);
}

#[test]
fn test_256_and_truecolor() {
    let screen = run(80, 24, b"\x1b[38;5;196mA\x1b[48;2;10;20;30mB\x1b[0m");

    assert_eq!(screen.cell(0, 0).unwrap().fg, Color::Indexed(196));
    assert_eq!(screen.cell(0, 1).unwrap().bg, Color::Rgb(10, 20, 30));
}

#[test]
fn test_bright_and_attributes() {
    let screen = run(80, 24, b"\x1b[1;4;7;92mX\x1b[22;24;27mY");
    let x = screen.cell(0, 0).unwrap();
    assert!(x.attrs.bold && x.attrs.underline && x.attrs.inverse);
    assert_eq!(x.fg, Color::BRIGHT_GREEN);
    let y = screen.cell(0, 1).unwrap();
    assert!(!y.attrs.bold && !y.attrs.underline && !y.attrs.inverse);
    assert_eq!(y.fg, Color::BRIGHT_GREEN);
}

#[test]
fn test_line_wrapping() {
    let screen = run(10, 5, b"0123456789ABCDE");

    assert_eq!(screen.row_text(0), "0123456789");
    assert_eq!(screen.row_text(1), "ABCDE");
    assert_eq!((screen.cursor().row, screen.cursor().col), (1, 5));
}

#[test]
fn test_newline_and_carriage_return() {
    let screen = run(80, 24, b"Line1\r\nLine2\r\nLine3");

    assert_eq!(screen.row_text(0), "Line1");
    assert_eq!(screen.row_text(1), "Line2");
    assert_eq!(screen.row_text(2), "Line3");
}

#[test]
fn test_bare_linefeed_keeps_column() {
    let screen = run(80, 24, b"ab\ncd");
    assert_eq!(screen.row_text(1), "  cd");
}

#[test]
fn test_erase_to_end_of_line() {
    let screen = run(80, 24, b"Hello World\x1b[6G\x1b[K");
    assert_eq!(screen.row_text(0), "Hello");
}

#[test]
fn test_insert_chars() {
    let screen = run(80, 24, b"ABCDEF\x1b[3G\x1b[2@XY");
    assert_eq!(screen.row_text(0), "ABXYCDEF");
}

#[test]
fn test_delete_chars() {
    let screen = run(80, 24, b"ABCDEF\x1b[2G\x1b[2P");
    assert_eq!(screen.row_text(0), "ADEF");
}

#[test]
fn test_chunk_boundary_parsing() {
    let mut screen = Screen::new(80, 24);
    let mut parser = Parser::new();

    // Split a CSI sequence and a UTF-8 character across chunks
    for chunk in [&b"\x1b["[..], b"31", b"mR\xc3", b"\xa9d"] {
        for action in parser.feed(chunk) {
            screen.apply(action);
        }
    }

    assert_eq!(screen.row_text(0), "Réd");
    assert_eq!(screen.cell(0, 0).unwrap().fg, Color::RED);
}

#[test]
fn test_alternate_screen() {
    let mut screen = Screen::new(20, 5);
    let mut parser = Parser::new();
    let mut feed = |screen: &mut Screen, bytes: &[u8]| {
        for action in parser.feed(bytes) {
            screen.apply(action);
        }
    };

    feed(&mut screen, b"Main screen");
    feed(&mut screen, b"\x1b[?1049h");
    assert!(screen.is_alternate_screen());
    assert_eq!(screen.row_text(0), "");

    feed(&mut screen, b"\x1b[HFull screen app");
    assert_eq!(screen.row_text(0), "Full screen app");

    feed(&mut screen, b"\x1b[?1049l");
    assert!(!screen.is_alternate_screen());
    assert_eq!(screen.row_text(0), "Main screen");
}

#[test]
fn test_scroll_region() {
    let screen = run(10, 5, b"1\r\n2\r\n3\r\n4\r\n5\x1b[2;4r\x1b[4;1H\n");

    assert_eq!(screen.row_text(0), "1");
    assert_eq!(screen.row_text(1), "3");
    assert_eq!(screen.row_text(2), "4");
    assert_eq!(screen.row_text(3), "");
    assert_eq!(screen.row_text(4), "5");
    assert!(screen.scrollback().is_empty());
}

#[test]
fn test_scroll_up_down_sequences() {
    let screen = run(10, 3, b"a\r\nb\r\nc\x1b[S");
    assert_eq!(screen.row_text(0), "b");
    assert_eq!(screen.row_text(2), "");
    assert_eq!(screen.scrollback().len(), 1);

    let screen = run(10, 3, b"a\r\nb\r\nc\x1b[T");
    assert_eq!(screen.row_text(0), "");
    assert_eq!(screen.row_text(1), "a");
}

#[test]
fn test_save_restore_cursor() {
    let screen = run(80, 24, b"\x1b[5;5H\x1b7\x1b[10;10H\x1b8X");
    assert_eq!(screen.cell(4, 4).unwrap().ch, 'X');

    let screen = run(80, 24, b"\x1b[3;3H\x1b[s\x1b[H\x1b[uY");
    assert_eq!(screen.cell(2, 2).unwrap().ch, 'Y');
}

#[test]
fn test_insert_lines() {
    let screen = run(10, 4, b"A\r\nB\r\nC\x1b[2;1H\x1b[L");
    assert_eq!(screen.row_text(0), "A");
    assert_eq!(screen.row_text(1), "");
    assert_eq!(screen.row_text(2), "B");
    assert_eq!(screen.row_text(3), "C");
}

#[test]
fn test_delete_lines() {
    let screen = run(10, 4, b"A\r\nB\r\nC\r\nD\x1b[2;1H\x1b[M");
    assert_eq!(screen.row_text(1), "C");
    assert_eq!(screen.row_text(2), "D");
    assert_eq!(screen.row_text(3), "");
}

#[test]
fn test_erase_display_below_and_above() {
    let screen = run(5, 3, b"aaaaa\r\nbbbbb\r\nccccc\x1b[2;3H\x1b[J");
    assert_eq!(screen.row_text(0), "aaaaa");
    assert_eq!(screen.row_text(1), "bb");
    assert_eq!(screen.row_text(2), "");

    let screen = run(5, 3, b"aaaaa\r\nbbbbb\r\nccccc\x1b[2;3H\x1b[1J");
    assert_eq!(screen.row_text(0), "");
    assert_eq!(screen.row_text(1), "   bb");
    assert_eq!(screen.row_text(2), "ccccc");
}

#[test]
fn test_dec_line_drawing_box() {
    let screen = run(10, 3, b"\x1b(0lqk\r\nx x\r\nmqj\x1b(B");
    assert_eq!(screen.row_text(0), "┌─┐");
    assert_eq!(screen.row_text(1), "│ │");
    assert_eq!(screen.row_text(2), "└─┘");
}

#[test]
fn test_osc_title_both_terminators() {
    let screen = run(10, 2, b"\x1b]0;first\x07\x1b]2;second\x1b\\");
    assert_eq!(screen.title(), "second");
}

#[test]
fn test_dcs_is_swallowed() {
    let screen = run(20, 2, b"a\x1bPq#0;2;0;0;0#0~~\x1b\\b");
    assert_eq!(screen.row_text(0), "ab");
}

#[test]
fn test_resize_then_snapshot_shape() {
    let mut screen = run(10, 4, b"one\r\ntwo\r\nthree\r\nfour");
    screen.resize(6, 2);

    let snapshot = screen.snapshot();
    assert_eq!((snapshot.cols, snapshot.rows), (6, 2));
    assert_eq!(snapshot.grid.len(), 2);
    assert!(snapshot.grid.iter().all(|row| row.len() == 6));
    assert_eq!(snapshot.row_text(0), "one");
    assert_eq!(snapshot.row_text(1), "two");

    let overflow: Vec<String> = screen.scrollback_range(0, 10).iter().map(|l| l.text()).collect();
    assert_eq!(overflow, vec!["three", "four"]);
}

#[test]
fn test_selection_across_wrapped_line() {
    let mut screen = run(5, 3, b"helloworld\r\nnext");
    screen.start_selection(SelectionPoint::new(0, 0), SelectionType::Normal);
    screen.update_selection(SelectionPoint::new(2, 3));
    assert_eq!(screen.selected_text().as_deref(), Some("helloworld\nnext"));
}

#[test]
fn test_device_status_reply() {
    let mut screen = run(80, 24, b"\x1b[12;40H\x1b[6n");
    assert_eq!(screen.take_responses(), b"\x1b[12;40R".to_vec());
}

#[test]
fn test_snapshot_text_output() {
    let screen = run(20, 4, b"a\r\n\r\nb");
    assert_eq!(screen.snapshot().to_text(), "a\n\nb\n");
}
