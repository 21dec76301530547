//! Deterministic snapshot generation
//!
//! A snapshot is an owned copy of the visible terminal state in a
//! serializable format. Readers never see a half-applied chunk: the
//! controller takes snapshots between chunks. Given the same byte stream,
//! the screen produces identical snapshots.

use serde::{Deserialize, Serialize};

use super::cell::{Attributes, Cell, Color};
use super::cursor::Cursor;
use super::screen::{Modes, MouseMode, Screen};

/// A complete snapshot of the visible terminal state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Screen dimensions
    pub cols: usize,
    pub rows: usize,
    /// Visible grid content (row-major)
    pub grid: Vec<Vec<CellSnapshot>>,
    /// Which grid rows soft-wrapped into the next row
    pub wrapped: Vec<bool>,
    pub cursor: CursorSnapshot,
    /// Scroll region (inclusive)
    pub scroll_top: usize,
    pub scroll_bottom: usize,
    pub modes: ModesSnapshot,
    /// Window title
    pub title: String,
    /// Whether on alternate screen
    pub alternate_screen: bool,
    /// Scrollback line count
    pub scrollback_lines: usize,
}

/// Snapshot of a single cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellSnapshot {
    /// Character content
    pub ch: char,
    pub fg: ColorSnapshot,
    pub bg: ColorSnapshot,
    #[serde(default)]
    pub style: StyleSnapshot,
    /// Cell width (0 for continuation, 1 normal, 2 wide)
    pub width: u8,
}

/// Snapshot of a color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ColorSnapshot {
    Default,
    Indexed { index: u8 },
    Rgb { r: u8, g: u8, b: u8 },
}

/// Snapshot of style attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StyleSnapshot {
    #[serde(default, skip_serializing_if = "is_false")]
    pub bold: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub faint: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub italic: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub underline: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub blink: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub inverse: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub hidden: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub strikethrough: bool,
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// Snapshot of cursor state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorSnapshot {
    pub row: usize,
    pub col: usize,
    pub visible: bool,
    pub blinking: bool,
}

/// Snapshot of terminal modes
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ModesSnapshot {
    #[serde(default, skip_serializing_if = "is_false")]
    pub insert: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub linefeed_newline: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub application_cursor: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub application_keypad: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub reverse_video: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub origin: bool,
    #[serde(default)]
    pub autowrap: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub bracketed_paste: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub focus_reporting: bool,
    pub mouse_tracking: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub mouse_sgr: bool,
}

impl From<&Color> for ColorSnapshot {
    fn from(color: &Color) -> Self {
        match color {
            Color::Default => ColorSnapshot::Default,
            Color::Indexed(i) => ColorSnapshot::Indexed { index: *i },
            Color::Rgb(r, g, b) => ColorSnapshot::Rgb {
                r: *r,
                g: *g,
                b: *b,
            },
        }
    }
}

impl From<&Attributes> for StyleSnapshot {
    fn from(attrs: &Attributes) -> Self {
        StyleSnapshot {
            bold: attrs.bold,
            faint: attrs.faint,
            italic: attrs.italic,
            underline: attrs.underline,
            blink: attrs.blink,
            inverse: attrs.inverse,
            hidden: attrs.hidden,
            strikethrough: attrs.strikethrough,
        }
    }
}

impl From<&Cell> for CellSnapshot {
    fn from(cell: &Cell) -> Self {
        CellSnapshot {
            ch: cell.ch,
            fg: ColorSnapshot::from(&cell.fg),
            bg: ColorSnapshot::from(&cell.bg),
            style: StyleSnapshot::from(&cell.attrs),
            width: cell.width,
        }
    }
}

impl From<&Cursor> for CursorSnapshot {
    fn from(cursor: &Cursor) -> Self {
        CursorSnapshot {
            row: cursor.row,
            col: cursor.col,
            visible: cursor.visible,
            blinking: cursor.blinking,
        }
    }
}

impl From<&Modes> for ModesSnapshot {
    fn from(modes: &Modes) -> Self {
        ModesSnapshot {
            insert: modes.insert,
            linefeed_newline: modes.linefeed_newline,
            application_cursor: modes.application_cursor,
            application_keypad: modes.application_keypad,
            reverse_video: modes.reverse_video,
            origin: modes.origin,
            autowrap: modes.autowrap,
            bracketed_paste: modes.bracketed_paste,
            focus_reporting: modes.focus_reporting,
            mouse_tracking: match modes.mouse_tracking {
                MouseMode::None => "none".to_string(),
                MouseMode::Normal => "normal".to_string(),
                MouseMode::ButtonEvent => "button_event".to_string(),
                MouseMode::AnyEvent => "any_event".to_string(),
            },
            mouse_sgr: modes.mouse_sgr,
        }
    }
}

impl Snapshot {
    /// Create a snapshot from the current screen state
    pub fn from_screen(screen: &Screen) -> Self {
        let mut grid = Vec::with_capacity(screen.rows());
        let mut wrapped = Vec::with_capacity(screen.rows());

        for row in 0..screen.rows() {
            match screen.line(row) {
                Some(line) => {
                    grid.push(line.cells.iter().map(CellSnapshot::from).collect());
                    wrapped.push(line.wrapped);
                }
                None => {
                    grid.push(vec![CellSnapshot::from(&Cell::default()); screen.cols()]);
                    wrapped.push(false);
                }
            }
        }

        let (scroll_top, scroll_bottom) = screen.scroll_region();
        Snapshot {
            cols: screen.cols(),
            rows: screen.rows(),
            grid,
            wrapped,
            cursor: CursorSnapshot::from(screen.cursor()),
            scroll_top,
            scroll_bottom,
            modes: ModesSnapshot::from(screen.modes()),
            title: screen.title().to_string(),
            alternate_screen: screen.is_alternate_screen(),
            scrollback_lines: screen.scrollback().len(),
        }
    }

    /// Convert snapshot to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parse snapshot from JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Text of one row without trailing spaces
    pub fn row_text(&self, row: usize) -> String {
        let Some(cells) = self.grid.get(row) else {
            return String::new();
        };
        let text: String = cells
            .iter()
            .filter(|c| c.width != 0)
            .map(|c| c.ch)
            .collect();
        text.trim_end().to_string()
    }

    /// Plain text of the whole screen, one line per row, trailing blank
    /// rows removed
    pub fn to_text(&self) -> String {
        let mut result = String::new();

        for row in 0..self.grid.len() {
            result.push_str(&self.row_text(row));
            result.push('\n');
        }

        while result.ends_with("\n\n") {
            result.pop();
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::TerminalAction;

    fn print(screen: &mut Screen, text: &str) {
        for c in text.chars() {
            screen.apply(TerminalAction::Print(c));
        }
    }

    #[test]
    fn test_snapshot_from_screen() {
        let mut screen = Screen::new(10, 3);
        print(&mut screen, "Hi");

        let snapshot = screen.snapshot();

        assert_eq!(snapshot.cols, 10);
        assert_eq!(snapshot.rows, 3);
        assert_eq!(snapshot.grid.len(), 3);
        assert!(snapshot.grid.iter().all(|row| row.len() == 10));
        assert_eq!(snapshot.grid[0][0].ch, 'H');
        assert_eq!(snapshot.grid[0][1].ch, 'i');
        assert_eq!(snapshot.cursor.col, 2);
        assert_eq!(snapshot.cursor.row, 0);
    }

    #[test]
    fn test_snapshot_to_text() {
        let mut screen = Screen::new(10, 3);
        print(&mut screen, "AB");
        screen.apply(TerminalAction::CarriageReturn);
        screen.apply(TerminalAction::LineFeed);
        print(&mut screen, "C");

        assert_eq!(screen.snapshot().to_text(), "AB\nC\n");
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut screen = Screen::new(5, 1);
        print(&mut screen, "a");
        let before = screen.snapshot();
        print(&mut screen, "b");
        assert_eq!(before.row_text(0), "a");
        assert_eq!(screen.snapshot().row_text(0), "ab");
    }

    #[test]
    fn test_snapshot_json() {
        let mut screen = Screen::new(5, 2);
        screen.apply(TerminalAction::SetTitle("t".into()));
        print(&mut screen, "X");

        let snapshot = screen.snapshot();
        let json = snapshot.to_json().unwrap();
        assert!(json.contains("\"title\": \"t\""));
        assert_eq!(Snapshot::from_json(&json).unwrap(), snapshot);
    }

    #[test]
    fn test_color_snapshot() {
        assert_eq!(ColorSnapshot::from(&Color::Default), ColorSnapshot::Default);
        assert_eq!(
            ColorSnapshot::from(&Color::Indexed(5)),
            ColorSnapshot::Indexed { index: 5 }
        );
        assert_eq!(
            ColorSnapshot::from(&Color::Rgb(255, 128, 0)),
            ColorSnapshot::Rgb {
                r: 255,
                g: 128,
                b: 0
            }
        );
    }

    #[test]
    fn test_style_snapshot_skips_false() {
        let attrs = Attributes {
            bold: true,
            ..Default::default()
        };
        let json = serde_json::to_string(&StyleSnapshot::from(&attrs)).unwrap();
        assert_eq!(json, r#"{"bold":true}"#);
    }
}
