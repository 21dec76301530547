//! Cursor state management
//!
//! The cursor tracks position, visibility, and the pen used for new
//! characters. It also supports save/restore operations (DECSC/DECRC and
//! CSI s/u).

use serde::{Deserialize, Serialize};

use super::{Attributes, CharsetState, Color};

/// Cursor state including position, visibility, and current pen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    /// Row position (0-indexed)
    pub row: usize,
    /// Column position (0-indexed)
    pub col: usize,
    /// Whether the cursor is visible (DECTCEM)
    pub visible: bool,
    /// Whether cursor is blinking
    pub blinking: bool,
    /// Pending wrap - cursor is at the right margin, next char will wrap
    pub pending_wrap: bool,
    /// Current text attributes (applied to new characters)
    pub attrs: Attributes,
    /// Current foreground color
    pub fg: Color,
    /// Current background color
    pub bg: Color,
}

impl Default for Cursor {
    fn default() -> Self {
        Self {
            row: 0,
            col: 0,
            visible: true,
            blinking: true,
            pending_wrap: false,
            attrs: Attributes::default(),
            fg: Color::Default,
            bg: Color::Default,
        }
    }
}

impl Cursor {
    /// Create a new cursor at the home position
    pub fn new() -> Self {
        Self::default()
    }

    /// Move cursor to absolute position, clamping to bounds
    pub fn move_to(&mut self, row: usize, col: usize, rows: usize, cols: usize) {
        self.row = row.min(rows.saturating_sub(1));
        self.col = col.min(cols.saturating_sub(1));
        self.pending_wrap = false;
    }

    /// Move cursor up by n rows, stopping at the top margin `min_row`.
    /// A cursor already above the margin stops at row 0.
    pub fn move_up(&mut self, n: usize, min_row: usize) {
        let min_row = if self.row >= min_row { min_row } else { 0 };
        self.row = self.row.saturating_sub(n).max(min_row);
        self.pending_wrap = false;
    }

    /// Move cursor down by n rows, stopping at the bottom margin `max_row`.
    /// A cursor already below the margin stops at the last row.
    pub fn move_down(&mut self, n: usize, max_row: usize, rows: usize) {
        let max_row = if self.row <= max_row {
            max_row
        } else {
            rows.saturating_sub(1)
        };
        self.row = self.row.saturating_add(n).min(max_row);
        self.pending_wrap = false;
    }

    /// Move cursor left by n columns, stopping at column 0
    pub fn move_left(&mut self, n: usize) {
        self.col = self.col.saturating_sub(n);
        self.pending_wrap = false;
    }

    /// Move cursor right by n columns, stopping at the last column
    pub fn move_right(&mut self, n: usize, cols: usize) {
        self.col = self.col.saturating_add(n).min(cols.saturating_sub(1));
        self.pending_wrap = false;
    }

    /// Reset the pen to default colors and attributes
    pub fn reset_pen(&mut self) {
        self.attrs.reset();
        self.fg = Color::Default;
        self.bg = Color::Default;
    }

    /// Clamp the position after the grid shrank
    pub fn clamp(&mut self, rows: usize, cols: usize) {
        self.row = self.row.min(rows.saturating_sub(1));
        self.col = self.col.min(cols.saturating_sub(1));
        self.pending_wrap = false;
    }
}

/// Saved cursor state for DECSC/DECRC
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedCursor {
    pub row: usize,
    pub col: usize,
    pub pending_wrap: bool,
    pub attrs: Attributes,
    pub fg: Color,
    pub bg: Color,
    pub origin_mode: bool,
    pub autowrap: bool,
    pub charsets: CharsetState,
}

impl Default for SavedCursor {
    fn default() -> Self {
        Self {
            row: 0,
            col: 0,
            pending_wrap: false,
            attrs: Attributes::default(),
            fg: Color::Default,
            bg: Color::Default,
            origin_mode: false,
            autowrap: true,
            charsets: CharsetState::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_to_clamps() {
        let mut cursor = Cursor::new();
        cursor.move_to(100, 200, 24, 80);
        assert_eq!((cursor.row, cursor.col), (23, 79));
    }

    #[test]
    fn test_relative_moves_stop_at_margins() {
        let mut cursor = Cursor::new();
        cursor.move_to(10, 10, 24, 80);
        cursor.move_up(20, 5);
        assert_eq!(cursor.row, 5);
        cursor.move_down(50, 15, 24);
        assert_eq!(cursor.row, 15);
        cursor.move_left(50);
        assert_eq!(cursor.col, 0);
        cursor.move_right(500, 80);
        assert_eq!(cursor.col, 79);
    }

    #[test]
    fn test_move_up_outside_region() {
        // Above the top margin the cursor can still reach row 0
        let mut cursor = Cursor::new();
        cursor.move_to(2, 0, 24, 80);
        cursor.move_up(5, 4);
        assert_eq!(cursor.row, 0);
    }

    #[test]
    fn test_moves_clear_pending_wrap() {
        let mut cursor = Cursor::new();
        cursor.pending_wrap = true;
        cursor.move_left(1);
        assert!(!cursor.pending_wrap);
    }
}
