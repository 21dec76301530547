//! Text selection over the visible grid and scrollback
//!
//! Rows are addressed relative to the top of the visible screen: row 0 is
//! the first visible row and negative rows reach into the scrollback
//! (-1 is the newest scrollback line).

use serde::{Deserialize, Serialize};

/// A position in the terminal grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionPoint {
    /// Row index (0-based, negative for scrollback)
    pub row: i32,
    /// Column index (0-based)
    pub col: usize,
}

impl SelectionPoint {
    pub fn new(row: i32, col: usize) -> Self {
        Self { row, col }
    }

    /// Check if this point is before another point
    pub fn is_before(&self, other: &SelectionPoint) -> bool {
        (self.row, self.col) < (other.row, other.col)
    }
}

/// Selection type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SelectionType {
    /// Character-level selection
    #[default]
    Normal,
    /// Whole lines
    Line,
    /// Rectangular block
    Block,
}

/// Represents a text selection in the terminal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    /// Where the selection was started
    anchor: SelectionPoint,
    /// Current end point
    head: SelectionPoint,
    selection_type: SelectionType,
}

impl Selection {
    /// Create a new selection starting at the given point
    pub fn new(anchor: SelectionPoint, selection_type: SelectionType) -> Self {
        Self {
            anchor,
            head: anchor,
            selection_type,
        }
    }

    /// Move the end point of the selection
    pub fn update(&mut self, head: SelectionPoint) {
        self.head = head;
    }

    pub fn selection_type(&self) -> SelectionType {
        self.selection_type
    }

    /// Get the normalized start and end points (start is always before end)
    pub fn normalized(&self) -> (SelectionPoint, SelectionPoint) {
        if self.head.is_before(&self.anchor) {
            (self.head, self.anchor)
        } else {
            (self.anchor, self.head)
        }
    }

    /// Shift the selection up by `lines` rows after content scrolled
    pub fn scroll(&mut self, lines: i32) {
        self.anchor.row -= lines;
        self.head.row -= lines;
    }

    /// Check if a cell at (row, col) is within the selection
    pub fn contains(&self, row: i32, col: usize, cols: usize) -> bool {
        self.col_range(row, cols)
            .is_some_and(|(start, end)| col >= start && col <= end)
    }

    /// Get the range of rows covered by the selection
    pub fn row_range(&self) -> (i32, i32) {
        let (start, end) = self.normalized();
        (start.row, end.row)
    }

    /// Get the inclusive column range selected on a specific row
    pub fn col_range(&self, row: i32, cols: usize) -> Option<(usize, usize)> {
        let (start, end) = self.normalized();
        if row < start.row || row > end.row {
            return None;
        }
        let last = cols.saturating_sub(1);

        let range = match self.selection_type {
            SelectionType::Normal => {
                let from = if row == start.row { start.col } else { 0 };
                let to = if row == end.row { end.col } else { last };
                (from, to)
            }
            SelectionType::Line => (0, last),
            SelectionType::Block => (start.col.min(end.col), start.col.max(end.col)),
        };
        Some((range.0.min(last), range.1.min(last)))
    }
}
