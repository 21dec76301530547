//! Scrollback buffer implementation
//!
//! The scrollback buffer stores lines that have scrolled off the top of the
//! primary screen, oldest first. It is unbounded unless a limit is set, in
//! which case the oldest lines are discarded.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::cell::Cell;

/// A line in the terminal, consisting of cells and metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Line {
    /// The cells in this line
    pub cells: Vec<Cell>,
    /// Whether this line was soft-wrapped into the next one
    pub wrapped: bool,
}

impl Line {
    /// Create a new line with the given number of columns
    pub fn new(cols: usize) -> Self {
        Self {
            cells: vec![Cell::default(); cols],
            wrapped: false,
        }
    }

    /// Create a line of blank cells carrying a background color
    pub fn blank(cols: usize, bg: crate::core::Color) -> Self {
        let mut cell = Cell::default();
        cell.bg = bg;
        Self {
            cells: vec![cell; cols],
            wrapped: false,
        }
    }

    /// Resize the line to a new column count
    pub fn resize(&mut self, cols: usize) {
        if cols < self.cells.len() {
            self.cells.truncate(cols);
            // Do not leave half of a wide character behind
            if let Some(last) = self.cells.last_mut() {
                if last.is_wide() {
                    last.clear();
                }
            }
        } else {
            self.cells.resize(cols, Cell::default());
        }
    }

    /// Clear all cells in the line
    pub fn clear(&mut self) {
        for cell in &mut self.cells {
            cell.clear();
        }
        self.wrapped = false;
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(Cell::is_blank)
    }

    /// Get a cell at the given column
    pub fn get(&self, col: usize) -> Option<&Cell> {
        self.cells.get(col)
    }

    /// Extract the text of a column range, skipping wide continuations
    pub fn text_range(&self, start: usize, end: usize) -> String {
        let end = end.min(self.cells.len());
        self.cells
            .get(start.min(end)..end)
            .unwrap_or_default()
            .iter()
            .filter(|c| !c.is_wide_continuation())
            .map(|c| c.ch)
            .collect()
    }

    /// Extract text content from the line, without trailing spaces
    pub fn text(&self) -> String {
        self.text_range(0, self.cells.len()).trim_end().to_string()
    }
}

/// Buffer of lines evicted from the top of the screen
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scrollback {
    lines: VecDeque<Line>,
    /// Maximum number of lines to keep, `None` for unbounded
    limit: Option<usize>,
}

impl Scrollback {
    /// Create an unbounded scrollback buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a scrollback buffer that keeps at most `limit` lines
    pub fn with_limit(limit: Option<usize>) -> Self {
        Self {
            lines: VecDeque::new(),
            limit,
        }
    }

    /// Get the number of lines in the scrollback
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Change the limit, dropping the oldest lines if needed
    pub fn set_limit(&mut self, limit: Option<usize>) {
        self.limit = limit;
        self.enforce_limit();
    }

    /// Push a line to the scrollback (newest)
    pub fn push(&mut self, line: Line) {
        if self.limit == Some(0) {
            return;
        }
        self.lines.push_back(line);
        self.enforce_limit();
    }

    fn enforce_limit(&mut self) {
        if let Some(limit) = self.limit {
            while self.lines.len() > limit {
                self.lines.pop_front();
            }
        }
    }

    /// Get a line by index (0 = oldest)
    pub fn get(&self, index: usize) -> Option<&Line> {
        self.lines.get(index)
    }

    /// Get a line counting back from the newest (0 = newest)
    pub fn get_from_end(&self, index: usize) -> Option<&Line> {
        self.lines.len().checked_sub(index + 1).and_then(|i| self.lines.get(i))
    }

    /// Lines in `start..end` (0 = oldest), clamped to what exists
    pub fn range(&self, start: usize, end: usize) -> impl Iterator<Item = &Line> + '_ {
        let end = end.min(self.lines.len());
        let start = start.min(end);
        self.lines.range(start..end)
    }

    /// Iterate from oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &Line> + '_ {
        self.lines.iter()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}
