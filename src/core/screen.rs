//! Screen model implementation
//!
//! The screen represents the visible terminal grid plus state like scroll
//! regions, tab stops, and mode flags. It supports both primary and alternate
//! screen buffers. The screen is mutated only through [`Screen::apply`] and
//! [`Screen::resize`]; every out of range request is clamped.

use std::iter;

use serde::{Deserialize, Serialize};
use unicode_width::UnicodeWidthChar;

use super::cell::{Cell, Color};
use super::charset::CharsetState;
use super::cursor::{Cursor, SavedCursor};
use super::scrollback::{Line, Scrollback};
use super::selection::{Selection, SelectionPoint, SelectionType};
use super::snapshot::Snapshot;
use crate::parser::{CursorMotion, EraseRegion, Mode, SgrAttribute, StatusReport, TerminalAction};

/// Terminal mode flags
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modes {
    /// Insert mode (IRM)
    pub insert: bool,
    /// Line feed/new line mode (LNM)
    pub linefeed_newline: bool,
    /// Application cursor keys (DECCKM)
    pub application_cursor: bool,
    /// Application keypad mode (DECKPAM/DECKPNM)
    pub application_keypad: bool,
    /// Reverse video mode (DECSCNM)
    pub reverse_video: bool,
    /// Origin mode (DECOM) - cursor addressing relative to scroll region
    pub origin: bool,
    /// Autowrap mode (DECAWM)
    pub autowrap: bool,
    /// Bracketed paste mode (xterm)
    pub bracketed_paste: bool,
    /// Focus reporting mode
    pub focus_reporting: bool,
    /// Mouse tracking mode
    pub mouse_tracking: MouseMode,
    /// SGR mouse encoding (?1006)
    pub mouse_sgr: bool,
}

impl Default for Modes {
    fn default() -> Self {
        Self {
            insert: false,
            linefeed_newline: false,
            application_cursor: false,
            application_keypad: false,
            reverse_video: false,
            origin: false,
            autowrap: true,
            bracketed_paste: false,
            focus_reporting: false,
            mouse_tracking: MouseMode::None,
            mouse_sgr: false,
        }
    }
}

/// Mouse tracking mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MouseMode {
    /// No mouse tracking
    #[default]
    None,
    /// VT200 normal tracking (button press and release)
    Normal,
    /// Button-event tracking (motion while button pressed)
    ButtonEvent,
    /// Any-event tracking (all motion)
    AnyEvent,
}

/// Primary device attributes: VT100 with advanced video option
const DA1_RESPONSE: &[u8] = b"\x1b[?1;2c";
/// Secondary device attributes: VT220, firmware 10, ROM 1
const DA2_RESPONSE: &[u8] = b"\x1b[>0;10;1c";

/// Bound on a single REP so one sequence cannot stall the emulator
const MAX_REPEAT: usize = 65_535;

/// The main screen structure
#[derive(Debug, Clone)]
pub struct Screen {
    cols: usize,
    rows: usize,
    primary: Vec<Line>,
    alternate: Vec<Line>,
    on_alternate: bool,
    /// Scrollback buffer (only for primary screen)
    scrollback: Scrollback,
    cursor: Cursor,
    /// Saved cursor per screen: index 0 primary, 1 alternate
    saved: [SavedCursor; 2],
    /// Scroll region (0-indexed, inclusive)
    scroll_top: usize,
    scroll_bottom: usize,
    tab_stops: Vec<bool>,
    modes: Modes,
    charsets: CharsetState,
    /// Window title (set via OSC 0/2)
    title: String,
    /// Last printed character, for REP
    last_printed: Option<char>,
    bell_count: u64,
    /// Replies to device queries, waiting to be written to the pty
    responses: Vec<u8>,
    selection: Option<Selection>,
}

impl Screen {
    /// Create a new screen with an unbounded scrollback
    pub fn new(cols: usize, rows: usize) -> Self {
        Self::with_scrollback_limit(cols, rows, None)
    }

    /// Create a new screen keeping at most `limit` scrollback lines
    pub fn with_scrollback_limit(cols: usize, rows: usize, limit: Option<usize>) -> Self {
        let cols = cols.max(1);
        let rows = rows.max(1);

        Self {
            cols,
            rows,
            primary: (0..rows).map(|_| Line::new(cols)).collect(),
            alternate: (0..rows).map(|_| Line::new(cols)).collect(),
            on_alternate: false,
            scrollback: Scrollback::with_limit(limit),
            cursor: Cursor::new(),
            saved: [SavedCursor::default(), SavedCursor::default()],
            scroll_top: 0,
            scroll_bottom: rows - 1,
            tab_stops: default_tab_stops(cols),
            modes: Modes::default(),
            charsets: CharsetState::new(),
            title: String::new(),
            last_printed: None,
            bell_count: 0,
            responses: Vec::new(),
            selection: None,
        }
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    pub fn modes(&self) -> &Modes {
        &self.modes
    }

    pub fn charsets(&self) -> &CharsetState {
        &self.charsets
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Number of BEL characters received
    pub fn bell_count(&self) -> u64 {
        self.bell_count
    }

    pub fn is_alternate_screen(&self) -> bool {
        self.on_alternate
    }

    /// Scroll region as an inclusive (top, bottom) pair
    pub fn scroll_region(&self) -> (usize, usize) {
        (self.scroll_top, self.scroll_bottom)
    }

    pub fn scrollback(&self) -> &Scrollback {
        &self.scrollback
    }

    /// Copies of the scrollback lines in `start..end` (0 = oldest)
    pub fn scrollback_range(&self, start: usize, end: usize) -> Vec<Line> {
        self.scrollback.range(start, end).cloned().collect()
    }

    pub fn is_tab_stop(&self, col: usize) -> bool {
        self.tab_stops.get(col).copied().unwrap_or(false)
    }

    /// Get a line of the visible grid
    pub fn line(&self, row: usize) -> Option<&Line> {
        self.grid().get(row)
    }

    /// Get a cell of the visible grid
    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.line(row).and_then(|line| line.get(col))
    }

    /// Text of a visible row, without trailing spaces
    pub fn row_text(&self, row: usize) -> String {
        self.line(row).map(Line::text).unwrap_or_default()
    }

    /// Owned copy of the visible state
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::from_screen(self)
    }

    /// Drain the replies produced by device queries
    pub fn take_responses(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.responses)
    }

    fn grid(&self) -> &Vec<Line> {
        if self.on_alternate {
            &self.alternate
        } else {
            &self.primary
        }
    }

    fn grid_mut(&mut self) -> &mut Vec<Line> {
        if self.on_alternate {
            &mut self.alternate
        } else {
            &mut self.primary
        }
    }

    fn blank_cell(&self) -> Cell {
        let mut cell = Cell::default();
        cell.bg = self.cursor.bg;
        cell
    }

    fn blank_line(&self) -> Line {
        Line::blank(self.cols, self.cursor.bg)
    }

    /// Apply one parsed action
    pub fn apply(&mut self, action: TerminalAction) {
        match action {
            TerminalAction::Print(c) => self.print(c),
            TerminalAction::Bell => self.bell_count += 1,
            TerminalAction::Backspace => self.backspace(),
            TerminalAction::Tab => self.tab_forward(1),
            TerminalAction::LineFeed => self.linefeed(),
            TerminalAction::CarriageReturn => self.carriage_return(),
            TerminalAction::ShiftOut => self.charsets.shift_out(),
            TerminalAction::ShiftIn => self.charsets.shift_in(),
            TerminalAction::Index => self.index(),
            TerminalAction::ReverseIndex => self.reverse_index(),
            TerminalAction::NextLine => {
                self.carriage_return();
                self.index();
            }
            TerminalAction::MoveCursor(motion) => self.move_cursor(motion),
            TerminalAction::Erase(region) => self.erase(region),
            TerminalAction::SetScrollRegion { top, bottom } => {
                self.set_scroll_region(top as usize, bottom.map(usize::from))
            }
            TerminalAction::SetAttribute(attr) => self.set_attribute(attr),
            TerminalAction::SetMode { mode, enabled } => self.set_mode(mode, enabled),
            TerminalAction::ScrollUp(n) => self.scroll_up(n as usize),
            TerminalAction::ScrollDown(n) => self.scroll_down(n as usize),
            TerminalAction::InsertLines(n) => self.insert_lines(n as usize),
            TerminalAction::DeleteLines(n) => self.delete_lines(n as usize),
            TerminalAction::InsertChars(n) => self.insert_chars(n as usize),
            TerminalAction::DeleteChars(n) => self.delete_chars(n as usize),
            TerminalAction::RepeatLast(n) => self.repeat_last(n as usize),
            TerminalAction::SaveCursor => self.save_cursor(),
            TerminalAction::RestoreCursor => self.restore_cursor(),
            TerminalAction::SetTabStop => self.set_tab_stop(),
            TerminalAction::ClearTabStop { all } => self.clear_tab_stop(all),
            TerminalAction::TabForward(n) => self.tab_forward(n as usize),
            TerminalAction::TabBackward(n) => self.tab_backward(n as usize),
            TerminalAction::DesignateCharset { slot, charset } => {
                self.charsets.designate(slot, charset)
            }
            TerminalAction::SetTitle(title) => self.title = title,
            TerminalAction::DeviceStatus(report) => self.report_status(report),
            TerminalAction::DeviceAttributes { secondary } => {
                let reply = if secondary { DA2_RESPONSE } else { DA1_RESPONSE };
                self.responses.extend_from_slice(reply);
            }
            TerminalAction::SoftReset => self.soft_reset(),
            TerminalAction::FullReset => self.reset(),
            TerminalAction::AlignmentTest => self.alignment_test(),
            // Window size changes belong to whoever owns the pty
            TerminalAction::Resize { cols, rows } => {
                tracing::trace!(cols, rows, "Resize request left to the session owner");
            }
        }
    }

    /// Print a character at the current cursor position
    pub fn print(&mut self, c: char) {
        let c = self.charsets.map(c);
        let width = match c.width() {
            Some(w) if w > 0 => w.min(2),
            // Zero-width and combining characters are not stored
            _ => return,
        };
        if width > self.cols {
            return;
        }

        if self.cursor.pending_wrap && self.modes.autowrap {
            self.wrap();
        }

        if width == 2 && self.cursor.col + 1 >= self.cols {
            if self.modes.autowrap {
                let (row, col) = (self.cursor.row, self.cursor.col);
                let blank = self.blank_cell();
                self.grid_mut()[row].cells[col] = blank;
                self.wrap();
            } else {
                self.cursor.col = self.cols - 2;
            }
        }

        let (row, col) = (self.cursor.row, self.cursor.col);
        if self.modes.insert {
            self.shift_right(row, col, width);
        }

        let cell = Cell {
            ch: c,
            fg: self.cursor.fg,
            bg: self.cursor.bg,
            attrs: self.cursor.attrs,
            width: width as u8,
        };
        self.clear_wide_overlap(row, col, width);
        let line = &mut self.grid_mut()[row];
        line.cells[col] = cell;
        if width == 2 {
            line.cells[col + 1] = Cell {
                ch: ' ',
                width: 0,
                ..cell
            };
        }

        let next = col + width;
        if next >= self.cols {
            self.cursor.col = self.cols - 1;
            self.cursor.pending_wrap = self.modes.autowrap;
        } else {
            self.cursor.col = next;
        }
        self.last_printed = Some(c);
    }

    /// Blank the other half of any wide character about to be split by a
    /// write of `width` cells at `col`
    fn clear_wide_overlap(&mut self, row: usize, col: usize, width: usize) {
        let cols = self.cols;
        let blank = self.blank_cell();
        let line = &mut self.grid_mut()[row];
        if col > 0 && line.cells[col].is_wide_continuation() {
            line.cells[col - 1] = blank;
        }
        let end = col + width - 1;
        if line.cells[end].is_wide() && end + 1 < cols {
            line.cells[end + 1] = blank;
        }
    }

    fn repeat_last(&mut self, n: usize) {
        if let Some(c) = self.last_printed {
            for _ in 0..n.min(MAX_REPEAT) {
                // Already translated through the charset when first printed
                let saved = self.charsets;
                self.charsets.reset();
                self.print(c);
                self.charsets = saved;
            }
        }
    }

    /// Move to the start of the next line after a soft wrap
    fn wrap(&mut self) {
        let row = self.cursor.row;
        self.grid_mut()[row].wrapped = true;
        self.cursor.col = 0;
        self.cursor.pending_wrap = false;
        self.index();
    }

    /// Handle linefeed (LF)
    pub fn linefeed(&mut self) {
        self.index();
        // In linefeed mode, LF also does CR
        if self.modes.linefeed_newline {
            self.cursor.col = 0;
        }
    }

    /// Handle index (IND) - move cursor down, scroll if at bottom
    pub fn index(&mut self) {
        self.cursor.pending_wrap = false;
        if self.cursor.row == self.scroll_bottom {
            self.scroll_up(1);
        } else if self.cursor.row + 1 < self.rows {
            self.cursor.row += 1;
        }
    }

    /// Handle reverse index (RI) - move cursor up, scroll if at top
    pub fn reverse_index(&mut self) {
        self.cursor.pending_wrap = false;
        if self.cursor.row == self.scroll_top {
            self.scroll_down(1);
        } else if self.cursor.row > 0 {
            self.cursor.row -= 1;
        }
    }

    pub fn carriage_return(&mut self) {
        self.cursor.col = 0;
        self.cursor.pending_wrap = false;
    }

    pub fn backspace(&mut self) {
        self.cursor.move_left(1);
    }

    fn tab_forward(&mut self, n: usize) {
        for _ in 0..n {
            let next = (self.cursor.col + 1..self.cols).find(|&c| self.tab_stops[c]);
            self.cursor.col = next.unwrap_or(self.cols - 1);
        }
        self.cursor.pending_wrap = false;
    }

    fn tab_backward(&mut self, n: usize) {
        for _ in 0..n {
            let prev = (0..self.cursor.col).rev().find(|&c| self.tab_stops[c]);
            self.cursor.col = prev.unwrap_or(0);
        }
        self.cursor.pending_wrap = false;
    }

    fn set_tab_stop(&mut self) {
        let col = self.cursor.col;
        self.tab_stops[col] = true;
    }

    fn clear_tab_stop(&mut self, all: bool) {
        if all {
            self.tab_stops.iter_mut().for_each(|t| *t = false);
        } else {
            let col = self.cursor.col;
            self.tab_stops[col] = false;
        }
    }

    /// Rows reachable by absolute addressing, given origin mode
    fn addressable_rows(&self) -> (usize, usize) {
        if self.modes.origin {
            (self.scroll_top, self.scroll_bottom)
        } else {
            (0, self.rows - 1)
        }
    }

    fn move_cursor(&mut self, motion: CursorMotion) {
        let (first, last) = self.addressable_rows();
        match motion {
            CursorMotion::To { row, col } => {
                self.cursor.row = (first + row as usize).min(last);
                self.cursor.col = (col as usize).min(self.cols - 1);
                self.cursor.pending_wrap = false;
            }
            CursorMotion::ToRow(row) => {
                self.cursor.row = (first + row as usize).min(last);
                self.cursor.pending_wrap = false;
            }
            CursorMotion::ToCol(col) => {
                self.cursor.col = (col as usize).min(self.cols - 1);
                self.cursor.pending_wrap = false;
            }
            CursorMotion::Up(n) => self.cursor.move_up(n as usize, self.scroll_top),
            CursorMotion::Down(n) => {
                self.cursor.move_down(n as usize, self.scroll_bottom, self.rows)
            }
            CursorMotion::Forward(n) => self.cursor.move_right(n as usize, self.cols),
            CursorMotion::Backward(n) => self.cursor.move_left(n as usize),
            CursorMotion::NextLine(n) => {
                self.cursor.move_down(n as usize, self.scroll_bottom, self.rows);
                self.cursor.col = 0;
            }
            CursorMotion::PrevLine(n) => {
                self.cursor.move_up(n as usize, self.scroll_top);
                self.cursor.col = 0;
            }
        }
    }

    /// Erase cells `start..end` of a row with the current background
    fn erase_cells(&mut self, row: usize, start: usize, end: usize) {
        let end = end.min(self.cols);
        if start >= end {
            return;
        }
        let bg = self.cursor.bg;
        let cols = self.cols;
        let line = &mut self.grid_mut()[row];
        // Erasing half of a wide character erases all of it
        if start > 0 && line.cells[start].is_wide_continuation() {
            line.cells[start - 1].erase(bg);
        }
        if end < cols && line.cells[end].is_wide_continuation() {
            line.cells[end].erase(bg);
        }
        for cell in &mut line.cells[start..end] {
            cell.erase(bg);
        }
    }

    fn erase_rows(&mut self, start: usize, end: usize) {
        for row in start..end.min(self.rows) {
            self.erase_cells(row, 0, self.cols);
            self.grid_mut()[row].wrapped = false;
        }
    }

    fn erase(&mut self, region: EraseRegion) {
        let (row, col) = (self.cursor.row, self.cursor.col);
        match region {
            EraseRegion::ToEndOfLine => self.erase_cells(row, col, self.cols),
            EraseRegion::ToStartOfLine => self.erase_cells(row, 0, col + 1),
            EraseRegion::Line => self.erase_cells(row, 0, self.cols),
            EraseRegion::ToEndOfScreen => {
                self.erase_cells(row, col, self.cols);
                self.erase_rows(row + 1, self.rows);
            }
            EraseRegion::ToStartOfScreen => {
                self.erase_rows(0, row);
                self.erase_cells(row, 0, col + 1);
            }
            EraseRegion::Screen => {
                self.erase_rows(0, self.rows);
                self.clear_selection();
            }
            EraseRegion::Scrollback => {
                self.scrollback.clear();
                self.clear_selection();
            }
            EraseRegion::Chars(n) => self.erase_cells(row, col, col + n as usize),
        }
    }

    /// Set scroll region (DECSTBM). Invalid regions are ignored.
    pub fn set_scroll_region(&mut self, top: usize, bottom: Option<usize>) {
        let bottom = bottom.unwrap_or(self.rows - 1).min(self.rows - 1);
        if top >= bottom {
            tracing::trace!(top, bottom, "Ignoring empty scroll region");
            return;
        }
        self.scroll_top = top;
        self.scroll_bottom = bottom;
        self.home();
    }

    fn home(&mut self) {
        let (first, _) = self.addressable_rows();
        self.cursor.row = first;
        self.cursor.col = 0;
        self.cursor.pending_wrap = false;
    }

    /// Scroll the region up by n lines (content moves up, new lines at
    /// bottom). Lines leaving the top of the primary screen go to scrollback.
    pub fn scroll_up(&mut self, n: usize) {
        let (top, bottom) = (self.scroll_top, self.scroll_bottom);
        let n = n.min(bottom - top + 1);
        if n == 0 {
            return;
        }

        let blank = self.blank_line();
        let grid = self.grid_mut();
        let evicted: Vec<Line> = grid.drain(top..top + n).collect();
        let at = bottom + 1 - n;
        grid.splice(at..at, iter::repeat(blank).take(n));

        if top == 0 && !self.on_alternate {
            for line in evicted {
                self.scrollback.push(line);
            }
            self.selection_scrolled(n, bottom == self.rows - 1);
        } else {
            self.clear_selection_in(top, bottom);
        }
    }

    /// Scroll the region down by n lines (content moves down, new lines at top)
    pub fn scroll_down(&mut self, n: usize) {
        let (top, bottom) = (self.scroll_top, self.scroll_bottom);
        let n = n.min(bottom - top + 1);
        if n == 0 {
            return;
        }

        let blank = self.blank_line();
        let grid = self.grid_mut();
        grid.drain(bottom + 1 - n..=bottom);
        grid.splice(top..top, iter::repeat(blank).take(n));
        self.clear_selection_in(top, bottom);
    }

    /// Insert lines (IL) at the cursor, within the scroll region
    fn insert_lines(&mut self, n: usize) {
        let (row, bottom) = (self.cursor.row, self.scroll_bottom);
        if row < self.scroll_top || row > bottom {
            return;
        }
        let n = n.min(bottom - row + 1);
        let blank = self.blank_line();
        let grid = self.grid_mut();
        grid.drain(bottom + 1 - n..=bottom);
        grid.splice(row..row, iter::repeat(blank).take(n));
        self.carriage_return();
        self.clear_selection_in(row, bottom);
    }

    /// Delete lines (DL) at the cursor, within the scroll region
    fn delete_lines(&mut self, n: usize) {
        let (row, bottom) = (self.cursor.row, self.scroll_bottom);
        if row < self.scroll_top || row > bottom {
            return;
        }
        let n = n.min(bottom - row + 1);
        let blank = self.blank_line();
        let grid = self.grid_mut();
        grid.drain(row..row + n);
        let at = bottom + 1 - n;
        grid.splice(at..at, iter::repeat(blank).take(n));
        self.carriage_return();
        self.clear_selection_in(row, bottom);
    }

    /// Shift cells right from `col`, dropping cells pushed past the edge
    fn shift_right(&mut self, row: usize, col: usize, n: usize) {
        let cols = self.cols;
        let n = n.min(cols - col);
        let blank = self.blank_cell();
        let line = &mut self.grid_mut()[row];
        line.cells[col..].rotate_right(n);
        line.cells[col..col + n].fill(blank);
        if line.cells[cols - 1].is_wide() {
            line.cells[cols - 1] = blank;
        }
    }

    /// Insert blank characters (ICH)
    fn insert_chars(&mut self, n: usize) {
        let (row, col) = (self.cursor.row, self.cursor.col);
        self.clear_wide_overlap(row, col, 1);
        self.shift_right(row, col, n);
        self.cursor.pending_wrap = false;
    }

    /// Delete characters (DCH)
    fn delete_chars(&mut self, n: usize) {
        let (row, col) = (self.cursor.row, self.cursor.col);
        let cols = self.cols;
        let n = n.min(cols - col);
        self.clear_wide_overlap(row, col, 1);
        let blank = self.blank_cell();
        let line = &mut self.grid_mut()[row];
        line.cells[col..].rotate_left(n);
        line.cells[cols - n..].fill(blank);
        if line.cells[col].is_wide_continuation() {
            line.cells[col] = blank;
        }
        self.cursor.pending_wrap = false;
    }

    fn set_attribute(&mut self, attr: SgrAttribute) {
        let pen = &mut self.cursor;
        match attr {
            SgrAttribute::Reset => pen.reset_pen(),
            SgrAttribute::Bold => pen.attrs.bold = true,
            SgrAttribute::Faint => pen.attrs.faint = true,
            SgrAttribute::Italic => pen.attrs.italic = true,
            SgrAttribute::Underline => pen.attrs.underline = true,
            SgrAttribute::Blink => pen.attrs.blink = true,
            SgrAttribute::Inverse => pen.attrs.inverse = true,
            SgrAttribute::Hidden => pen.attrs.hidden = true,
            SgrAttribute::Strikethrough => pen.attrs.strikethrough = true,
            SgrAttribute::NormalIntensity => {
                pen.attrs.bold = false;
                pen.attrs.faint = false;
            }
            SgrAttribute::NotItalic => pen.attrs.italic = false,
            SgrAttribute::NotUnderlined => pen.attrs.underline = false,
            SgrAttribute::NotBlinking => pen.attrs.blink = false,
            SgrAttribute::NotInverse => pen.attrs.inverse = false,
            SgrAttribute::NotHidden => pen.attrs.hidden = false,
            SgrAttribute::NotStrikethrough => pen.attrs.strikethrough = false,
            SgrAttribute::Foreground(color) => pen.fg = color,
            SgrAttribute::Background(color) => pen.bg = color,
        }
    }

    fn set_mode(&mut self, mode: Mode, enabled: bool) {
        match mode {
            Mode::Insert => self.modes.insert = enabled,
            Mode::LineFeedNewLine => self.modes.linefeed_newline = enabled,
            Mode::ApplicationCursor => self.modes.application_cursor = enabled,
            Mode::ApplicationKeypad => self.modes.application_keypad = enabled,
            Mode::ReverseVideo => self.modes.reverse_video = enabled,
            Mode::Origin => {
                self.modes.origin = enabled;
                self.home();
            }
            Mode::AutoWrap => {
                self.modes.autowrap = enabled;
                if !enabled {
                    self.cursor.pending_wrap = false;
                }
            }
            Mode::CursorBlink => self.cursor.blinking = enabled,
            Mode::CursorVisible => self.cursor.visible = enabled,
            Mode::BracketedPaste => self.modes.bracketed_paste = enabled,
            Mode::FocusReporting => self.modes.focus_reporting = enabled,
            Mode::MouseSgr => self.modes.mouse_sgr = enabled,
            Mode::MouseNormal => self.set_mouse(MouseMode::Normal, enabled),
            Mode::MouseButtonEvent => self.set_mouse(MouseMode::ButtonEvent, enabled),
            Mode::MouseAnyEvent => self.set_mouse(MouseMode::AnyEvent, enabled),
            Mode::AlternateScreen => {
                if enabled {
                    self.enter_alternate();
                } else {
                    self.exit_alternate();
                }
            }
            Mode::SaveCursor => {
                if enabled {
                    self.save_cursor();
                } else {
                    self.restore_cursor();
                }
            }
            Mode::AlternateScreenSaveCursor => {
                if enabled {
                    if !self.on_alternate {
                        self.save_cursor();
                        self.enter_alternate();
                    }
                } else if self.on_alternate {
                    self.exit_alternate();
                    self.restore_cursor();
                }
            }
        }
    }

    fn set_mouse(&mut self, mode: MouseMode, enabled: bool) {
        if enabled {
            self.modes.mouse_tracking = mode;
        } else if self.modes.mouse_tracking == mode {
            self.modes.mouse_tracking = MouseMode::None;
        }
    }

    /// Switch to the alternate screen, which starts out blank
    fn enter_alternate(&mut self) {
        if self.on_alternate {
            return;
        }
        self.on_alternate = true;
        let rows = self.rows;
        self.erase_rows(0, rows);
        self.selection = None;
        tracing::debug!("Entered alternate screen");
    }

    fn exit_alternate(&mut self) {
        if !self.on_alternate {
            return;
        }
        self.on_alternate = false;
        self.selection = None;
        tracing::debug!("Left alternate screen");
    }

    /// Save cursor (DECSC)
    pub fn save_cursor(&mut self) {
        self.saved[self.on_alternate as usize] = SavedCursor {
            row: self.cursor.row,
            col: self.cursor.col,
            pending_wrap: self.cursor.pending_wrap,
            attrs: self.cursor.attrs,
            fg: self.cursor.fg,
            bg: self.cursor.bg,
            origin_mode: self.modes.origin,
            autowrap: self.modes.autowrap,
            charsets: self.charsets,
        };
    }

    /// Restore cursor (DECRC). Without a prior save the cursor goes home
    /// with default attributes.
    pub fn restore_cursor(&mut self) {
        let saved = self.saved[self.on_alternate as usize].clone();
        self.cursor.row = saved.row.min(self.rows - 1);
        self.cursor.col = saved.col.min(self.cols - 1);
        self.cursor.pending_wrap = saved.pending_wrap;
        self.cursor.attrs = saved.attrs;
        self.cursor.fg = saved.fg;
        self.cursor.bg = saved.bg;
        self.modes.origin = saved.origin_mode;
        self.modes.autowrap = saved.autowrap;
        self.charsets = saved.charsets;
    }

    fn report_status(&mut self, report: StatusReport) {
        match report {
            StatusReport::Operating => self.responses.extend_from_slice(b"\x1b[0n"),
            StatusReport::CursorPosition => {
                let (first, _) = self.addressable_rows();
                let row = self.cursor.row.saturating_sub(first) + 1;
                let col = self.cursor.col + 1;
                self.responses
                    .extend_from_slice(format!("\x1b[{};{}R", row, col).as_bytes());
            }
        }
    }

    /// Perform a soft terminal reset (DECSTR)
    pub fn soft_reset(&mut self) {
        self.cursor.reset_pen();
        self.cursor.visible = true;
        self.cursor.pending_wrap = false;
        self.modes.origin = false;
        self.modes.autowrap = true;
        self.modes.insert = false;
        self.modes.application_cursor = false;
        self.modes.application_keypad = false;
        self.modes.bracketed_paste = false;
        self.scroll_top = 0;
        self.scroll_bottom = self.rows - 1;
        self.charsets.reset();
        self.saved = [SavedCursor::default(), SavedCursor::default()];
        tracing::debug!("Soft reset performed");
    }

    /// Full reset (RIS). The scrollback and pending replies survive.
    pub fn reset(&mut self) {
        let scrollback = std::mem::take(&mut self.scrollback);
        let responses = std::mem::take(&mut self.responses);
        *self = Self::with_scrollback_limit(self.cols, self.rows, scrollback.limit());
        self.scrollback = scrollback;
        self.responses = responses;
        tracing::debug!("Full reset performed");
    }

    /// DEC screen alignment test (DECALN): fill the screen with 'E'
    fn alignment_test(&mut self) {
        let cols = self.cols;
        for line in self.grid_mut() {
            *line = Line {
                cells: vec![Cell::new('E'); cols],
                wrapped: false,
            };
        }
        self.scroll_top = 0;
        self.scroll_bottom = self.rows - 1;
        self.cursor.row = 0;
        self.cursor.col = 0;
        self.cursor.pending_wrap = false;
        self.clear_selection();
    }

    /// Resize the grid. Rows are kept top-aligned; rows below the new height
    /// move to the scrollback (primary screen only), and narrower widths
    /// truncate without rewrapping. Zero dimensions are treated as 1.
    pub fn resize(&mut self, cols: usize, rows: usize) {
        let cols = cols.max(1);
        let rows = rows.max(1);
        if cols == self.cols && rows == self.rows {
            return;
        }

        if rows < self.primary.len() {
            for line in self.primary.drain(rows..) {
                self.scrollback.push(line);
            }
        }
        self.alternate.truncate(rows);

        for grid in [&mut self.primary, &mut self.alternate] {
            grid.resize_with(rows, || Line::new(cols));
            for line in grid.iter_mut() {
                line.resize(cols);
            }
        }

        self.tab_stops.truncate(cols);
        let old_cols = self.tab_stops.len();
        self.tab_stops
            .extend((old_cols..cols).map(|c| c > 0 && c % 8 == 0));

        self.cols = cols;
        self.rows = rows;
        self.scroll_top = 0;
        self.scroll_bottom = rows - 1;
        self.cursor.clamp(rows, cols);
        for saved in &mut self.saved {
            saved.row = saved.row.min(rows - 1);
            saved.col = saved.col.min(cols - 1);
            saved.pending_wrap = false;
        }
        self.selection = None;
    }

    /// Begin a selection at `point`
    pub fn start_selection(&mut self, point: SelectionPoint, kind: SelectionType) {
        self.selection = Some(Selection::new(point, kind));
    }

    /// Extend the current selection to `point`
    pub fn update_selection(&mut self, point: SelectionPoint) {
        if let Some(selection) = &mut self.selection {
            selection.update(point);
        }
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    /// Text covered by the current selection. Rows are joined by newlines
    /// except where a row soft-wrapped into the next.
    pub fn selected_text(&self) -> Option<String> {
        let selection = self.selection.as_ref()?;
        let (first, last) = selection.row_range();
        let mut text = String::new();

        for row in first..=last {
            let Some(line) = self.selectable_line(row) else {
                continue;
            };
            let Some((start, end)) = selection.col_range(row, line.len().max(1)) else {
                continue;
            };
            let chunk = line.text_range(start, end + 1);
            if line.wrapped && row != last {
                text.push_str(&chunk);
            } else {
                text.push_str(chunk.trim_end());
                if row != last {
                    text.push('\n');
                }
            }
        }
        Some(text)
    }

    /// Line addressed by selection coordinates
    fn selectable_line(&self, row: i32) -> Option<&Line> {
        if row >= 0 {
            self.grid().get(row as usize)
        } else {
            self.scrollback.get_from_end((-row - 1) as usize)
        }
    }

    /// Scrolling `n` lines into the scrollback moves a full-screen selection
    /// along with the content; anything else invalidates it.
    fn selection_scrolled(&mut self, n: usize, full_screen: bool) {
        if full_screen {
            if let Some(selection) = &mut self.selection {
                selection.scroll(n as i32);
            }
        } else {
            self.selection = None;
        }
    }

    fn clear_selection_in(&mut self, top: usize, bottom: usize) {
        let touched = self.selection.as_ref().is_some_and(|s| {
            let (first, last) = s.row_range();
            first <= bottom as i32 && last >= top as i32
        });
        if touched {
            self.selection = None;
        }
    }
}

fn default_tab_stops(cols: usize) -> Vec<bool> {
    (0..cols).map(|c| c > 0 && c % 8 == 0).collect()
}
