//! Terminal Core Module
//!
//! Platform-independent terminal state. This module contains:
//! - Screen model (primary and alternate screens)
//! - Cell representation with attributes
//! - Cursor state and character sets
//! - Scrollback buffer and selection
//! - Deterministic snapshot generation
//!
//! Given the same sequence of terminal actions, the screen always ends in
//! the same state.

mod cell;
mod charset;
mod cursor;
mod screen;
mod scrollback;
mod selection;
mod snapshot;

pub use cell::{Attributes, Cell, Color};
pub use charset::{Charset, CharsetState};
pub use cursor::{Cursor, SavedCursor};
pub use screen::{Modes, MouseMode, Screen};
pub use scrollback::{Line, Scrollback};
pub use selection::{Selection, SelectionPoint, SelectionType};
pub use snapshot::{
    CellSnapshot, ColorSnapshot, CursorSnapshot, ModesSnapshot, Snapshot, StyleSnapshot,
};
