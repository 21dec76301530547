//! shellterm
//!
//! A pseudo-terminal session manager with an embedded terminal-state
//! emulator. It spawns a shell behind a pty, parses its output into
//! structured terminal actions and keeps a screen model that any UI can
//! snapshot.
//!
//! - `parser`: VT/xterm escape sequence parser
//! - `core`: Screen model, cells, cursor, scrollback, selection, snapshots
//! - `pty`: pty creation and child spawning
//! - `session`: a running child with its reader and writer threads
//! - `controller`: session + parser + screen
//! - `app`: configuration and logging setup for the binaries

pub mod app;
pub mod controller;
pub mod core;
pub mod error;
pub mod parser;
pub mod pty;
pub mod session;

pub use controller::SessionController;
pub use error::{Error, Result};
pub use session::{PtySession, SessionEvent, SessionState};
