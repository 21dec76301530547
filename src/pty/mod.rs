//! PTY (Pseudoterminal) handling
//!
//! This module creates pseudoterminals, spawns the child process on the
//! slave side and exposes the master descriptor for I/O. Everything above
//! the raw descriptor (threads, event channel, teardown) lives in
//! [`crate::session`].

mod spawn;
#[cfg(unix)]
mod unix;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use spawn::{default_shell, SpawnConfig, DEFAULT_COLORTERM, DEFAULT_LANG, DEFAULT_TERM};
#[cfg(unix)]
pub use unix::{poll_readable, Pty};

/// Error type for PTY operations on a live pty
#[derive(Debug, thiserror::Error)]
pub enum PtyError {
    #[error("Failed to open PTY master: {0}")]
    OpenMaster(#[source] nix::Error),

    #[error("Failed to grant PTY access: {0}")]
    GrantPty(#[source] nix::Error),

    #[error("Failed to unlock PTY: {0}")]
    UnlockPty(#[source] nix::Error),

    #[error("Failed to get PTY slave name: {0}")]
    PtsName(#[source] nix::Error),

    #[error("Failed to fork: {0}")]
    Fork(#[source] nix::Error),

    #[error("Failed to create exec status pipe: {0}")]
    StatusPipe(#[source] std::io::Error),

    #[error("Failed to set window size: {0}")]
    SetWinsize(#[source] nix::Error),

    #[error("Failed to get window size: {0}")]
    GetWinsize(#[source] nix::Error),

    #[error("Failed to signal child: {0}")]
    Signal(#[source] nix::Error),

    #[error("Failed to poll: {0}")]
    Poll(#[source] nix::Error),

    #[error("Failed to wait for child: {0}")]
    Wait(#[source] nix::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for PTY operations
pub type PtyResult<T> = Result<T, PtyError>;

/// Why a child could not be launched
#[derive(Debug, thiserror::Error)]
pub enum SpawnError {
    #[error("executable not found")]
    NotFound,

    #[error("permission denied")]
    PermissionDenied,

    #[error("exec failed: {0}")]
    Exec(nix::Error),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Pty(#[from] PtyError),
}

impl SpawnError {
    /// Classify the errno reported by a failed exec in the child
    pub fn from_errno(errno: nix::Error) -> Self {
        match errno {
            nix::Error::ENOENT | nix::Error::ENOTDIR => SpawnError::NotFound,
            nix::Error::EACCES | nix::Error::EPERM => SpawnError::PermissionDenied,
            other => SpawnError::Exec(other),
        }
    }
}

/// Window size for PTY
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSize {
    pub rows: u16,
    pub cols: u16,
    #[serde(default)]
    pub pixel_width: u16,
    #[serde(default)]
    pub pixel_height: u16,
}

impl WindowSize {
    /// Create a new window size with just columns and rows.
    /// Zero dimensions are raised to 1.
    pub fn new(cols: u16, rows: u16) -> Self {
        Self {
            rows: rows.max(1),
            cols: cols.max(1),
            pixel_width: 0,
            pixel_height: 0,
        }
    }

    /// Create a new window size with pixel dimensions
    pub fn with_pixels(cols: u16, rows: u16, pixel_width: u16, pixel_height: u16) -> Self {
        Self {
            pixel_width,
            pixel_height,
            ..Self::new(cols, rows)
        }
    }
}

impl Default for WindowSize {
    fn default() -> Self {
        Self::new(80, 24)
    }
}

/// How a child process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitStatus {
    /// Normal exit with a status code
    Code(i32),
    /// Terminated by a signal
    Signal(i32),
}

impl ExitStatus {
    pub fn success(&self) -> bool {
        matches!(self, ExitStatus::Code(0))
    }

    pub fn code(&self) -> Option<i32> {
        match self {
            ExitStatus::Code(code) => Some(*code),
            ExitStatus::Signal(_) => None,
        }
    }

    pub fn signal(&self) -> Option<i32> {
        match self {
            ExitStatus::Signal(sig) => Some(*sig),
            ExitStatus::Code(_) => None,
        }
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitStatus::Code(code) => write!(f, "exit code {}", code),
            ExitStatus::Signal(sig) => write!(f, "killed by signal {}", sig),
        }
    }
}
