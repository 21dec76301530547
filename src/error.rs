//! Crate error type

use crate::pty::{PtyError, SpawnError};

/// Errors surfaced by sessions and the controller
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The child could not be launched
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: SpawnError,
    },

    /// The session has exited or is being torn down
    #[error("session closed")]
    SessionClosed,

    /// A resize reached a session that already exited
    #[error("resize ignored: session has exited")]
    ResizeIgnored,

    /// A pty operation failed on a live session
    #[error(transparent)]
    Pty(#[from] PtyError),
}

/// Result alias for crate operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Only `Spawn` leaves nothing to retry against
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Spawn { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_error_message() {
        let err = Error::Spawn {
            program: "/bin/nope".into(),
            source: SpawnError::NotFound,
        };
        assert_eq!(err.to_string(), "failed to spawn /bin/nope: executable not found");
        assert!(err.is_fatal());
        assert!(!Error::SessionClosed.is_fatal());
    }
}
