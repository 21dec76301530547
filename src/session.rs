//! PTY sessions
//!
//! A [`PtySession`] owns one child bound to a pseudoterminal. A reader
//! thread forwards pty output over the session's event channel and reaps the
//! child; a writer thread drains the input queue so `write` never blocks.
//! The event queue is bounded: a consumer that falls behind stalls the
//! reader, and with it the child. All output read before EOF is delivered
//! before the single [`SessionEvent::Exit`].

use std::cell::Cell;
use std::fs::File;
use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{
    self, Receiver, RecvTimeoutError, Sender, SyncSender, TryRecvError, TrySendError,
};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use nix::sys::signal::Signal;

use crate::error::{Error, Result};
use crate::pty::{poll_readable, ExitStatus, Pty, PtyError, SpawnConfig, WindowSize};

const READ_BUFFER_SIZE: usize = 64 * 1024;
/// How often the reader wakes up to check on the child
const POLL_INTERVAL_MS: i32 = 50;
/// How long a child gets to exit after SIGHUP before SIGKILL
const KILL_GRACE: Duration = Duration::from_millis(500);
/// Output chunks queued before the reader waits for the consumer
const EVENT_QUEUE_CHUNKS: usize = 256;

/// Lifecycle of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Starting,
    Running,
    Exited(ExitStatus),
}

/// Output from a session, in arrival order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A chunk read from the pty
    Data(Vec<u8>),
    /// The child exited; always the last event
    Exit(ExitStatus),
}

#[derive(Debug)]
struct Shared {
    state: Mutex<SessionState>,
    /// Set once teardown has started
    closing: AtomicBool,
}

impl Shared {
    fn state(&self) -> SessionState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: SessionState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    fn is_closing(&self) -> bool {
        self.closing.load(Ordering::SeqCst)
    }
}

/// A child process running behind a pseudoterminal
#[derive(Debug)]
pub struct PtySession {
    /// Released by `kill`
    pty: Option<Arc<Pty>>,
    pid: i32,
    shared: Arc<Shared>,
    size: WindowSize,
    input: Option<Sender<Vec<u8>>>,
    /// Data chunks only; the exit event is produced once the reader is gone
    events: Receiver<Vec<u8>>,
    exit_delivered: Cell<bool>,
    reader: Option<JoinHandle<()>>,
    writer: Option<JoinHandle<()>>,
}

impl PtySession {
    /// Spawn the configured program and start the I/O threads
    pub fn start(config: SpawnConfig, size: WindowSize) -> Result<Self> {
        let shared = Arc::new(Shared {
            state: Mutex::new(SessionState::Starting),
            closing: AtomicBool::new(false),
        });

        let pty = Pty::spawn(&config, size).map_err(|source| Error::Spawn {
            program: config.program.clone(),
            source,
        })?;
        let pty = Arc::new(pty);
        let read_end = pty.try_clone_master().map_err(PtyError::Io)?;
        let write_end = pty.try_clone_master().map_err(PtyError::Io)?;

        let (event_tx, events) = mpsc::sync_channel(EVENT_QUEUE_CHUNKS);
        let (input, input_rx) = mpsc::channel::<Vec<u8>>();

        let reader = {
            let pty = Arc::clone(&pty);
            let shared = Arc::clone(&shared);
            thread::Builder::new()
                .name("shellterm-reader".into())
                .spawn(move || reader_loop(pty, read_end, event_tx, shared))
                .map_err(PtyError::Io)?
        };
        let writer = thread::Builder::new()
            .name("shellterm-writer".into())
            .spawn(move || writer_loop(write_end, input_rx))
            .map_err(PtyError::Io)?;

        shared.set_state(SessionState::Running);
        tracing::info!(
            pid = pty.pid().as_raw(),
            cols = size.cols,
            rows = size.rows,
            "Session started"
        );

        Ok(Self {
            pid: pty.pid().as_raw(),
            pty: Some(pty),
            shared,
            size,
            input: Some(input),
            events,
            exit_delivered: Cell::new(false),
            reader: Some(reader),
            writer: Some(writer),
        })
    }

    /// Start the platform login shell
    pub fn start_shell(size: WindowSize) -> Result<Self> {
        Self::start(SpawnConfig::login_shell(), size)
    }

    /// Queue bytes for the child. Writes go out in issue order.
    pub fn write(&self, bytes: &[u8]) -> Result<()> {
        if self.shared.is_closing() || matches!(self.shared.state(), SessionState::Exited(_)) {
            return Err(Error::SessionClosed);
        }
        let input = self.input.as_ref().ok_or(Error::SessionClosed)?;
        input.send(bytes.to_vec()).map_err(|_| Error::SessionClosed)
    }

    /// Change the pty window size. Resizing an exited session is a no-op;
    /// resizing while teardown is still in progress fails.
    pub fn resize(&mut self, size: WindowSize) -> Result<()> {
        if let SessionState::Exited(status) = self.shared.state() {
            tracing::debug!(%status, "{}", Error::ResizeIgnored);
            return Ok(());
        }
        if self.shared.is_closing() {
            return Err(Error::SessionClosed);
        }
        self.live_pty()?.resize(size)?;
        self.size = size;
        Ok(())
    }

    /// Terminate the child: SIGHUP, then SIGKILL if it outlives the grace
    /// period. Returns once the child is reaped and the pty is closed.
    /// Calling it again does nothing.
    pub fn kill(&mut self) {
        if self.shared.closing.swap(true, Ordering::SeqCst) {
            return;
        }
        // Closing the queue ends the writer thread
        self.input = None;

        if let Some(pty) = self.pty.as_ref().filter(|_| !self.has_exited()) {
            tracing::info!(pid = self.pid, "Hanging up session");
            if let Err(e) = pty.signal(Signal::SIGHUP) {
                tracing::warn!(error = %e, "SIGHUP failed");
            }
            let deadline = Instant::now() + KILL_GRACE;
            while !self.has_exited() && Instant::now() < deadline {
                thread::sleep(Duration::from_millis(10));
            }
            if !self.has_exited() {
                tracing::info!(pid = self.pid, "Child ignored SIGHUP, sending SIGKILL");
                if let Err(e) = pty.signal(Signal::SIGKILL) {
                    tracing::warn!(error = %e, "SIGKILL failed");
                }
            }
        }

        if let Some(reader) = self.reader.take() {
            if reader.join().is_err() {
                tracing::warn!("Reader thread panicked");
            }
        }
        if let Some(writer) = self.writer.take() {
            if writer.join().is_err() {
                tracing::warn!("Writer thread panicked");
            }
        }
        // Both threads held their own handles; this closes the master
        self.pty = None;
    }

    /// Next event if one is queued
    pub fn try_event(&self) -> Option<SessionEvent> {
        match self.events.try_recv() {
            Ok(data) => Some(SessionEvent::Data(data)),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => self.take_exit(),
        }
    }

    /// Wait up to `timeout` for the next event
    pub fn recv_event_timeout(&self, timeout: Duration) -> Option<SessionEvent> {
        match self.events.recv_timeout(timeout) {
            Ok(data) => Some(SessionEvent::Data(data)),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => self.take_exit(),
        }
    }

    /// The reader drops its sender only after recording the exit status, so
    /// a disconnected queue means every chunk has been handed out.
    fn take_exit(&self) -> Option<SessionEvent> {
        if self.exit_delivered.get() {
            return None;
        }
        let status = self.exit_status()?;
        self.exit_delivered.set(true);
        Some(SessionEvent::Exit(status))
    }

    pub fn state(&self) -> SessionState {
        self.shared.state()
    }

    pub fn size(&self) -> WindowSize {
        self.size
    }

    pub fn pid(&self) -> i32 {
        self.pid
    }

    pub fn exit_status(&self) -> Option<ExitStatus> {
        match self.shared.state() {
            SessionState::Exited(status) => Some(status),
            _ => None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.shared.state() == SessionState::Running
    }

    /// Current size as the kernel sees it
    pub fn pty_size(&self) -> Result<WindowSize> {
        Ok(self.live_pty()?.window_size()?)
    }

    fn live_pty(&self) -> Result<&Pty> {
        self.pty.as_deref().ok_or(Error::SessionClosed)
    }

    fn has_exited(&self) -> bool {
        matches!(self.shared.state(), SessionState::Exited(_))
    }
}

impl Drop for PtySession {
    fn drop(&mut self) {
        self.kill();
    }
}

enum ReadOutcome {
    Data(usize),
    Retry,
    Closed,
}

fn read_chunk(master: &mut File, buf: &mut [u8]) -> ReadOutcome {
    match master.read(buf) {
        Ok(0) => ReadOutcome::Closed,
        Ok(n) => ReadOutcome::Data(n),
        Err(e) if matches!(e.kind(), io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock) => {
            ReadOutcome::Retry
        }
        // Linux reports a hung-up slave as EIO
        Err(e) if e.raw_os_error() == Some(nix::libc::EIO) => ReadOutcome::Closed,
        Err(e) => {
            tracing::warn!(error = %e, "PTY read failed");
            ReadOutcome::Closed
        }
    }
}

/// Queue a chunk, waiting while the consumer is behind. Once teardown has
/// started nobody is waiting for output, so a full queue drops the chunk.
fn forward(tx: &SyncSender<Vec<u8>>, data: &[u8], shared: &Shared) {
    let mut chunk = data.to_vec();
    loop {
        match tx.try_send(chunk) {
            Ok(()) | Err(TrySendError::Disconnected(_)) => return,
            Err(TrySendError::Full(rejected)) => {
                if shared.is_closing() {
                    tracing::debug!(
                        bytes = rejected.len(),
                        "Event queue full during teardown, dropping output"
                    );
                    return;
                }
                chunk = rejected;
                thread::sleep(Duration::from_millis(5));
            }
        }
    }
}

fn reader_loop(pty: Arc<Pty>, mut master: File, tx: SyncSender<Vec<u8>>, shared: Arc<Shared>) {
    let mut buf = vec![0u8; READ_BUFFER_SIZE];
    let mut reaped = None;

    loop {
        match poll_readable(&master, POLL_INTERVAL_MS) {
            Ok(true) => match read_chunk(&mut master, &mut buf) {
                ReadOutcome::Data(n) => {
                    forward(&tx, &buf[..n], &shared);
                    if shared.is_closing() {
                        if let Ok(Some(status)) = pty.try_wait() {
                            reaped = Some(status);
                            break;
                        }
                    }
                }
                ReadOutcome::Retry => {}
                ReadOutcome::Closed => break,
            },
            Ok(false) => {
                // The child may be gone while a grandchild keeps the slave open
                if let Ok(Some(status)) = pty.try_wait() {
                    drain(&mut master, &mut buf, &tx, &shared);
                    reaped = Some(status);
                    break;
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "PTY poll failed");
                break;
            }
        }
    }

    let status = match reaped {
        Some(status) => status,
        None => match pty.wait() {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!(error = %e, "Could not reap child");
                ExitStatus::Code(-1)
            }
        },
    };

    tracing::info!(pid = pty.pid().as_raw(), %status, "Session exited");
    // Dropping `tx` after this is what releases the exit event
    shared.set_state(SessionState::Exited(status));
}

/// Forward whatever is still buffered in the pty
fn drain(master: &mut File, buf: &mut [u8], tx: &SyncSender<Vec<u8>>, shared: &Shared) {
    while let Ok(true) = poll_readable(master, 0) {
        match read_chunk(master, buf) {
            ReadOutcome::Data(n) => forward(tx, &buf[..n], shared),
            ReadOutcome::Retry => {}
            ReadOutcome::Closed => break,
        }
    }
}

fn writer_loop(mut master: File, input: Receiver<Vec<u8>>) {
    for chunk in input {
        if let Err(e) = master.write_all(&chunk).and_then(|()| master.flush()) {
            tracing::debug!(error = %e, "PTY write failed, dropping input");
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect_until_exit(session: &PtySession) -> (Vec<u8>, Option<ExitStatus>) {
        let deadline = Instant::now() + Duration::from_secs(10);
        let mut output = Vec::new();
        while Instant::now() < deadline {
            match session.recv_event_timeout(Duration::from_millis(100)) {
                Some(SessionEvent::Data(data)) => output.extend(data),
                Some(SessionEvent::Exit(status)) => return (output, Some(status)),
                None => {}
            }
        }
        (output, None)
    }

    fn cat(size: WindowSize) -> PtySession {
        PtySession::start(SpawnConfig::new("cat"), size).unwrap()
    }

    #[test]
    fn test_output_then_single_exit() {
        let config = SpawnConfig::new("/bin/sh").args(["-c", "printf 'one two'"]);
        let session = PtySession::start(config, WindowSize::new(80, 24)).unwrap();

        let (output, status) = collect_until_exit(&session);
        assert!(String::from_utf8_lossy(&output).contains("one two"));
        assert_eq!(status, Some(ExitStatus::Code(0)));
        assert_eq!(session.exit_status(), Some(ExitStatus::Code(0)));
        assert!(session.try_event().is_none());
    }

    #[test]
    fn test_exit_code_reported() {
        let config = SpawnConfig::new("/bin/sh").args(["-c", "exit 3"]);
        let session = PtySession::start(config, WindowSize::default()).unwrap();
        let (_, status) = collect_until_exit(&session);
        assert_eq!(status, Some(ExitStatus::Code(3)));
        assert!(!session.is_running());
    }

    #[test]
    fn test_spawn_failure() {
        let err = PtySession::start(SpawnConfig::new("/no/such/shell"), WindowSize::default())
            .unwrap_err();
        assert!(matches!(err, Error::Spawn { .. }));
    }

    #[test]
    fn test_kill_then_write_fails() {
        let mut session = cat(WindowSize::default());
        assert!(session.is_running());
        session.write(b"hello\n").unwrap();

        session.kill();
        session.kill();
        assert!(matches!(session.write(b"x"), Err(Error::SessionClosed)));
        assert!(session.exit_status().is_some());
        // The child is gone, so a resize is ignored rather than refused
        assert!(session.resize(WindowSize::new(100, 30)).is_ok());
        assert_eq!(session.size(), WindowSize::default());
    }

    #[test]
    fn test_kill_releases_pty() {
        let mut session = cat(WindowSize::new(80, 24));
        assert!(session.pty_size().is_ok());
        session.kill();
        assert!(matches!(session.pty_size(), Err(Error::SessionClosed)));
        assert!(session.pid() > 0);
    }

    #[test]
    fn test_exit_delivered_once_after_kill() {
        let mut session = cat(WindowSize::default());
        session.kill();
        let events: Vec<SessionEvent> = std::iter::from_fn(|| session.try_event()).collect();
        let exits = events.iter().filter(|e| matches!(e, SessionEvent::Exit(_))).count();
        assert_eq!(exits, 1);
        assert!(matches!(events.last(), Some(SessionEvent::Exit(_))));
        assert!(session.try_event().is_none());
    }

    #[test]
    fn test_full_queue_drops_output_only_during_teardown() {
        let shared = Shared {
            state: Mutex::new(SessionState::Running),
            closing: AtomicBool::new(false),
        };
        let (tx, rx) = mpsc::sync_channel(1);
        forward(&tx, b"first", &shared);

        shared.closing.store(true, Ordering::SeqCst);
        forward(&tx, b"second", &shared);
        assert_eq!(rx.try_recv().unwrap(), b"first".to_vec());
        assert!(rx.try_recv().is_err());

        drop(rx);
        shared.closing.store(false, Ordering::SeqCst);
        forward(&tx, b"after hangup", &shared);
    }

    #[test]
    fn test_resize_after_exit_is_ignored() {
        let config = SpawnConfig::new("/bin/sh").args(["-c", "exit 0"]);
        let mut session = PtySession::start(config, WindowSize::new(80, 24)).unwrap();
        let _ = collect_until_exit(&session);

        assert!(session.resize(WindowSize::new(100, 30)).is_ok());
        assert_eq!(session.size(), WindowSize::new(80, 24));
        assert!(matches!(session.write(b"x"), Err(Error::SessionClosed)));
    }

    #[test]
    fn test_resize_live_session() {
        let mut session = cat(WindowSize::new(80, 24));
        session.resize(WindowSize::new(132, 43)).unwrap();
        assert_eq!(session.size(), WindowSize::new(132, 43));
        let kernel = session.pty_size().unwrap();
        assert_eq!((kernel.cols, kernel.rows), (132, 43));
    }
}
