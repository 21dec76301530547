//! Session controller
//!
//! Ties a [`PtySession`] to a [`Parser`] and a [`Screen`]. The controller
//! is the only writer of the screen: session output is parsed and applied
//! in arrival order on the caller's thread, and device replies produced by
//! the screen are written back to the child.

use std::ops::Range;
use std::time::Duration;

use crate::app::Config;
use crate::core::{Line, Screen, Snapshot};
use crate::error::{Error, Result};
use crate::parser::{Parser, TerminalAction};
use crate::pty::{ExitStatus, SpawnConfig, WindowSize};
use crate::session::{PtySession, SessionEvent};

const PASTE_START: &str = "\x1b[200~";
const PASTE_END: &str = "\x1b[201~";
/// Largest dimension an application may request through `CSI 8 t`
pub const MAX_REQUESTED_DIM: u16 = 1000;

/// Drives one shell session through the terminal emulator
#[derive(Debug)]
pub struct SessionController {
    session: PtySession,
    parser: Parser,
    screen: Screen,
}

impl SessionController {
    /// Start the platform login shell at the given size
    pub fn spawn_default(cols: u16, rows: u16) -> Result<Self> {
        Self::start(SpawnConfig::login_shell(), WindowSize::new(cols, rows), None)
    }

    /// Start `config` on a new pty
    pub fn start(
        config: SpawnConfig,
        size: WindowSize,
        scrollback_limit: Option<usize>,
    ) -> Result<Self> {
        let session = PtySession::start(config, size)?;
        Ok(Self::with_session(session, scrollback_limit))
    }

    /// Start a session described by an application config, sending its
    /// startup input once the child is running
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut controller = Self::start(
            config.spawn_config(),
            config.window_size(),
            config.scrollback_limit,
        )?;
        if let Some(input) = config.startup_input.as_deref().filter(|s| !s.is_empty()) {
            controller.send_input(input.as_bytes())?;
        }
        controller.parser.set_max_osc_len(config.max_osc_len);
        Ok(controller)
    }

    /// Wrap an existing session. The screen takes the session's size.
    pub fn with_session(session: PtySession, scrollback_limit: Option<usize>) -> Self {
        let size = session.size();
        let (cols, rows) = (size.cols as usize, size.rows as usize);
        Self {
            screen: Screen::with_scrollback_limit(cols, rows, scrollback_limit),
            parser: Parser::new(),
            session,
        }
    }

    /// Send keystrokes or other raw input to the child
    pub fn send_input(&mut self, bytes: &[u8]) -> Result<()> {
        self.session.write(bytes)
    }

    /// Send pasted text, bracketed when the application asked for it
    pub fn paste(&mut self, text: &str) -> Result<()> {
        if self.screen.modes().bracketed_paste {
            // An embedded end marker would let the paste escape the brackets
            let body = text.replace(PASTE_END, "");
            let mut framed =
                String::with_capacity(body.len() + PASTE_START.len() + PASTE_END.len());
            framed.push_str(PASTE_START);
            framed.push_str(&body);
            framed.push_str(PASTE_END);
            self.session.write(framed.as_bytes())
        } else {
            self.session.write(text.as_bytes())
        }
    }

    /// Resize the screen, then the pty. Zero dimensions are raised to 1.
    pub fn resize(&mut self, cols: u16, rows: u16) -> Result<()> {
        let size = WindowSize::new(cols, rows);
        self.screen.resize(size.cols as usize, size.rows as usize);
        self.session.resize(size)
    }

    /// Apply every event already queued, without blocking. Returns the
    /// number of events handled.
    pub fn process_pending(&mut self) -> Result<usize> {
        let mut handled = 0;
        while let Some(event) = self.session.try_event() {
            self.handle_event(event)?;
            handled += 1;
        }
        Ok(handled)
    }

    /// Block up to `timeout` for at least one event, then apply everything
    /// queued. Returns whether anything arrived.
    pub fn wait_for_output(&mut self, timeout: Duration) -> Result<bool> {
        match self.session.recv_event_timeout(timeout) {
            Some(event) => {
                self.handle_event(event)?;
                self.process_pending()?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn handle_event(&mut self, event: SessionEvent) -> Result<()> {
        match event {
            SessionEvent::Data(data) => self.handle_output(&data),
            SessionEvent::Exit(status) => {
                tracing::debug!(%status, "Controller saw session exit");
                Ok(())
            }
        }
    }

    /// Feed one output chunk through the parser into the screen
    fn handle_output(&mut self, data: &[u8]) -> Result<()> {
        let mut requested = None;
        for action in self.parser.feed(data) {
            match action {
                TerminalAction::Resize { cols, rows } => {
                    if cols > MAX_REQUESTED_DIM || rows > MAX_REQUESTED_DIM {
                        tracing::debug!(cols, rows, "Dropping oversized resize request");
                        continue;
                    }
                    // A zero dimension means "keep the current one"
                    let cols = if cols == 0 { self.screen.cols() as u16 } else { cols };
                    let rows = if rows == 0 { self.screen.rows() as u16 } else { rows };
                    self.screen.resize(cols as usize, rows as usize);
                    requested = Some(WindowSize::new(cols, rows));
                }
                action => self.screen.apply(action),
            }
        }

        if let Some(size) = requested {
            tracing::debug!(cols = size.cols, rows = size.rows, "Application requested resize");
            tolerate_closed(self.session.resize(size))?;
        }

        let replies = self.screen.take_responses();
        if !replies.is_empty() {
            tolerate_closed(self.session.write(&replies))?;
        }
        Ok(())
    }

    /// Owned copy of the visible state
    pub fn snapshot(&self) -> Snapshot {
        self.screen.snapshot()
    }

    /// Scrollback lines in `range` (0 = oldest)
    pub fn scrollback(&self, range: Range<usize>) -> Vec<Line> {
        self.screen.scrollback_range(range.start, range.end)
    }

    pub fn title(&self) -> &str {
        self.screen.title()
    }

    pub fn exit_status(&self) -> Option<ExitStatus> {
        self.session.exit_status()
    }

    pub fn is_running(&self) -> bool {
        self.session.is_running()
    }

    /// Terminate the child and apply any output it produced before dying
    pub fn kill(&mut self) -> Result<()> {
        self.session.kill();
        self.process_pending().map(|_| ())
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    /// Mutable access for selection handling
    pub fn screen_mut(&mut self) -> &mut Screen {
        &mut self.screen
    }

    pub fn session(&self) -> &PtySession {
        &self.session
    }

    /// Malformed sequences the parser recovered from so far
    pub fn malformed_count(&self) -> u64 {
        self.parser.malformed_count()
    }
}

/// Write-backs racing teardown are dropped rather than failing the chunk
fn tolerate_closed(result: Result<()>) -> Result<()> {
    match result {
        Err(Error::SessionClosed) => {
            tracing::debug!("Session closed before write-back");
            Ok(())
        }
        other => other,
    }
}
