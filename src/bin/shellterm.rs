//! shellterm interactive relay
//!
//! Runs the configured shell behind a pty, interprets its output with the
//! emulator and redraws the host terminal from snapshots. Keystrokes are
//! relayed unchanged.

use std::io::{self, Read, Write};
use std::process::ExitCode;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use nix::libc;
use nix::sys::termios::{self, LocalFlags, SetArg, SpecialCharacterIndices, Termios};

use shellterm::app::{self, Config};
use shellterm::core::{CellSnapshot, ColorSnapshot, Snapshot, StyleSnapshot};
use shellterm::{Error, SessionController};

const FRAME: Duration = Duration::from_millis(16);

fn main() -> ExitCode {
    app::init_logging("info");

    let mut config = Config::load_or_default();
    if let Some((cols, rows)) = host_size() {
        config.cols = cols;
        config.rows = rows;
    }
    let args: Vec<String> = std::env::args().skip(1).collect();
    if let Some(shell) = args.first() {
        config.shell = Some(shell.clone());
        config.args = args[1..].to_vec();
    }

    let mut controller = match SessionController::from_config(&config) {
        Ok(controller) => controller,
        Err(e) => {
            eprintln!("shellterm: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = RawModeGuard::new().and_then(|_guard| run(&mut controller));
    match result {
        Ok(()) => {
            match controller.exit_status() {
                Some(status) => eprintln!("shellterm: shell exited ({})", status),
                None => eprintln!("shellterm: stopped"),
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("shellterm: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(controller: &mut SessionController) -> io::Result<()> {
    let (input_tx, input_rx) = mpsc::channel::<Vec<u8>>();
    thread::spawn(move || {
        let mut stdin = io::stdin();
        let mut buf = [0u8; 4096];
        loop {
            match stdin.read(&mut buf) {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if input_tx.send(buf[..n].to_vec()).is_err() {
                        break;
                    }
                }
            }
        }
    });

    let mut out = io::stdout();
    out.write_all(b"\x1b[?1049h\x1b[2J")?;
    let mut previous: Option<Snapshot> = None;
    let mut size = host_size();

    let outcome = loop {
        let mut failed = None;
        while let Ok(bytes) = input_rx.try_recv() {
            match controller.send_input(&bytes) {
                Ok(()) | Err(Error::SessionClosed) => {}
                Err(e) => {
                    failed = Some(e);
                    break;
                }
            }
        }
        if let Some(e) = failed {
            break Err(io::Error::other(e));
        }

        let current = host_size();
        if current != size {
            size = current;
            if let Some((cols, rows)) = current {
                if let Err(e) = controller.resize(cols, rows) {
                    tracing::warn!(error = %e, "Resize failed");
                }
                previous = None;
            }
        }

        if let Err(e) = controller.wait_for_output(FRAME) {
            break Err(io::Error::other(e));
        }

        let snapshot = controller.snapshot();
        redraw(&mut out, previous.as_ref(), &snapshot)?;
        previous = Some(snapshot);

        if controller.exit_status().is_some() {
            break Ok(());
        }
    };

    out.write_all(b"\x1b[0m\x1b[?25h\x1b[?1049l")?;
    out.flush()?;
    outcome
}

/// Repaint the rows that changed since `previous`
fn redraw(
    out: &mut impl Write,
    previous: Option<&Snapshot>,
    snapshot: &Snapshot,
) -> io::Result<()> {
    let mut frame = String::new();
    frame.push_str("\x1b[?25l");
    for (row, cells) in snapshot.grid.iter().enumerate() {
        let unchanged = previous
            .filter(|p| p.cols == snapshot.cols)
            .and_then(|p| p.grid.get(row))
            .is_some_and(|old| old == cells);
        if unchanged {
            continue;
        }
        frame.push_str(&format!("\x1b[{};1H", row + 1));
        render_row(&mut frame, cells);
        frame.push_str("\x1b[0m\x1b[K");
    }
    frame.push_str(&format!(
        "\x1b[{};{}H",
        snapshot.cursor.row + 1,
        snapshot.cursor.col + 1
    ));
    if snapshot.cursor.visible {
        frame.push_str("\x1b[?25h");
    }
    out.write_all(frame.as_bytes())?;
    out.flush()
}

fn render_row(frame: &mut String, cells: &[CellSnapshot]) {
    let mut pen: Option<(ColorSnapshot, ColorSnapshot, StyleSnapshot)> = None;
    for cell in cells.iter().filter(|c| c.width != 0) {
        let style = (cell.fg, cell.bg, cell.style);
        if pen != Some(style) {
            frame.push_str(&sgr(&style));
            pen = Some(style);
        }
        frame.push(cell.ch);
    }
}

fn sgr((fg, bg, style): &(ColorSnapshot, ColorSnapshot, StyleSnapshot)) -> String {
    let mut codes = vec!["0".to_string()];
    let flags = [
        (style.bold, "1"),
        (style.faint, "2"),
        (style.italic, "3"),
        (style.underline, "4"),
        (style.blink, "5"),
        (style.inverse, "7"),
        (style.hidden, "8"),
        (style.strikethrough, "9"),
    ];
    codes.extend(flags.iter().filter(|(on, _)| *on).map(|(_, code)| code.to_string()));
    codes.extend(color_code(fg, 30, 90, 38));
    codes.extend(color_code(bg, 40, 100, 48));
    format!("\x1b[{}m", codes.join(";"))
}

fn color_code(color: &ColorSnapshot, base: u8, bright: u8, extended: u8) -> Option<String> {
    match *color {
        ColorSnapshot::Default => None,
        ColorSnapshot::Indexed { index } if index < 8 => Some((base + index).to_string()),
        ColorSnapshot::Indexed { index } if index < 16 => Some((bright + index - 8).to_string()),
        ColorSnapshot::Indexed { index } => Some(format!("{};5;{}", extended, index)),
        ColorSnapshot::Rgb { r, g, b } => Some(format!("{};2;{};{};{}", extended, r, g, b)),
    }
}

/// Host terminal size using ioctl
fn host_size() -> Option<(u16, u16)> {
    let mut ws = libc::winsize {
        ws_row: 0,
        ws_col: 0,
        ws_xpixel: 0,
        ws_ypixel: 0,
    };

    // SAFETY: TIOCGWINSZ only writes into the winsize we pass
    let result = unsafe { libc::ioctl(libc::STDOUT_FILENO, libc::TIOCGWINSZ, &mut ws) };

    if result == 0 && ws.ws_col > 0 && ws.ws_row > 0 {
        Some((ws.ws_col, ws.ws_row))
    } else {
        None
    }
}

/// RAII guard for raw terminal mode
struct RawModeGuard {
    original: Termios,
}

impl RawModeGuard {
    fn new() -> io::Result<Self> {
        let original = termios::tcgetattr(io::stdin()).map_err(io::Error::from)?;

        let mut raw = original.clone();
        termios::cfmakeraw(&mut raw);
        raw.local_flags.remove(LocalFlags::ECHO);
        raw.control_chars[SpecialCharacterIndices::VMIN as usize] = 1;
        raw.control_chars[SpecialCharacterIndices::VTIME as usize] = 0;

        termios::tcsetattr(io::stdin(), SetArg::TCSANOW, &raw).map_err(io::Error::from)?;

        Ok(Self { original })
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = termios::tcsetattr(io::stdin(), SetArg::TCSANOW, &self.original);
    }
}
