//! Integration tests running real children behind a pty

use std::os::unix::fs::PermissionsExt;
use std::time::{Duration, Instant};

use shellterm::pty::{ExitStatus, SpawnConfig, SpawnError, WindowSize, DEFAULT_TERM};
use shellterm::{Error, PtySession, SessionController, SessionEvent};

/// Pump the controller until `done` holds or ten seconds pass
fn run_until<F>(controller: &mut SessionController, mut done: F) -> bool
where
    F: FnMut(&SessionController) -> bool,
{
    let deadline = Instant::now() + Duration::from_secs(10);
    while Instant::now() < deadline {
        if done(controller) {
            return true;
        }
        controller
            .wait_for_output(Duration::from_millis(50))
            .expect("session output");
    }
    controller.process_pending().expect("drain pending output");
    done(controller)
}

fn rows(controller: &SessionController) -> Vec<String> {
    let snapshot = controller.snapshot();
    (0..snapshot.rows).map(|r| snapshot.row_text(r)).collect()
}

fn sh(script: &str) -> SpawnConfig {
    SpawnConfig::new("/bin/sh").args(["-c", script])
}

fn start(config: SpawnConfig, cols: u16, rows: u16) -> SessionController {
    SessionController::start(config, WindowSize::new(cols, rows), None).unwrap()
}

#[test]
fn test_interactive_shell_echo() {
    let mut controller = start(SpawnConfig::new("/bin/sh"), 80, 24);
    // The quotes keep the echoed command line from matching the output
    controller.send_input(b"echo h''i\n").unwrap();

    let found = run_until(&mut controller, |c| rows(c).iter().any(|row| row.ends_with("hi")));
    assert!(found, "screen was:\n{}", controller.snapshot().to_text());

    controller.send_input(b"exit\n").unwrap();
    assert!(run_until(&mut controller, |c| c.exit_status().is_some()));
    assert_eq!(controller.exit_status(), Some(ExitStatus::Code(0)));
}

#[test]
fn test_child_sees_terminal_env() {
    let mut controller = start(sh("printf '%s' \"$TERM\""), 80, 5);
    assert!(run_until(&mut controller, |c| c.exit_status().is_some()));
    controller.process_pending().unwrap();
    assert_eq!(controller.snapshot().row_text(0), DEFAULT_TERM);
}

#[test]
fn test_child_sees_window_size() {
    let mut controller = start(sh("stty size"), 100, 7);
    assert!(run_until(&mut controller, |c| c.exit_status().is_some()));
    controller.process_pending().unwrap();
    assert_eq!(controller.snapshot().row_text(0), "7 100");
}

#[test]
fn test_working_directory() {
    let dir = tempfile::tempdir().unwrap();
    let expected = dir.path().canonicalize().unwrap();

    let config = sh("pwd -P").cwd(dir.path());
    let mut controller = SessionController::start(config, WindowSize::new(200, 5), None).unwrap();
    assert!(run_until(&mut controller, |c| c.exit_status().is_some()));
    controller.process_pending().unwrap();
    assert_eq!(controller.snapshot().row_text(0), expected.to_string_lossy());
}

#[test]
fn test_controller_from_existing_session() {
    let session = PtySession::start(sh("printf wrapped"), WindowSize::new(40, 3)).unwrap();
    let mut controller = SessionController::with_session(session, Some(10));
    assert!(run_until(&mut controller, |c| c.exit_status().is_some()));
    controller.process_pending().unwrap();
    assert_eq!(controller.snapshot().row_text(0), "wrapped");
    assert_eq!((controller.screen().cols(), controller.screen().rows()), (40, 3));
}

#[test]
fn test_raw_session_events_end_with_exit() {
    let session = PtySession::start(sh("printf abc; exit 5"), WindowSize::default()).unwrap();
    let deadline = Instant::now() + Duration::from_secs(10);
    let mut output = Vec::new();
    let mut status = None;
    while status.is_none() && Instant::now() < deadline {
        match session.recv_event_timeout(Duration::from_millis(100)) {
            Some(SessionEvent::Data(data)) => output.extend(data),
            Some(SessionEvent::Exit(s)) => status = Some(s),
            None => {}
        }
    }
    assert_eq!(status, Some(ExitStatus::Code(5)));
    assert!(String::from_utf8_lossy(&output).contains("abc"));
    assert!(session.recv_event_timeout(Duration::from_millis(200)).is_none());
}

#[test]
fn test_kill_interactive_shell() {
    let mut controller = start(SpawnConfig::new("/bin/sh"), 80, 24);
    assert!(controller.is_running());
    controller.kill().unwrap();

    assert!(!controller.is_running());
    assert!(controller.exit_status().is_some());
    assert!(matches!(controller.send_input(b"echo\n"), Err(Error::SessionClosed)));
    // A second kill is a no-op
    controller.kill().unwrap();
}

#[test]
fn test_missing_program() {
    let config = SpawnConfig::new("definitely-not-a-real-program");
    let err = PtySession::start(config, WindowSize::default()).unwrap_err();
    match err {
        Error::Spawn { program, source } => {
            assert_eq!(program, "definitely-not-a-real-program");
            assert!(matches!(source, SpawnError::NotFound));
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_non_executable_program() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("script.sh");
    std::fs::write(&path, "#!/bin/sh\necho nope\n").unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

    let err = PtySession::start(SpawnConfig::new(path.to_string_lossy()), WindowSize::default())
        .unwrap_err();
    assert!(
        matches!(err, Error::Spawn { source: SpawnError::PermissionDenied, .. }),
        "unexpected error: {}",
        err
    );
}
