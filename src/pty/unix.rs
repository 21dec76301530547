//! Unix PTY implementation
//!
//! Implements PTY creation and child process management using POSIX APIs.
//! The child reports a failed exec back through a close-on-exec socket: an
//! exec that succeeds closes it and the parent reads EOF, otherwise the
//! parent reads the errno.

use std::ffi::CString;
use std::fs::File;
use std::io::{self, Read};
use std::os::fd::{AsFd, AsRawFd, FromRawFd, IntoRawFd, RawFd};
use std::os::raw::c_char;
use std::os::unix::fs::PermissionsExt;
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};

use nix::errno::Errno;
use nix::fcntl::{fcntl, FcntlArg, FdFlag, OFlag};
use nix::libc;
use nix::poll::{poll, PollFd, PollFlags};
use nix::pty::{grantpt, posix_openpt, ptsname, unlockpt};
use nix::sys::signal::{kill, Signal};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::{fork, ForkResult, Pid};

use super::{ExitStatus, PtyError, PtyResult, SpawnConfig, SpawnError, WindowSize};

/// Exit status of a child whose exec failed
const EXEC_FAILED: i32 = 127;

const FALLBACK_PATH: &str = "/usr/local/bin:/usr/bin:/bin";

/// A pseudoterminal with a spawned child process
#[derive(Debug)]
pub struct Pty {
    /// The PTY master file descriptor
    master: File,
    /// The child process ID
    pid: Pid,
}

/// Everything the child needs, allocated before fork
struct ExecPlan {
    slave: CString,
    cwd: CString,
    program: CString,
    _argv: Vec<CString>,
    _envp: Vec<CString>,
    argv_ptrs: Vec<*const c_char>,
    envp_ptrs: Vec<*const c_char>,
}

impl Pty {
    /// Spawn `config.program` on the slave side of a new pty
    pub fn spawn(config: &SpawnConfig, size: WindowSize) -> Result<Self, SpawnError> {
        let env = config.build_env();
        let program = resolve_program(&config.program, &env)?;

        let master = posix_openpt(OFlag::O_RDWR | OFlag::O_NOCTTY).map_err(PtyError::OpenMaster)?;
        grantpt(&master).map_err(PtyError::GrantPty)?;
        unlockpt(&master).map_err(PtyError::UnlockPty)?;

        // SAFETY: ptsname is not thread-safe, but we're calling it immediately
        // after unlockpt and copy the result out before anything else runs
        let slave_name = unsafe { ptsname(&master) }.map_err(PtyError::PtsName)?;

        let master = unsafe { File::from_raw_fd(master.into_raw_fd()) };
        fcntl(master.as_raw_fd(), FcntlArg::F_SETFD(FdFlag::FD_CLOEXEC))
            .map_err(|e| PtyError::Io(io::Error::from(e)))?;
        set_window_size(master.as_raw_fd(), size)?;

        let plan = ExecPlan::new(slave_name, &config.resolve_cwd(), &program, config, &env)?;
        let (status_rx, status_tx) = UnixStream::pair().map_err(PtyError::StatusPipe)?;

        // SAFETY: the child only makes async-signal-safe libc calls on
        // memory allocated before the fork
        match unsafe { fork() }.map_err(PtyError::Fork)? {
            ForkResult::Child => unsafe {
                exec_child(master.as_raw_fd(), &plan, status_tx.as_raw_fd())
            }
            ForkResult::Parent { child } => {
                drop(status_tx);
                check_exec(status_rx, child)?;
                tracing::info!(pid = child.as_raw(), program = %config.program, "Spawned child");
                Ok(Pty { master, pid: child })
            }
        }
    }

    /// Get the child process ID
    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// The PTY master
    pub fn master(&self) -> &File {
        &self.master
    }

    /// An independent handle on the master, for reader and writer threads
    pub fn try_clone_master(&self) -> io::Result<File> {
        self.master.try_clone()
    }

    /// Resize the PTY and tell the child about it
    pub fn resize(&self, size: WindowSize) -> PtyResult<()> {
        set_window_size(self.master.as_raw_fd(), size)?;
        self.signal(Signal::SIGWINCH)
    }

    /// Current window size of the PTY
    pub fn window_size(&self) -> PtyResult<WindowSize> {
        get_window_size(self.master.as_raw_fd())
    }

    /// Send a signal to the child process. A child that is already gone is
    /// not an error.
    pub fn signal(&self, signal: Signal) -> PtyResult<()> {
        match kill(self.pid, signal) {
            Ok(()) | Err(Errno::ESRCH) => Ok(()),
            Err(e) => Err(PtyError::Signal(e)),
        }
    }

    /// Reap the child if it has exited
    pub fn try_wait(&self) -> PtyResult<Option<ExitStatus>> {
        match waitpid(self.pid, Some(WaitPidFlag::WNOHANG)).map_err(PtyError::Wait)? {
            WaitStatus::Exited(_, code) => Ok(Some(ExitStatus::Code(code))),
            WaitStatus::Signaled(_, signal, _) => Ok(Some(ExitStatus::Signal(signal as i32))),
            _ => Ok(None),
        }
    }

    /// Block until the child exits and reap it
    pub fn wait(&self) -> PtyResult<ExitStatus> {
        loop {
            match waitpid(self.pid, None) {
                Ok(WaitStatus::Exited(_, code)) => return Ok(ExitStatus::Code(code)),
                Ok(WaitStatus::Signaled(_, signal, _)) => {
                    return Ok(ExitStatus::Signal(signal as i32))
                }
                Ok(_) | Err(Errno::EINTR) => continue,
                Err(e) => return Err(PtyError::Wait(e)),
            }
        }
    }
}

/// Wait up to `timeout_ms` for `fd` to become readable. Hangup counts as
/// readable so the caller sees the EOF.
pub fn poll_readable<F: AsFd>(fd: &F, timeout_ms: i32) -> PtyResult<bool> {
    let mut fds = [PollFd::new(fd, PollFlags::POLLIN)];
    match poll(&mut fds, timeout_ms) {
        Ok(0) | Err(Errno::EINTR) => Ok(false),
        Ok(_) => Ok(fds[0].revents().is_some_and(|r| {
            r.intersects(PollFlags::POLLIN | PollFlags::POLLHUP | PollFlags::POLLERR)
        })),
        Err(e) => Err(PtyError::Poll(e)),
    }
}

impl ExecPlan {
    fn new(
        slave: String,
        cwd: &Path,
        program: &Path,
        config: &SpawnConfig,
        env: &[(String, String)],
    ) -> Result<Self, SpawnError> {
        let slave = cstring(slave)?;
        let cwd = cstring(cwd.to_string_lossy().into_owned())?;
        let program = cstring(program.to_string_lossy().into_owned())?;

        let mut argv = Vec::with_capacity(config.args.len() + 1);
        argv.push(cstring(config.program.clone())?);
        for arg in &config.args {
            argv.push(cstring(arg.clone())?);
        }
        let envp = env
            .iter()
            .map(|(k, v)| cstring(format!("{}={}", k, v)))
            .collect::<Result<Vec<_>, _>>()?;

        let argv_ptrs = null_terminated(&argv);
        let envp_ptrs = null_terminated(&envp);
        Ok(Self {
            slave,
            cwd,
            program,
            _argv: argv,
            _envp: envp,
            argv_ptrs,
            envp_ptrs,
        })
    }
}

fn cstring(s: String) -> Result<CString, SpawnError> {
    CString::new(s).map_err(|e| {
        let bytes = e.into_vec();
        SpawnError::InvalidArgument(format!(
            "interior NUL in {:?}",
            String::from_utf8_lossy(&bytes)
        ))
    })
}

fn null_terminated(strings: &[CString]) -> Vec<*const c_char> {
    strings
        .iter()
        .map(|s| s.as_ptr())
        .chain(std::iter::once(std::ptr::null()))
        .collect()
}

/// Find the executable the way `execvp` would, using the child's `PATH`
fn resolve_program(program: &str, env: &[(String, String)]) -> Result<PathBuf, SpawnError> {
    if program.is_empty() {
        return Err(SpawnError::NotFound);
    }
    if program.contains('/') {
        return Ok(PathBuf::from(program));
    }

    let path = env
        .iter()
        .find(|(k, _)| k == "PATH")
        .map(|(_, v)| v.as_str())
        .unwrap_or(FALLBACK_PATH);

    let mut denied = false;
    for dir in path.split(':').filter(|d| !d.is_empty()) {
        let candidate = Path::new(dir).join(program);
        let Ok(meta) = candidate.metadata() else {
            continue;
        };
        if !meta.is_file() {
            continue;
        }
        if meta.permissions().mode() & 0o111 != 0 {
            return Ok(candidate);
        }
        denied = true;
    }

    if denied {
        Err(SpawnError::PermissionDenied)
    } else {
        Err(SpawnError::NotFound)
    }
}

/// Read the exec status from the child. EOF means exec succeeded.
fn check_exec(mut status: UnixStream, child: Pid) -> Result<(), SpawnError> {
    let mut buf = [0u8; 4];
    match status.read_exact(&mut buf) {
        Ok(()) => {
            let errno = Errno::from_i32(i32::from_ne_bytes(buf));
            // Reap the child, which exits right after reporting
            let _ = waitpid(child, None);
            tracing::debug!(pid = child.as_raw(), %errno, "Child exec failed");
            Err(SpawnError::from_errno(errno))
        }
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(()),
        Err(e) => {
            tracing::warn!(error = %e, "Could not read exec status");
            Ok(())
        }
    }
}

/// Post-fork child: become session leader on the slave and exec.
/// Never returns; on failure the errno goes to `status_fd`.
unsafe fn exec_child(master_fd: RawFd, plan: &ExecPlan, status_fd: RawFd) -> ! {
    libc::close(master_fd);

    if libc::setsid() < 0 {
        report_and_exit(status_fd);
    }

    let slave = libc::open(plan.slave.as_ptr(), libc::O_RDWR);
    if slave < 0 {
        report_and_exit(status_fd);
    }
    // Some platforms already made the slave the controlling terminal
    libc::ioctl(slave, libc::TIOCSCTTY as _, 0);

    for fd in [libc::STDIN_FILENO, libc::STDOUT_FILENO, libc::STDERR_FILENO] {
        if libc::dup2(slave, fd) < 0 {
            report_and_exit(status_fd);
        }
    }
    if slave > libc::STDERR_FILENO {
        libc::close(slave);
    }

    if libc::chdir(plan.cwd.as_ptr()) < 0 {
        libc::chdir(b"/\0".as_ptr().cast());
    }

    // Undo the parent's signal dispositions and mask
    for sig in [
        libc::SIGPIPE,
        libc::SIGINT,
        libc::SIGQUIT,
        libc::SIGTERM,
        libc::SIGHUP,
        libc::SIGCHLD,
        libc::SIGWINCH,
    ] {
        libc::signal(sig, libc::SIG_DFL);
    }
    let mut empty: libc::sigset_t = std::mem::zeroed();
    libc::sigemptyset(&mut empty);
    libc::sigprocmask(libc::SIG_SETMASK, &empty, std::ptr::null_mut());

    libc::execve(
        plan.program.as_ptr(),
        plan.argv_ptrs.as_ptr(),
        plan.envp_ptrs.as_ptr(),
    );
    report_and_exit(status_fd);
}

unsafe fn report_and_exit(status_fd: RawFd) -> ! {
    let errno = (Errno::last() as i32).to_ne_bytes();
    libc::write(status_fd, errno.as_ptr().cast(), errno.len());
    libc::_exit(EXEC_FAILED);
}

/// Set the window size on a PTY file descriptor
fn set_window_size(fd: RawFd, size: WindowSize) -> PtyResult<()> {
    let winsize = libc::winsize {
        ws_row: size.rows,
        ws_col: size.cols,
        ws_xpixel: size.pixel_width,
        ws_ypixel: size.pixel_height,
    };

    // SAFETY: TIOCSWINSZ is a valid ioctl for setting window size
    let result = unsafe { libc::ioctl(fd, libc::TIOCSWINSZ, &winsize) };

    if result < 0 {
        Err(PtyError::SetWinsize(Errno::last()))
    } else {
        Ok(())
    }
}

/// Get the window size from a PTY file descriptor
fn get_window_size(fd: RawFd) -> PtyResult<WindowSize> {
    let mut winsize = libc::winsize {
        ws_row: 0,
        ws_col: 0,
        ws_xpixel: 0,
        ws_ypixel: 0,
    };

    // SAFETY: TIOCGWINSZ is a valid ioctl for getting window size
    let result = unsafe { libc::ioctl(fd, libc::TIOCGWINSZ, &mut winsize) };

    if result < 0 {
        Err(PtyError::GetWinsize(Errno::last()))
    } else {
        Ok(WindowSize {
            rows: winsize.ws_row,
            cols: winsize.ws_col,
            pixel_width: winsize.ws_xpixel,
            pixel_height: winsize.ws_ypixel,
        })
    }
}
