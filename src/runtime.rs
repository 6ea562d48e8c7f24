//! Process-level plumbing for the REPL binary.
//!
//! Covers the SIGINT flag, a stdin reader that wakes up on it, a line reader
//! that notices it, and the tracing subscriber setup. The signal handler sets
//! an atomic flag and writes one byte to a self-pipe. Stdin reads poll that
//! pipe together with fd 0, so a signal that lands between the flag check
//! and the read still ends the wait.

use anyhow::Result;
use std::io::{self, BufRead, ErrorKind, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing_subscriber::EnvFilter;

#[cfg(unix)]
use std::os::fd::RawFd;
#[cfg(unix)]
use std::sync::atomic::AtomicI32;

/// Filter directives for the stderr log, e.g. `RECORDBOOK_LOG=debug`.
pub const LOG_ENV: &str = "RECORDBOOK_LOG";
const DEFAULT_LOG_FILTER: &str = "warn";

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

// Self-pipe ends; -1 until the handler is installed.
#[cfg(unix)]
static WAKE_READ: AtomicI32 = AtomicI32::new(-1);
#[cfg(unix)]
static WAKE_WRITE: AtomicI32 = AtomicI32::new(-1);

/// Route `tracing` events to stderr so stdout carries only REPL output.
pub fn init_logging() {
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

/// Whether SIGINT has arrived since the handler was installed.
pub fn interrupted() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}

#[cfg(unix)]
extern "C" fn on_sigint(_signal: libc::c_int) {
    INTERRUPTED.store(true, Ordering::SeqCst);
    let fd = WAKE_WRITE.load(Ordering::SeqCst);
    if fd >= 0 {
        let byte = 1u8;
        // SAFETY: write(2) is async-signal-safe. The pipe is non-blocking and
        // a full pipe already holds a pending wakeup.
        unsafe {
            libc::write(fd, (&byte as *const u8).cast(), 1);
        }
    }
}

/// Install the SIGINT handler without `SA_RESTART`, so a read blocked on the
/// terminal fails with `EINTR` instead of resuming, and open the self-pipe
/// that [`InterruptibleStdin`] polls.
#[cfg(unix)]
pub fn install_interrupt_handler() -> Result<()> {
    use anyhow::Context;

    let (read_end, write_end) = wake_pipe().context("creating SIGINT wake pipe")?;
    WAKE_READ.store(read_end, Ordering::SeqCst);
    WAKE_WRITE.store(write_end, Ordering::SeqCst);

    let handler = on_sigint as extern "C" fn(libc::c_int);
    // SAFETY: the action is fully initialized before use and the handler only
    // touches atomics and write(2).
    let rc = unsafe {
        let mut action: libc::sigaction = std::mem::zeroed();
        action.sa_sigaction = handler as libc::sighandler_t;
        action.sa_flags = 0;
        libc::sigemptyset(&mut action.sa_mask);
        libc::sigaction(libc::SIGINT, &action, std::ptr::null_mut())
    };
    if rc != 0 {
        return Err(io::Error::last_os_error()).context("installing SIGINT handler");
    }
    Ok(())
}

#[cfg(not(unix))]
pub fn install_interrupt_handler() -> Result<()> {
    Ok(())
}

/// A non-blocking, close-on-exec pipe.
#[cfg(unix)]
fn wake_pipe() -> io::Result<(RawFd, RawFd)> {
    let mut fds: [libc::c_int; 2] = [-1, -1];
    // SAFETY: `fds` has room for the two descriptors pipe(2) writes.
    if unsafe { libc::pipe(fds.as_mut_ptr()) } != 0 {
        return Err(io::Error::last_os_error());
    }
    for fd in fds {
        // SAFETY: `fd` was just returned by pipe(2).
        let ok = unsafe {
            let flags = libc::fcntl(fd, libc::F_GETFL);
            flags >= 0
                && libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) == 0
                && libc::fcntl(fd, libc::F_SETFD, libc::FD_CLOEXEC) == 0
        };
        if !ok {
            return Err(io::Error::last_os_error());
        }
    }
    Ok((fds[0], fds[1]))
}

#[cfg(unix)]
#[derive(Debug, PartialEq, Eq)]
pub enum Readiness {
    Input,
    Woken,
}

/// Block until `input` is readable (or hung up) or `wake` has a byte.
///
/// A negative `wake` is ignored by poll(2). `EINTR` surfaces as
/// [`ErrorKind::Interrupted`].
#[cfg(unix)]
pub fn wait_readable(input: RawFd, wake: RawFd) -> io::Result<Readiness> {
    let mut fds = [
        libc::pollfd {
            fd: input,
            events: libc::POLLIN,
            revents: 0,
        },
        libc::pollfd {
            fd: wake,
            events: libc::POLLIN,
            revents: 0,
        },
    ];
    // SAFETY: `fds` is a valid array of two initialized pollfd entries.
    let rc = unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, -1) };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }
    if fds[1].revents != 0 {
        return Ok(Readiness::Woken);
    }
    Ok(Readiness::Input)
}

/// Unbuffered stdin whose reads fail with `Interrupted` once SIGINT has
/// been delivered, even if the signal arrived before the read began.
///
/// Reads fd 0 directly; `io::stdin()` keeps its own buffer, which would hide
/// pending input from poll(2). Wrap it in a `BufReader`.
#[derive(Debug, Default)]
pub struct InterruptibleStdin;

#[cfg(unix)]
impl Read for InterruptibleStdin {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let wake = WAKE_READ.load(Ordering::SeqCst);
        if wait_readable(libc::STDIN_FILENO, wake)? == Readiness::Woken {
            return Err(io::Error::from(ErrorKind::Interrupted));
        }
        // SAFETY: `buf` is valid for `buf.len()` writable bytes.
        let read = unsafe { libc::read(libc::STDIN_FILENO, buf.as_mut_ptr().cast(), buf.len()) };
        if read < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(read as usize)
    }
}

#[cfg(not(unix))]
impl Read for InterruptibleStdin {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        io::stdin().read(buf)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ReadOutcome {
    /// One line without its terminator.
    Line(String),
    Eof,
    Interrupted,
}

/// Read one line, giving up when SIGINT has been flagged.
///
/// `BufRead::read_line` retries on `EINTR`, which would keep the REPL blocked
/// after Ctrl-C; this reader checks the flag on every interrupted fill.
pub fn read_line<R: BufRead>(reader: &mut R) -> io::Result<ReadOutcome> {
    let mut line = Vec::new();
    loop {
        if interrupted() {
            return Ok(ReadOutcome::Interrupted);
        }
        let available = match reader.fill_buf() {
            Ok(available) => available,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        };
        if available.is_empty() {
            if line.is_empty() {
                return Ok(ReadOutcome::Eof);
            }
            break;
        }
        match available.iter().position(|&byte| byte == b'\n') {
            Some(end) => {
                line.extend_from_slice(&available[..end]);
                reader.consume(end + 1);
                break;
            }
            None => {
                let len = available.len();
                line.extend_from_slice(available);
                reader.consume(len);
            }
        }
    }
    if line.last() == Some(&b'\r') {
        line.pop();
    }
    String::from_utf8(line)
        .map(ReadOutcome::Line)
        .map_err(|err| io::Error::new(ErrorKind::InvalidData, err))
}
