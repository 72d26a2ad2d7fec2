// Console line discipline: raw mode guard and unbuffered byte input
//
// The guard is the only place that mutates terminal attributes. It restores
// the captured attributes on release() or drop, whichever comes first.

use std::io::{self, Read};
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, RawFd};
use std::sync::atomic::{AtomicBool, Ordering};

fn get_attrs(fd: RawFd) -> io::Result<libc::termios> {
    // SAFETY: termios is plain old data; tcgetattr fully initializes it on success
    unsafe {
        let mut attrs: libc::termios = std::mem::zeroed();
        if libc::tcgetattr(fd, &mut attrs) != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(attrs)
    }
}

fn set_attrs(fd: RawFd, attrs: &libc::termios) -> io::Result<()> {
    // SAFETY: attrs points to a valid termios for the duration of the call
    if unsafe { libc::tcsetattr(fd, libc::TCSANOW, attrs) } != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Derive raw-mode attributes: no line buffering, no echo, a read returns
/// as soon as one byte is available. Signal keys (Ctrl-C) stay active.
fn make_raw(attrs: &mut libc::termios) {
    attrs.c_lflag &= !(libc::ICANON | libc::ECHO);
    attrs.c_cc[libc::VMIN] = 1;
    attrs.c_cc[libc::VTIME] = 0;
}

/// Holds the console in raw mode until released or dropped
pub struct TerminalModeGuard {
    fd: RawFd,
    snapshot: libc::termios,
    raw_active: AtomicBool,
}

impl TerminalModeGuard {
    /// Capture the current attributes of `console` and switch it to raw mode
    pub fn acquire(console: &impl AsRawFd) -> io::Result<Self> {
        let fd = console.as_raw_fd();
        let snapshot = get_attrs(fd)?;

        let mut raw = snapshot;
        make_raw(&mut raw);
        set_attrs(fd, &raw)?;

        Ok(Self {
            fd,
            snapshot,
            raw_active: AtomicBool::new(true),
        })
    }

    /// Restore the captured attributes. Later calls are no-ops.
    ///
    /// Async-signal-safe: one atomic swap and one tcsetattr, no allocation.
    pub fn release(&self) -> io::Result<()> {
        if !self.raw_active.swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        set_attrs(self.fd, &self.snapshot)
    }

    pub fn is_raw(&self) -> bool {
        self.raw_active.load(Ordering::SeqCst)
    }

    /// Attributes captured at acquire time
    pub fn snapshot(&self) -> &libc::termios {
        &self.snapshot
    }
}

impl Drop for TerminalModeGuard {
    fn drop(&mut self) {
        // Best-effort restore on early return or panic
        let _ = self.release();
    }
}

/// Unbuffered console input: every read() is exactly one read(2)
#[derive(Debug, Clone, Copy)]
pub struct ConsoleInput {
    fd: RawFd,
}

impl ConsoleInput {
    pub fn stdin() -> Self {
        Self {
            fd: libc::STDIN_FILENO,
        }
    }
}

impl AsRawFd for ConsoleInput {
    fn as_raw_fd(&self) -> RawFd {
        self.fd
    }
}

impl AsFd for ConsoleInput {
    fn as_fd(&self) -> BorrowedFd<'_> {
        // SAFETY: the standard descriptors stay open for the process lifetime
        unsafe { BorrowedFd::borrow_raw(self.fd) }
    }
}

impl Read for ConsoleInput {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        // SAFETY: buf is valid for writes of buf.len() bytes
        let n = unsafe { libc::read(self.fd, buf.as_mut_ptr().cast(), buf.len()) };
        if n < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(n as usize)
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{open_pty, same_attrs};
    use super::*;

    #[test]
    fn test_acquire_enters_raw_mode() {
        let pty = open_pty();
        let before = pty.slave_attrs();
        assert_ne!(before.c_lflag & libc::ICANON, 0, "pty should start cooked");

        let guard = TerminalModeGuard::acquire(&pty.slave).unwrap();
        let live = pty.slave_attrs();
        assert_eq!(live.c_lflag & (libc::ICANON | libc::ECHO), 0);
        assert_ne!(live.c_lflag & libc::ISIG, 0, "Ctrl-C must still signal");
        assert_eq!(live.c_cc[libc::VMIN], 1);
        assert_eq!(live.c_cc[libc::VTIME], 0);
        assert!(guard.is_raw());
        assert!(same_attrs(guard.snapshot(), &before));
    }

    #[test]
    fn test_acquire_release_restores_identical_attrs() {
        let pty = open_pty();
        let before = pty.slave_attrs();

        let guard = TerminalModeGuard::acquire(&pty.slave).unwrap();
        guard.release().unwrap();

        let after = pty.slave_attrs();
        assert!(same_attrs(&before, &after));
        assert!(!guard.is_raw());
    }

    #[test]
    fn test_release_is_idempotent() {
        let pty = open_pty();
        let before = pty.slave_attrs();

        let guard = TerminalModeGuard::acquire(&pty.slave).unwrap();
        guard.release().unwrap();
        let once = pty.slave_attrs();

        // Change the terminal behind the guard's back; a repeated release
        // must not touch it again
        let mut other = once;
        other.c_lflag &= !libc::ECHO;
        set_attrs(pty.slave.as_raw_fd(), &other).unwrap();
        guard.release().unwrap();
        guard.release().unwrap();
        let later = pty.slave_attrs();

        assert!(same_attrs(&before, &once));
        assert!(same_attrs(&other, &later));
    }

    #[test]
    fn test_drop_restores() {
        let pty = open_pty();
        let before = pty.slave_attrs();
        {
            let _guard = TerminalModeGuard::acquire(&pty.slave).unwrap();
        }
        let after = pty.slave_attrs();
        assert!(same_attrs(&before, &after));
    }

    #[test]
    fn test_acquire_fails_on_non_terminal() {
        let file = tempfile::tempfile().unwrap();
        let err = TerminalModeGuard::acquire(&file).err().unwrap();
        assert_eq!(err.raw_os_error(), Some(libc::ENOTTY));
    }

    #[test]
    fn test_console_input_reads_one_byte_at_a_time() {
        let mut file = tempfile::tempfile().unwrap();
        std::io::Write::write_all(&mut file, b"\x1b[A").unwrap();
        std::io::Seek::rewind(&mut file).unwrap();

        let mut input = ConsoleInput {
            fd: file.as_raw_fd(),
        };
        let mut byte = [0u8; 1];
        let mut seen = Vec::new();
        while input.read(&mut byte).unwrap() == 1 {
            seen.push(byte[0]);
        }
        assert_eq!(seen, b"\x1b[A");
    }
}
