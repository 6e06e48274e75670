// terminal.rs

use nix::sys::termios::{tcgetattr, tcsetattr, LocalFlags, SetArg, Termios};
use nix::unistd::{isatty, read};
use std::io;
use std::os::unix::io::RawFd;
use tracing::{debug, warn};

/// Keeps a terminal in non-canonical, no-echo mode for as long as it lives.
///
/// The attributes captured by [`RawMode::enable`] are put back on drop, so every
/// way out of the shell loop restores the user's terminal.
pub struct RawMode {
    fd: RawFd,
    saved: Termios,
}

impl RawMode {
    pub fn enable(fd: RawFd) -> nix::Result<Self> {
        let saved = tcgetattr(fd)?;
        let mut raw = saved.clone();
        raw.local_flags.remove(LocalFlags::ICANON | LocalFlags::ECHO);
        tcsetattr(fd, SetArg::TCSAFLUSH, &raw)?;
        debug!(fd, "terminal switched to raw mode");
        Ok(Self { fd, saved })
    }

    /// Enables raw mode only when `fd` is a terminal.
    pub fn enable_if_tty(fd: RawFd) -> nix::Result<Option<Self>> {
        if !isatty(fd).unwrap_or(false) {
            debug!(fd, "not a terminal, line editing stays byte-oriented without raw mode");
            return Ok(None);
        }
        Self::enable(fd).map(Some)
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        if let Err(e) = tcsetattr(self.fd, SetArg::TCSAFLUSH, &self.saved) {
            warn!(fd = self.fd, error = %e, "failed to restore terminal attributes");
        } else {
            debug!(fd = self.fd, "terminal attributes restored");
        }
    }
}

/// Unbuffered reader over a raw descriptor.
///
/// Each `read` is one `read(2)` call, so bytes past the current line stay in
/// the descriptor for the next child process to consume.
#[derive(Debug, Clone, Copy)]
pub struct FdReader {
    fd: RawFd,
}

impl FdReader {
    pub fn new(fd: RawFd) -> Self {
        Self { fd }
    }

    pub fn stdin() -> Self {
        Self::new(libc::STDIN_FILENO)
    }
}

impl io::Read for FdReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        read(self.fd, buf).map_err(io::Error::from)
    }
}
