//! Readiness wait.
//!
//! The only suspension point in the crate: block until a socket is readable
//! or writable, or until a [`Deadline`] passes. Built on `poll(2)`.

use std::io;
use std::os::fd::AsRawFd;

use socket2::Socket;
use tracing::trace;

use super::timing::Deadline;

/// Direction to wait for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interest {
    /// Data (or EOF, or an error) is available to read.
    Readable,
    /// The send buffer has room, or a pending connect completed.
    Writable,
}

impl Interest {
    fn events(self) -> libc::c_short {
        match self {
            Interest::Readable => libc::POLLIN,
            Interest::Writable => libc::POLLOUT,
        }
    }
}

/// Outcome of a successful wait. OS failures come back as `Err`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// The socket satisfies the interest. Error and hang-up conditions count
    /// as ready; the following I/O call reports them.
    Ready,
    /// The deadline passed first.
    TimedOut,
}

/// Block until `socket` satisfies `interest` or `deadline` passes.
///
/// With [`Deadline::Never`] this only returns `Ready` or an error. Signal
/// interruptions are retried against the same absolute deadline.
pub fn wait(socket: &Socket, interest: Interest, deadline: Deadline) -> io::Result<Readiness> {
    let fd = socket.as_raw_fd();
    loop {
        let timeout = deadline.poll_timeout();
        let mut pollfd = libc::pollfd {
            fd,
            events: interest.events(),
            revents: 0,
        };
        // SAFETY: `pollfd` is a valid, exclusively borrowed array of length 1
        // for the duration of the call.
        let rc = unsafe { libc::poll(&mut pollfd, 1, timeout) };
        match rc {
            0 => {
                trace!(fd, ?interest, "readiness wait timed out");
                return Ok(Readiness::TimedOut);
            }
            n if n > 0 => return Ok(Readiness::Ready),
            _ => {
                let err = io::Error::last_os_error();
                if err.kind() != io::ErrorKind::Interrupted {
                    return Err(err);
                }
                if deadline.is_expired() {
                    return Ok(Readiness::TimedOut);
                }
            }
        }
    }
}
