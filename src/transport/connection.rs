//! Outbound connection establishment.
//!
//! Implements the connect state machine shared by the stream and message
//! transports:
//!
//! ```text
//! Unstarted ──connect()──▶ HandshakePending ──writable + SO_ERROR == 0──▶ Connected
//!     │                          │
//!     │ immediate success        └── timeout / poll error / SO_ERROR != 0 ──▶ Failed
//!     └─────────────────────────────────────────────────────────────────────▶ Connected
//! ```
//!
//! With an infinite [`TimeoutPolicy`] the machine is skipped and a plain
//! blocking `connect` is issued. Entering `Failed` always closes the handle
//! before the error is returned.

use std::io;
use std::net::SocketAddr;

use socket2::{SockAddr, Socket};
use tracing::debug;

use super::readiness::{self, Interest, Readiness};
use super::socket::SocketHandle;
use super::timing::TimeoutPolicy;
use crate::core::{Operation, SetupStage, TransportError, TransportResult};

/// Connection lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectPhase {
    /// Nothing issued yet.
    Unstarted,
    /// Non-blocking connect issued, waiting for the handshake to settle.
    HandshakePending,
    /// Handshake completed; the socket is back in blocking mode.
    Connected,
    /// Handshake rejected or timed out; the handle has been closed.
    Failed,
}

/// Drives one outbound connect on a borrowed handle.
#[derive(Debug)]
pub struct ConnectionEstablisher<'a> {
    handle: &'a mut SocketHandle,
    target: SocketAddr,
    timeout: TimeoutPolicy,
    phase: ConnectPhase,
}

impl<'a> ConnectionEstablisher<'a> {
    /// Prepare a connect to `target` bounded by `timeout`.
    pub fn new(handle: &'a mut SocketHandle, target: SocketAddr, timeout: TimeoutPolicy) -> Self {
        Self {
            handle,
            target,
            timeout,
            phase: ConnectPhase::Unstarted,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> ConnectPhase {
        self.phase
    }

    /// Run the machine to `Connected` or `Failed`.
    pub fn establish(mut self) -> TransportResult<ConnectPhase> {
        let outcome = if self.timeout.is_infinite() {
            self.connect_blocking()
        } else {
            self.connect_bounded()
        };
        match outcome {
            Ok(()) => {
                self.phase = ConnectPhase::Connected;
                debug!(addr = %self.target, "connected");
                Ok(self.phase)
            }
            Err(err) => {
                self.phase = ConnectPhase::Failed;
                debug!(addr = %self.target, error = %err, "connect failed, closing handle");
                self.handle.close();
                Err(err)
            }
        }
    }

    fn connect_blocking(&mut self) -> TransportResult<()> {
        let socket = self.handle.get()?;
        debug!(addr = %self.target, "connecting (blocking)");
        socket
            .connect(&SockAddr::from(self.target))
            .map_err(TransportError::Connect)
    }

    fn connect_bounded(&mut self) -> TransportResult<()> {
        let socket = self.handle.get()?;
        debug!(addr = %self.target, timeout_ms = self.timeout.as_millis(), "connecting");
        socket
            .set_nonblocking(true)
            .map_err(|err| TransportError::setup(SetupStage::Mode, err))?;

        let result = match socket.connect(&SockAddr::from(self.target)) {
            Ok(()) => Ok(()),
            Err(err) if is_in_progress(&err) => {
                self.phase = ConnectPhase::HandshakePending;
                finish_handshake(socket, self.timeout)
            }
            Err(err) => Err(TransportError::Connect(err)),
        };

        // Leave transfers to the readiness wait, not to EAGAIN.
        socket
            .set_nonblocking(false)
            .map_err(|err| TransportError::setup(SetupStage::Mode, err))?;
        result
    }
}

fn finish_handshake(socket: &Socket, timeout: TimeoutPolicy) -> TransportResult<()> {
    match readiness::wait(socket, Interest::Writable, timeout.deadline()) {
        Ok(Readiness::Ready) => {}
        Ok(Readiness::TimedOut) => {
            return Err(TransportError::Timeout {
                op: Operation::Connect,
            });
        }
        Err(err) => return Err(TransportError::Connect(err)),
    }
    match socket.take_error() {
        Ok(None) => Ok(()),
        Ok(Some(pending)) => Err(TransportError::Connect(pending)),
        Err(err) => Err(TransportError::Connect(err)),
    }
}

fn is_in_progress(err: &io::Error) -> bool {
    err.raw_os_error() == Some(libc::EINPROGRESS) || err.kind() == io::ErrorKind::WouldBlock
}

/// Connect `handle` to `target`, closing it on failure.
pub fn connect(
    handle: &mut SocketHandle,
    target: SocketAddr,
    timeout: TimeoutPolicy,
) -> TransportResult<()> {
    ConnectionEstablisher::new(handle, target, timeout)
        .establish()
        .map(|_| ())
}
