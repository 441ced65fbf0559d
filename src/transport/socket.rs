//! Owned socket handle.
//!
//! [`SocketHandle`] is the single owner of one OS descriptor. Closing takes
//! the socket out of the guard and drops it, so the descriptor is released
//! exactly once no matter how many times `close` runs or whether the guard
//! is dropped afterwards.

use std::net::SocketAddr;
use std::os::fd::{AsRawFd, RawFd};

use socket2::{Domain, Protocol, Socket, Type};
use tracing::trace;

use crate::core::{SetupStage, TransportError, TransportResult};

/// Resource guard around an optional socket.
#[derive(Debug, Default)]
pub struct SocketHandle {
    socket: Option<Socket>,
}

impl SocketHandle {
    /// A guard with no handle.
    pub const fn empty() -> Self {
        Self { socket: None }
    }

    /// Allocate a new socket.
    pub fn open(domain: Domain, ty: Type, protocol: Option<Protocol>) -> TransportResult<Self> {
        let socket = Socket::new(domain, ty, protocol)
            .map_err(|err| TransportError::setup(SetupStage::Socket, err))?;
        trace!(fd = socket.as_raw_fd(), ?domain, ?ty, "socket opened");
        Ok(Self::from_socket(socket))
    }

    /// Take ownership of an already open socket (e.g. from `accept`).
    pub fn from_socket(socket: Socket) -> Self {
        Self {
            socket: Some(socket),
        }
    }

    /// Whether a handle is held.
    pub fn is_open(&self) -> bool {
        self.socket.is_some()
    }

    /// Borrow the socket, or fail with [`TransportError::NotOpen`].
    pub fn get(&self) -> TransportResult<&Socket> {
        self.socket.as_ref().ok_or(TransportError::NotOpen)
    }

    /// Raw descriptor while open.
    pub fn raw_fd(&self) -> Option<RawFd> {
        self.socket.as_ref().map(AsRawFd::as_raw_fd)
    }

    /// Local address of the socket.
    pub fn local_addr(&self) -> TransportResult<SocketAddr> {
        let addr = self
            .get()?
            .local_addr()
            .map_err(|err| TransportError::setup(SetupStage::Socket, err))?;
        addr.as_socket()
            .ok_or_else(|| TransportError::InvalidAddress(format!("{addr:?}")))
    }

    /// Release the handle. A second call is a no-op.
    pub fn close(&mut self) {
        if let Some(socket) = self.socket.take() {
            trace!(fd = socket.as_raw_fd(), "socket closed");
        }
    }

    /// Move the socket out, leaving the guard empty.
    pub fn take(&mut self) -> Option<Socket> {
        self.socket.take()
    }
}
