//! Passive stream listener.

use std::io;
use std::marker::PhantomData;
use std::net::SocketAddr;
use std::os::fd::RawFd;

use socket2::{SockAddr, Type};
use tracing::debug;

use super::stream::StreamTransport;
use crate::core::{
    AddressFamily, Inet4, Inet6, Operation, SetupStage, TransportConfig, TransportError,
    TransportResult,
};
use crate::transport::SocketHandle;

/// Bind/listen/accept wrapper producing [`StreamTransport`]s.
///
/// `accept` blocks with no listener-level timeout. Each accepted transport
/// owns its new handle outright; the listener's handle is unaffected, and
/// the listener and its connections can be dropped in any order.
#[derive(Debug)]
pub struct StreamListener<F: AddressFamily> {
    handle: SocketHandle,
    port: u16,
    config: TransportConfig,
    _family: PhantomData<F>,
}

/// TCP listener over IPv4.
pub type TcpListenerV4 = StreamListener<Inet4>;

/// TCP listener over IPv6.
pub type TcpListenerV6 = StreamListener<Inet6>;

impl<F: AddressFamily> StreamListener<F> {
    /// Bind the wildcard address of `F` on `port` (`0` picks one).
    pub fn bind(port: u16) -> TransportResult<Self> {
        Self::bind_with_config(port, TransportConfig::default())
    }

    /// Bind with `config`; accepted transports inherit it.
    ///
    /// If binding fails the handle is released before returning.
    pub fn bind_with_config(port: u16, config: TransportConfig) -> TransportResult<Self> {
        let handle = SocketHandle::open(F::domain(), Type::STREAM, None)?;
        let socket = handle.get()?;
        if config.reuse_address {
            socket
                .set_reuse_address(true)
                .map_err(|err| TransportError::setup(SetupStage::SocketOption, err))?;
        }
        let addr = F::wildcard(port);
        socket
            .bind(&SockAddr::from(addr))
            .map_err(|err| TransportError::setup(SetupStage::Bind, err))?;
        let port = handle.local_addr()?.port();
        debug!(%addr, port, "stream listener bound");
        Ok(Self {
            handle,
            port,
            config,
            _family: PhantomData,
        })
    }

    /// Start accepting with the configured backlog.
    pub fn listen(&mut self) -> TransportResult<()> {
        self.listen_with_backlog(self.config.backlog)
    }

    /// Start accepting with `backlog`.
    ///
    /// On failure the handle stays bound; close or drop the listener.
    pub fn listen_with_backlog(&mut self, backlog: i32) -> TransportResult<()> {
        self.handle
            .get()?
            .listen(backlog)
            .map_err(|err| TransportError::setup(SetupStage::Listen, err))?;
        debug!(port = self.port, backlog, "stream listener listening");
        Ok(())
    }

    /// Block until a peer connects.
    pub fn accept(&self) -> TransportResult<StreamTransport<F>> {
        let socket = self.handle.get()?;
        let (conn, peer) = loop {
            match socket.accept() {
                Ok(pair) => break pair,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(TransportError::transfer(Operation::Accept, err)),
            }
        };
        let peer = peer.as_socket();
        debug!(peer = ?peer, port = self.port, "accepted connection");
        Ok(StreamTransport::from_accepted(conn, peer, self.config.clone()))
    }

    /// Bound port (resolved when bound to `0`).
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Bound local address.
    pub fn local_addr(&self) -> TransportResult<SocketAddr> {
        self.handle.local_addr()
    }

    /// Listening descriptor while open.
    pub fn raw_fd(&self) -> Option<RawFd> {
        self.handle.raw_fd()
    }

    /// Release the listening handle. Accepted transports stay open.
    pub fn close(&mut self) {
        self.handle.close();
    }

    /// Whether the listening handle is held.
    pub fn is_open(&self) -> bool {
        self.handle.is_open()
    }
}
