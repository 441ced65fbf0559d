//! Connectionless datagram transport.

use std::marker::PhantomData;
use std::net::SocketAddr;
use std::os::fd::RawFd;

use socket2::{SockAddr, Type};
use tracing::debug;

use crate::core::{
    AddressFamily, Inet4, Inet6, SetupStage, Transport, TransportConfig, TransportError,
    TransportKind, TransportResult,
};
use crate::transport::{transfer, SocketHandle, TimeoutPolicy};

/// UDP transport over address family `F`.
///
/// Either binds a port and serves (`bind`, then `receive_from`/`send_to`),
/// or sends fire-and-forget datagrams addressed per call. `set_address`
/// stores a default destination used by [`send`](Self::send). There is no
/// persistent peer.
///
/// Each call moves exactly one datagram. A timeout leaves the handle open
/// so the caller may wait again; OS errors are returned as is.
#[derive(Debug)]
pub struct DatagramTransport<F: AddressFamily> {
    handle: SocketHandle,
    destination: Option<SocketAddr>,
    config: TransportConfig,
    _family: PhantomData<F>,
}

/// UDP over IPv4.
pub type UdpV4 = DatagramTransport<Inet4>;

/// UDP over IPv6.
pub type UdpV6 = DatagramTransport<Inet6>;

impl<F: AddressFamily> DatagramTransport<F> {
    /// Allocate an unbound datagram socket.
    pub fn new() -> TransportResult<Self> {
        Self::with_config(TransportConfig::default())
    }

    /// Allocate an unbound datagram socket with `config`.
    pub fn with_config(config: TransportConfig) -> TransportResult<Self> {
        Ok(Self {
            handle: SocketHandle::open(F::domain(), Type::DGRAM, None)?,
            destination: None,
            config,
            _family: PhantomData,
        })
    }

    /// Allocate a socket bound to the wildcard of `F` on `port`.
    pub fn bind(port: u16) -> TransportResult<Self> {
        Self::bind_with_config(port, TransportConfig::default())
    }

    /// Allocate and bind with `config`.
    pub fn bind_with_config(port: u16, config: TransportConfig) -> TransportResult<Self> {
        let mut transport = Self::with_config(config)?;
        transport.bind_port(port)?;
        Ok(transport)
    }

    /// Bind the open socket to the wildcard of `F` on `port`.
    pub fn bind_port(&mut self, port: u16) -> TransportResult<()> {
        let addr = F::wildcard(port);
        self.handle
            .get()?
            .bind(&SockAddr::from(addr))
            .map_err(|err| TransportError::setup(SetupStage::Bind, err))?;
        debug!(%addr, "datagram socket bound");
        Ok(())
    }

    /// Set the default destination from a numeric address string.
    pub fn set_address(&mut self, ip: &str, port: u16) -> TransportResult<()> {
        self.destination = Some(F::parse(ip, port)?);
        Ok(())
    }

    /// Set the default destination.
    pub fn set_remote(&mut self, addr: SocketAddr) -> TransportResult<()> {
        self.destination = Some(F::check(addr)?);
        Ok(())
    }

    /// Default destination, if set.
    pub fn destination(&self) -> Option<SocketAddr> {
        self.destination
    }

    /// Send one datagram to `dest`.
    pub fn send_to(&mut self, data: &[u8], dest: SocketAddr) -> TransportResult<usize> {
        let dest = F::check(dest)?;
        transfer::send_datagram(self.handle.get()?, data, dest, self.config.timeout)?;
        Ok(data.len())
    }

    /// Send one datagram to the default destination.
    pub fn send(&mut self, data: &[u8]) -> TransportResult<usize> {
        let dest = self.destination.ok_or(TransportError::NoAddress)?;
        self.send_to(data, dest)
    }

    /// Receive one datagram and its source.
    pub fn receive_from(&mut self) -> TransportResult<(Vec<u8>, SocketAddr)> {
        transfer::receive_datagram(self.handle.get()?, self.config.timeout)
    }

    /// Receive one datagram, truncated to `max` bytes.
    pub fn receive(&mut self, max: usize) -> TransportResult<Vec<u8>> {
        let (mut payload, _) = self.receive_from()?;
        payload.truncate(max);
        Ok(payload)
    }

    /// Replace the timeout policy.
    pub fn set_timeout(&mut self, timeout: TimeoutPolicy) {
        self.config.timeout = timeout;
    }

    /// Current timeout policy.
    pub fn timeout(&self) -> TimeoutPolicy {
        self.config.timeout
    }

    /// Release the handle. A second call is a no-op.
    pub fn close(&mut self) {
        self.handle.close();
    }

    /// Whether a handle is held.
    pub fn is_open(&self) -> bool {
        self.handle.is_open()
    }

    /// Local address of the socket.
    pub fn local_addr(&self) -> TransportResult<SocketAddr> {
        self.handle.local_addr()
    }

    /// Owned descriptor while open.
    pub fn raw_fd(&self) -> Option<RawFd> {
        self.handle.raw_fd()
    }
}

impl<F: AddressFamily> Transport for DatagramTransport<F> {
    fn kind(&self) -> TransportKind {
        TransportKind::Datagram
    }

    fn send(&mut self, data: &[u8]) -> TransportResult<usize> {
        DatagramTransport::send(self, data)
    }

    fn receive(&mut self, max: usize) -> TransportResult<Vec<u8>> {
        DatagramTransport::receive(self, max)
    }

    fn set_timeout(&mut self, timeout: TimeoutPolicy) {
        DatagramTransport::set_timeout(self, timeout);
    }

    fn timeout(&self) -> TimeoutPolicy {
        DatagramTransport::timeout(self)
    }

    fn close(&mut self) {
        DatagramTransport::close(self);
    }

    fn is_open(&self) -> bool {
        DatagramTransport::is_open(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loopback(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    #[test]
    fn test_bind_and_exchange() {
        let mut server = UdpV4::bind(0).unwrap();
        server.set_timeout(TimeoutPolicy::from_millis(2_000));
        let server_port = server.local_addr().unwrap().port();

        let mut client = UdpV4::bind(0).unwrap();
        client.set_timeout(TimeoutPolicy::from_millis(2_000));
        client.set_address("127.0.0.1", server_port).unwrap();
        let client_port = client.local_addr().unwrap().port();

        assert_eq!(client.send(b"hello").unwrap(), 5);
        let (payload, source) = server.receive_from().unwrap();
        assert_eq!(payload, b"hello");
        assert_eq!(source, loopback(client_port));

        server.send_to(b"world", source).unwrap();
        assert_eq!(client.receive(1024).unwrap(), b"world");
    }

    #[test]
    fn test_one_datagram_per_receive() {
        let mut server = UdpV4::bind(0).unwrap();
        let port = server.local_addr().unwrap().port();
        let mut client = UdpV4::new().unwrap();

        client.send_to(b"first", loopback(port)).unwrap();
        client.send_to(b"second", loopback(port)).unwrap();

        assert_eq!(server.receive_from().unwrap().0, b"first");
        assert_eq!(server.receive_from().unwrap().0, b"second");
    }

    #[test]
    fn test_receive_truncates_to_max() {
        let mut server = UdpV4::bind(0).unwrap();
        let port = server.local_addr().unwrap().port();
        let mut client = UdpV4::new().unwrap();
        client.send_to(b"abcdef", loopback(port)).unwrap();
        assert_eq!(server.receive(3).unwrap(), b"abc");
    }

    #[test]
    fn test_timeout_keeps_handle_open() {
        let mut server = UdpV4::bind(0).unwrap();
        server.set_timeout(TimeoutPolicy::from_millis(20));
        let err = server.receive_from().unwrap_err();
        assert!(err.is_timeout());
        assert!(server.is_open());
    }

    #[test]
    fn test_send_without_destination() {
        let mut client = UdpV4::new().unwrap();
        assert!(matches!(client.send(b"x"), Err(TransportError::NoAddress)));
    }

    #[test]
    fn test_send_to_other_family_rejected() {
        let mut client = UdpV4::new().unwrap();
        let err = client
            .send_to(b"x", "[::1]:9".parse().unwrap())
            .unwrap_err();
        assert!(matches!(err, TransportError::FamilyMismatch { .. }));
    }

    #[test]
    fn test_dyn_transport() {
        let mut server = UdpV4::bind(0).unwrap();
        let port = server.local_addr().unwrap().port();
        let mut client = UdpV4::new().unwrap();
        client.set_remote(loopback(port)).unwrap();

        let transport: &mut dyn Transport = &mut client;
        assert_eq!(transport.kind(), TransportKind::Datagram);
        assert_eq!(transport.send(b"via trait").unwrap(), 9);
        assert_eq!(Transport::receive(&mut server, 64).unwrap(), b"via trait");
    }

    #[test]
    fn test_close_twice() {
        let mut udp = UdpV4::new().unwrap();
        udp.close();
        udp.close();
        assert!(matches!(udp.receive_from(), Err(TransportError::NotOpen)));
    }
}
