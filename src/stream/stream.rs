//! Connection-oriented byte-stream transport.

use std::marker::PhantomData;
use std::net::SocketAddr;
use std::os::fd::RawFd;

use socket2::{Socket, Type};
use tracing::debug;

use crate::core::{
    AddressFamily, Inet4, Inet6, Transport, TransportConfig, TransportError, TransportKind,
    TransportResult,
};
use crate::transport::{self, transfer, SocketHandle, TimeoutPolicy};

/// TCP transport over address family `F`.
///
/// Created with an open handle, optionally addressed, connected, used for
/// I/O and closed once. A failed connect or transfer closes the handle
/// before the error is returned; after that [`reopen`](Self::reopen)
/// allocates a fresh one.
///
/// # Example
///
/// ```no_run
/// use tidewire::stream::TcpV4;
/// use tidewire::transport::TimeoutPolicy;
///
/// let mut tcp = TcpV4::new().unwrap();
/// tcp.set_timeout(TimeoutPolicy::from_millis(2_000));
/// tcp.set_address("127.0.0.1", 7).unwrap();
/// tcp.connect().unwrap();
/// tcp.send(b"ping").unwrap();
/// let echo = tcp.receive(4).unwrap();
/// ```
#[derive(Debug)]
pub struct StreamTransport<F: AddressFamily> {
    handle: SocketHandle,
    remote: Option<SocketAddr>,
    config: TransportConfig,
    _family: PhantomData<F>,
}

/// TCP over IPv4.
pub type TcpV4 = StreamTransport<Inet4>;

/// TCP over IPv6.
pub type TcpV6 = StreamTransport<Inet6>;

impl<F: AddressFamily> StreamTransport<F> {
    /// Allocate a stream socket with default configuration.
    pub fn new() -> TransportResult<Self> {
        Self::with_config(TransportConfig::default())
    }

    /// Allocate a stream socket with `config`.
    pub fn with_config(config: TransportConfig) -> TransportResult<Self> {
        Ok(Self {
            handle: open_stream::<F>()?,
            remote: None,
            config,
            _family: PhantomData,
        })
    }

    /// Wrap a socket produced by a listener's `accept`.
    pub(crate) fn from_accepted(
        socket: Socket,
        peer: Option<SocketAddr>,
        config: TransportConfig,
    ) -> Self {
        Self {
            handle: SocketHandle::from_socket(socket),
            remote: peer,
            config,
            _family: PhantomData,
        }
    }

    /// Allocate a fresh handle after a close. No-op while open.
    pub fn reopen(&mut self) -> TransportResult<()> {
        if !self.handle.is_open() {
            self.handle = open_stream::<F>()?;
        }
        Ok(())
    }

    /// Set the peer from a numeric address string.
    pub fn set_address(&mut self, ip: &str, port: u16) -> TransportResult<()> {
        self.remote = Some(F::parse(ip, port)?);
        Ok(())
    }

    /// Set the peer address.
    pub fn set_remote(&mut self, addr: SocketAddr) -> TransportResult<()> {
        self.remote = Some(F::check(addr)?);
        Ok(())
    }

    /// Connect to the configured peer under the current timeout policy.
    pub fn connect(&mut self) -> TransportResult<()> {
        let target = self.remote.ok_or(TransportError::NoAddress)?;
        transport::connect(&mut self.handle, target, self.config.timeout)
    }

    /// Set the peer and connect.
    pub fn connect_to(&mut self, addr: SocketAddr) -> TransportResult<()> {
        self.set_remote(addr)?;
        self.connect()
    }

    /// Send every byte of `data`; partial sends are failures.
    pub fn send(&mut self, data: &[u8]) -> TransportResult<usize> {
        transfer::send_all(&mut self.handle, data, self.config.timeout)
    }

    /// Receive up to `max` bytes, fewer only if the peer closed.
    pub fn receive(&mut self, max: usize) -> TransportResult<Vec<u8>> {
        transfer::receive_up_to(
            &mut self.handle,
            max,
            self.config.chunk_size,
            self.config.timeout,
        )
    }

    /// Receive up to `max` bytes onto the end of `out`, returning how many
    /// were added. Bytes read before a failure remain in `out`.
    pub fn receive_into(&mut self, out: &mut Vec<u8>, max: usize) -> TransportResult<usize> {
        transfer::receive_into(
            &mut self.handle,
            out,
            max,
            self.config.chunk_size,
            self.config.timeout,
        )
    }

    /// Receive until the peer closes.
    pub fn receive_to_end(&mut self) -> TransportResult<Vec<u8>> {
        let mut all = Vec::new();
        self.receive_to_end_into(&mut all)?;
        Ok(all)
    }

    /// Append everything up to the peer's close onto `out`.
    pub(crate) fn receive_to_end_into(&mut self, out: &mut Vec<u8>) -> TransportResult<usize> {
        let chunk = self.config.chunk_size.max(1);
        let start = out.len();
        loop {
            if self.receive_into(out, chunk)? < chunk {
                return Ok(out.len() - start);
            }
        }
    }

    /// Replace the timeout policy.
    pub fn set_timeout(&mut self, timeout: TimeoutPolicy) {
        self.config.timeout = timeout;
    }

    /// Current timeout policy.
    pub fn timeout(&self) -> TimeoutPolicy {
        self.config.timeout
    }

    /// Active configuration.
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Release the handle. A second call is a no-op.
    pub fn close(&mut self) {
        if self.handle.is_open() {
            debug!(fd = ?self.handle.raw_fd(), "closing stream");
        }
        self.handle.close();
    }

    /// Whether a handle is held.
    pub fn is_open(&self) -> bool {
        self.handle.is_open()
    }

    /// Peer address, as configured or as reported by `accept`.
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.remote
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

impl<F: AddressFamily> Transport for StreamTransport<F> {
    fn kind(&self) -> TransportKind {
        TransportKind::Stream
    }

    fn send(&mut self, data: &[u8]) -> TransportResult<usize> {
        StreamTransport::send(self, data)
    }

    fn receive(&mut self, max: usize) -> TransportResult<Vec<u8>> {
        StreamTransport::receive(self, max)
    }

    fn set_timeout(&mut self, timeout: TimeoutPolicy) {
        StreamTransport::set_timeout(self, timeout);
    }

    fn timeout(&self) -> TimeoutPolicy {
        StreamTransport::timeout(self)
    }

    fn close(&mut self) {
        StreamTransport::close(self);
    }

    fn is_open(&self) -> bool {
        StreamTransport::is_open(self)
    }
}

fn open_stream<F: AddressFamily>() -> TransportResult<SocketHandle> {
    SocketHandle::open(F::domain(), Type::STREAM, None)
}
