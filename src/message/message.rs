//! Multi-streamed message transport.

use std::marker::PhantomData;
use std::net::SocketAddr;
use std::os::fd::RawFd;

use socket2::{Protocol, SockAddr, Socket, Type};
use tracing::{debug, trace};

use super::sctp::{self, Received};
use crate::core::constants::DEFAULT_STREAM;
use crate::core::{
    AddressFamily, Inet4, Inet6, Operation, SetupStage, Transport, TransportConfig,
    TransportError, TransportKind, TransportResult,
};
use crate::transport::readiness::Interest;
use crate::transport::transfer::await_ready;
use crate::transport::{self, SocketHandle, TimeoutPolicy};

/// One received message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Message body, at most 64 KiB.
    pub payload: Vec<u8>,
    /// Sender address, when the OS reported one.
    pub peer: Option<SocketAddr>,
    /// Stream tag, when delivery notifications are enabled on the socket.
    pub stream: Option<u16>,
}

/// SCTP transport over address family `F` (one-to-one style).
///
/// Connection-oriented like [`StreamTransport`](crate::stream::StreamTransport)
/// but message-preserving: each send is one message tagged with a stream
/// number, each receive returns one message. Stream tags are caller
/// metadata and are not validated.
///
/// A failed connect or transfer closes the handle before returning.
#[derive(Debug)]
pub struct MessageTransport<F: AddressFamily> {
    handle: SocketHandle,
    remote: Option<SocketAddr>,
    config: TransportConfig,
    _family: PhantomData<F>,
}

/// SCTP over IPv4.
pub type SctpV4 = MessageTransport<Inet4>;

/// SCTP over IPv6.
pub type SctpV6 = MessageTransport<Inet6>;

pub(crate) fn open_message<F: AddressFamily>() -> TransportResult<SocketHandle> {
    SocketHandle::open(
        F::domain(),
        Type::STREAM,
        Some(Protocol::from(libc::IPPROTO_SCTP)),
    )
}

impl<F: AddressFamily> MessageTransport<F> {
    /// Allocate an SCTP socket with default configuration.
    pub fn new() -> TransportResult<Self> {
        Self::with_config(TransportConfig::default())
    }

    /// Allocate an SCTP socket with `config`.
    pub fn with_config(config: TransportConfig) -> TransportResult<Self> {
        Ok(Self {
            handle: open_message::<F>()?,
            remote: None,
            config,
            _family: PhantomData,
        })
    }

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
            self.handle = open_message::<F>()?;
        }
        Ok(())
    }

    /// Bind the socket to the wildcard of `F` on `port`.
    pub fn bind_port(&mut self, port: u16) -> TransportResult<()> {
        let addr = F::wildcard(port);
        self.handle
            .get()?
            .bind(&SockAddr::from(addr))
            .map_err(|err| TransportError::setup(SetupStage::Bind, err))?;
        debug!(%addr, "message socket bound");
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

    /// Send one message on `stream` to the connected peer.
    pub fn send(&mut self, data: &[u8], stream: u16) -> TransportResult<usize> {
        self.send_message(data, None, stream)
    }

    /// Send one message on `stream` to `dest`.
    pub fn send_to(&mut self, data: &[u8], dest: SocketAddr, stream: u16) -> TransportResult<usize> {
        let dest = F::check(dest)?;
        self.send_message(data, Some(dest), stream)
    }

    fn send_message(
        &mut self,
        data: &[u8],
        dest: Option<SocketAddr>,
        stream: u16,
    ) -> TransportResult<usize> {
        let result = self.try_send(data, dest, stream);
        self.close_on_error(result)
    }

    fn try_send(&self, data: &[u8], dest: Option<SocketAddr>, stream: u16) -> TransportResult<usize> {
        let socket = self.handle.get()?;
        await_ready(socket, Interest::Writable, self.config.timeout, Operation::Send)?;
        let sent = sctp::send_message(socket, data, dest, stream)
            .map_err(|err| TransportError::transfer(Operation::Send, err))?;
        if sent != data.len() {
            return Err(TransportError::ShortSend {
                sent,
                expected: data.len(),
            });
        }
        trace!(len = sent, stream, "message sent");
        Ok(sent)
    }

    /// Receive one message with its sender and stream tag.
    pub fn receive_message(&mut self) -> TransportResult<Message> {
        let result = self.try_receive();
        self.close_on_error(result)
    }

    fn try_receive(&self) -> TransportResult<Message> {
        let socket = self.handle.get()?;
        let raw = loop {
            await_ready(socket, Interest::Readable, self.config.timeout, Operation::Receive)?;
            match sctp::receive_message(socket)
                .map_err(|err| TransportError::transfer(Operation::Receive, err))?
            {
                Received::Data(raw) => break raw,
                Received::Notification => trace!("notification skipped"),
            }
        };
        trace!(len = raw.payload.len(), stream = ?raw.stream, "message received");
        Ok(Message {
            payload: raw.payload,
            peer: raw.peer.or(self.remote),
            stream: raw.stream,
        })
    }

    fn close_on_error<T>(&mut self, result: TransportResult<T>) -> TransportResult<T> {
        if let Err(err) = &result {
            if self.handle.is_open() {
                debug!(fd = ?self.handle.raw_fd(), error = %err, "message transfer failed, closing handle");
                self.handle.close();
            }
        }
        result
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

impl<F: AddressFamily> Transport for MessageTransport<F> {
    fn kind(&self) -> TransportKind {
        TransportKind::Message
    }

    fn send(&mut self, data: &[u8]) -> TransportResult<usize> {
        MessageTransport::send(self, data, DEFAULT_STREAM)
    }

    fn receive(&mut self, max: usize) -> TransportResult<Vec<u8>> {
        let mut message = self.receive_message()?;
        message.payload.truncate(max);
        Ok(message.payload)
    }

    fn set_timeout(&mut self, timeout: TimeoutPolicy) {
        MessageTransport::set_timeout(self, timeout);
    }

    fn timeout(&self) -> TimeoutPolicy {
        MessageTransport::timeout(self)
    }

    fn close(&mut self) {
        MessageTransport::close(self);
    }

    fn is_open(&self) -> bool {
        MessageTransport::is_open(self)
    }
}
