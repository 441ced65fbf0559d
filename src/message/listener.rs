//! Passive message listener.

use std::io;
use std::marker::PhantomData;
use std::net::SocketAddr;
use std::os::fd::RawFd;

use socket2::SockAddr;
use tracing::debug;

use super::message::{open_message, MessageTransport};
use super::sctp;
use crate::core::{
    AddressFamily, Inet4, Inet6, Operation, SetupStage, TransportConfig, TransportError,
    TransportResult,
};
use crate::transport::SocketHandle;

/// Bind/listen/accept wrapper producing [`MessageTransport`] peers.
///
/// Binding turns on per-message delivery information once, so every
/// accepted peer reports the stream tag of each received message. This is
/// a fixed property of the listener, not a tunable.
#[derive(Debug)]
pub struct MessageListener<F: AddressFamily> {
    handle: SocketHandle,
    port: u16,
    config: TransportConfig,
    _family: PhantomData<F>,
}

/// SCTP listener over IPv4.
pub type SctpListenerV4 = MessageListener<Inet4>;

/// SCTP listener over IPv6.
pub type SctpListenerV6 = MessageListener<Inet6>;

impl<F: AddressFamily> MessageListener<F> {
    /// Bind the wildcard address of `F` on `port` (`0` picks one).
    pub fn bind(port: u16) -> TransportResult<Self> {
        Self::bind_with_config(port, TransportConfig::default())
    }

    /// Bind with `config`; accepted peers inherit it.
    pub fn bind_with_config(port: u16, config: TransportConfig) -> TransportResult<Self> {
        let handle = open_message::<F>()?;
        let socket = handle.get()?;
        if config.reuse_address {
            socket
                .set_reuse_address(true)
                .map_err(|err| TransportError::setup(SetupStage::SocketOption, err))?;
        }
        sctp::subscribe_data_io(socket)
            .map_err(|err| TransportError::setup(SetupStage::SocketOption, err))?;
        let addr = F::wildcard(port);
        socket
            .bind(&SockAddr::from(addr))
            .map_err(|err| TransportError::setup(SetupStage::Bind, err))?;
        let port = handle.local_addr()?.port();
        debug!(%addr, port, "message listener bound");
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
    pub fn listen_with_backlog(&mut self, backlog: i32) -> TransportResult<()> {
        self.handle
            .get()?
            .listen(backlog)
            .map_err(|err| TransportError::setup(SetupStage::Listen, err))?;
        debug!(port = self.port, backlog, "message listener listening");
        Ok(())
    }

    /// Block until a peer associates.
    pub fn accept(&self) -> TransportResult<MessageTransport<F>> {
        let socket = self.handle.get()?;
        let (conn, peer) = loop {
            match socket.accept() {
                Ok(pair) => break pair,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(TransportError::transfer(Operation::Accept, err)),
            }
        };
        let peer = peer.as_socket();
        debug!(peer = ?peer, port = self.port, "accepted association");
        Ok(MessageTransport::from_accepted(conn, peer, self.config.clone()))
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

    /// Release the listening handle. Accepted peers stay open.
    pub fn close(&mut self) {
        self.handle.close();
    }

    /// Whether the listening handle is held.
    pub fn is_open(&self) -> bool {
        self.handle.is_open()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    use super::*;
    use crate::core::{Transport, TransportKind};
    use crate::transport::TimeoutPolicy;

    /// Bind a listener, or `None` when the kernel has no SCTP.
    fn listener_or_skip() -> Option<SctpListenerV4> {
        match SctpListenerV4::bind(0) {
            Ok(listener) => Some(listener),
            Err(err) => {
                eprintln!("skipping SCTP test: {err}");
                None
            }
        }
    }

    #[test]
    fn test_stream_tags_reach_the_server() {
        let Some(mut listener) = listener_or_skip() else {
            return;
        };
        listener.listen().unwrap();
        let port = listener.port();

        let client = thread::spawn(move || {
            let mut client = MessageTransport::<Inet4>::new().unwrap();
            client.set_timeout(TimeoutPolicy::from_millis(2_000));
            client.set_address("127.0.0.1", port).unwrap();
            client.connect().unwrap();
            client.send(b"on three", 3).unwrap();
            client.send(b"on zero", 0).unwrap();
            client.receive_message().unwrap()
        });

        let mut peer = listener.accept().unwrap();
        peer.set_timeout(TimeoutPolicy::from_millis(2_000));

        let first = peer.receive_message().unwrap();
        assert_eq!(first.payload, b"on three");
        assert_eq!(first.stream, Some(3));

        let second = peer.receive_message().unwrap();
        assert_eq!(second.payload, b"on zero");
        assert_eq!(second.stream, Some(0));

        peer.send(b"reply", 1).unwrap();
        let reply = client.join().unwrap();
        assert_eq!(reply.payload, b"reply");
    }

    #[test]
    fn test_message_boundaries_preserved() {
        let Some(mut listener) = listener_or_skip() else {
            return;
        };
        listener.listen().unwrap();
        let port = listener.port();

        let client = thread::spawn(move || {
            let mut client = MessageTransport::<Inet4>::new().unwrap();
            client
                .connect_to(SocketAddr::from(([127, 0, 0, 1], port)))
                .unwrap();
            for chunk in [&b"a"[..], b"bb", b"ccc"] {
                Transport::send(&mut client, chunk).unwrap();
            }
            client
        });

        let mut peer = listener.accept().unwrap();
        assert_eq!(peer.kind(), TransportKind::Message);
        assert_eq!(Transport::receive(&mut peer, 64).unwrap(), b"a");
        assert_eq!(Transport::receive(&mut peer, 64).unwrap(), b"bb");
        assert_eq!(Transport::receive(&mut peer, 64).unwrap(), b"ccc");
        drop(client.join().unwrap());
    }

    #[test]
    fn test_receive_timeout_closes_peer() {
        let Some(mut listener) = listener_or_skip() else {
            return;
        };
        listener.listen().unwrap();
        let port = listener.port();

        let mut client = MessageTransport::<Inet4>::new().unwrap();
        client
            .connect_to(SocketAddr::from(([127, 0, 0, 1], port)))
            .unwrap();
        let _peer = listener.accept().unwrap();

        client.set_timeout(TimeoutPolicy::from_millis(30));
        let err = client.receive_message().unwrap_err();
        assert!(err.is_timeout());
        assert!(!client.is_open());
    }

    #[test]
    fn test_notifications_skipped_within_deadline() {
        let Some(mut listener) = listener_or_skip() else {
            return;
        };
        sctp::subscribe_data_io_and_association(listener.handle.get().unwrap()).unwrap();
        listener.listen().unwrap();
        let port = listener.port();

        let mut client = MessageTransport::<Inet4>::new().unwrap();
        client
            .connect_to(SocketAddr::from(([127, 0, 0, 1], port)))
            .unwrap();
        let mut peer = listener.accept().unwrap();
        peer.set_timeout(TimeoutPolicy::from_millis(100));

        // The association-up event is queued ahead of any data; the receive
        // must still honour the deadline rather than block on it.
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let first = peer.receive_message();
            tx.send(first).unwrap();
        });
        let outcome = rx.recv_timeout(Duration::from_secs(3)).unwrap();
        assert!(outcome.unwrap_err().is_timeout());
        drop(client);
    }

    #[test]
    fn test_data_after_notification() {
        let Some(mut listener) = listener_or_skip() else {
            return;
        };
        sctp::subscribe_data_io_and_association(listener.handle.get().unwrap()).unwrap();
        listener.listen().unwrap();
        let port = listener.port();

        let mut client = MessageTransport::<Inet4>::new().unwrap();
        client
            .connect_to(SocketAddr::from(([127, 0, 0, 1], port)))
            .unwrap();
        let mut peer = listener.accept().unwrap();
        peer.set_timeout(TimeoutPolicy::from_millis(2_000));
        client.send(b"after event", 2).unwrap();

        let message = peer.receive_message().unwrap();
        assert_eq!(message.payload, b"after event");
        assert_eq!(message.stream, Some(2));
    }

    #[test]
    fn test_raw_fd_until_closed() {
        let Some(mut listener) = listener_or_skip() else {
            return;
        };
        assert!(listener.raw_fd().is_some());
        listener.close();
        assert!(listener.raw_fd().is_none());
        assert!(matches!(listener.accept(), Err(TransportError::NotOpen)));
    }
}
