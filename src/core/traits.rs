//! Shared transport capability.

use super::error::TransportResult;
use crate::transport::TimeoutPolicy;

/// The closed set of transport variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    /// Connection-oriented byte stream (TCP).
    Stream,
    /// Connectionless datagrams (UDP).
    Datagram,
    /// Connection-oriented, message-preserving, multi-streamed (SCTP).
    Message,
}

/// Operations every transport supports.
///
/// Callers that treat transports uniformly hold a `&mut dyn Transport`
/// instead of a concrete type. Variant-specific operations (stream tags,
/// per-call destinations, source addresses) stay on the concrete types.
pub trait Transport {
    /// Which variant this is.
    fn kind(&self) -> TransportKind;

    /// Send `data` to the transport's peer or configured destination.
    ///
    /// Returns the number of bytes sent, which is always `data.len()`.
    fn send(&mut self, data: &[u8]) -> TransportResult<usize>;

    /// Receive up to `max` bytes.
    ///
    /// Streams accumulate until `max` or peer close; datagram and message
    /// transports return one unit truncated to `max`.
    fn receive(&mut self, max: usize) -> TransportResult<Vec<u8>>;

    /// Replace the timeout policy for subsequent blocking calls.
    fn set_timeout(&mut self, timeout: TimeoutPolicy);

    /// Current timeout policy.
    fn timeout(&self) -> TimeoutPolicy;

    /// Release the handle. Closing twice is a no-op.
    fn close(&mut self);

    /// Whether the transport holds an open handle.
    fn is_open(&self) -> bool;
}
