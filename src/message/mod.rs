//! Tidewire - Message transport
//!
//! Multi-streamed, message-preserving SCTP associations over either address
//! family. Linux only.
//!
//! - [`MessageTransport`]: connect, then send/receive whole messages tagged
//!   with a stream number
//! - [`MessageListener`]: bind/listen/accept, with per-message delivery
//!   information enabled at bind time

mod listener;
#[allow(clippy::module_inception)]
mod message;
mod sctp;

pub use listener::*;
pub use message::*;
