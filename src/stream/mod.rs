//! Tidewire - Stream transport
//!
//! Reliable, ordered byte streams (TCP) over either address family:
//! [`StreamTransport`] for the client side and for accepted connections,
//! [`StreamListener`] for the passive side.

mod listener;
#[allow(clippy::module_inception)]
mod stream;

pub use listener::*;
pub use stream::*;
