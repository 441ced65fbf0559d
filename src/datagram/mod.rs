//! Tidewire - Datagram transport
//!
//! Connectionless UDP over either address family. One call, one datagram.

#[allow(clippy::module_inception)]
mod datagram;

pub use datagram::*;
