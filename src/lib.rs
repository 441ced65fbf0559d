//! # Tidewire
//!
//! Blocking socket transports with per-transport deadlines.
//!
//! Tidewire offers one uniform shape over three OS transports, each
//! dual-stacked over IPv4 and IPv6:
//!
//! - **Stream**: reliable, ordered byte streams (TCP) with a passive listener
//! - **Datagram**: connectionless, one-call-one-datagram (UDP)
//! - **Message**: multi-streamed, message-preserving associations (SCTP)
//!
//! Every blocking step (connect, send, receive) waits at most the transport's
//! [`TimeoutPolicy`](transport::TimeoutPolicy); zero means wait forever. A
//! thin HTTP/1.1 client rides on the stream transport.
//!
//! ## Feature Flags
//!
//! - `stream` (default): TCP transport and listener
//! - `datagram` (default): UDP transport
//! - `message` (default): SCTP transport and listener (Linux only)
//! - `http` (default): HTTP request client, implies `stream`
//! - `tls` (default): TLS configuration holder
//!
//! ## Modules
//!
//! - [`core`]: errors, address families, configuration, resolution, the
//!   [`Transport`](core::Transport) trait (always included)
//! - [`transport`]: handle ownership, deadlines, readiness wait, connect
//!   and transfer loops (always included)
//! - [`stream`], [`datagram`], [`message`], [`http`], [`tls`]: feature-gated
//!
//! ## Example Usage
//!
//! ```no_run
//! use tidewire::prelude::*;
//!
//! let mut listener = TcpListenerV4::bind(0)?;
//! listener.listen()?;
//! let port = listener.port();
//!
//! let mut client = TcpV4::new()?;
//! client.set_timeout(TimeoutPolicy::from_millis(1_000));
//! client.set_address("127.0.0.1", port)?;
//! client.connect()?;
//!
//! let mut server = listener.accept()?;
//! client.send(b"ping")?;
//! assert_eq!(server.receive(4)?, b"ping");
//! # Ok::<(), TransportError>(())
//! ```

#![warn(missing_docs)]
#![deny(unsafe_op_in_unsafe_fn)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Core module (always included)
pub mod core;

// Transport machinery (always included)
pub mod transport;

// Byte-stream transport (feature-gated)
#[cfg(feature = "stream")]
#[cfg_attr(docsrs, doc(cfg(feature = "stream")))]
pub mod stream;

// Datagram transport (feature-gated)
#[cfg(feature = "datagram")]
#[cfg_attr(docsrs, doc(cfg(feature = "datagram")))]
pub mod datagram;

// Message transport (feature-gated, Linux only)
#[cfg(all(feature = "message", target_os = "linux"))]
#[cfg_attr(docsrs, doc(cfg(all(feature = "message", target_os = "linux"))))]
pub mod message;

// HTTP client (feature-gated)
#[cfg(feature = "http")]
#[cfg_attr(docsrs, doc(cfg(feature = "http")))]
pub mod http;

// TLS configuration (feature-gated)
#[cfg(feature = "tls")]
#[cfg_attr(docsrs, doc(cfg(feature = "tls")))]
pub mod tls;

/// Prelude module for convenient imports.
pub mod prelude {
    // Core traits and types
    pub use crate::core::*;

    pub use crate::transport::{Deadline, TimeoutPolicy};

    #[cfg(feature = "stream")]
    pub use crate::stream::*;

    #[cfg(feature = "datagram")]
    pub use crate::datagram::*;

    #[cfg(all(feature = "message", target_os = "linux"))]
    pub use crate::message::*;

    #[cfg(feature = "http")]
    pub use crate::http::{HttpClient, HttpV4, HttpV6, Method, RequestBuilder};

    #[cfg(feature = "tls")]
    pub use crate::tls::TlsConfig;
}

// Re-export commonly used items at crate root
pub use core::{Transport, TransportConfig, TransportError, TransportKind, TransportResult};
pub use transport::TimeoutPolicy;
