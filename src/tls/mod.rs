//! Tidewire - TLS configuration
//!
//! Session parameters only. No handshake is implemented.

mod config;

pub use config::*;
