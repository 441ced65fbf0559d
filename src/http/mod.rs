//! Tidewire - HTTP client
//!
//! Request composition plus a thin client that drives one request per
//! stream connection and returns the raw response.
//!
//! ```text
//! RequestBuilder ──► bytes ──► StreamTransport::send
//!                               StreamTransport::receive ──► raw response
//! ```

mod client;
mod request;

pub use client::*;
pub use request::*;
