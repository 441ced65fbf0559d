//! Tidewire - Transport machinery
//!
//! The timeout-bounded I/O core shared by every protocol variant:
//!
//! - **Handle ownership**: [`SocketHandle`] releases its descriptor exactly once
//! - **Timeouts**: [`TimeoutPolicy`] per transport, [`Deadline`] per wait
//! - **Readiness wait**: [`readiness::wait`], the only suspension point
//! - **Connection establishment**: [`ConnectionEstablisher`], a non-blocking
//!   connect driven to completion or timeout
//! - **Transfer loops**: [`transfer`], stream accumulation and single-shot
//!   datagram transfer
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │   Stream / Datagram / Message / HTTP    │
//! ├─────────────────────────────────────────┤
//! │  ConnectionEstablisher   TransferLoop   │  ← This module
//! ├─────────────────────────────────────────┤
//! │   ReadinessWait (poll)   SocketHandle   │
//! ├─────────────────────────────────────────┤
//! │            OS sockets                   │
//! └─────────────────────────────────────────┘
//! ```

mod connection;
pub mod readiness;
mod socket;
mod timing;
pub mod transfer;

pub use connection::{connect, ConnectPhase, ConnectionEstablisher};
pub use readiness::{Interest, Readiness};
pub use socket::SocketHandle;
pub use timing::{Deadline, TimeoutPolicy};
