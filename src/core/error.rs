//! Error types for Tidewire transports.
//!
//! Every failure is reported by the lowest layer that observes it. Timeouts
//! are kept apart from OS errors so callers can tell "retry later" from
//! "give up".

use std::fmt;
use std::io;

use thiserror::Error;

use super::family::Family;

/// The blocking step an error was raised from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Outbound connection handshake.
    Connect,
    /// Waiting for an inbound connection.
    Accept,
    /// Writing bytes, a datagram or a message.
    Send,
    /// Reading bytes, a datagram or a message.
    Receive,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Connect => "connect",
            Operation::Accept => "accept",
            Operation::Send => "send",
            Operation::Receive => "receive",
        };
        f.write_str(name)
    }
}

/// Setup steps that can fail before any data moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SetupStage {
    /// Allocating the socket handle.
    Socket,
    /// Setting a socket option.
    SocketOption,
    /// Binding to a local address.
    Bind,
    /// Marking a bound socket as passive.
    Listen,
    /// Switching between blocking and non-blocking mode.
    Mode,
}

impl fmt::Display for SetupStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SetupStage::Socket => "socket",
            SetupStage::SocketOption => "setsockopt",
            SetupStage::Bind => "bind",
            SetupStage::Listen => "listen",
            SetupStage::Mode => "fcntl",
        };
        f.write_str(name)
    }
}

/// Coarse failure classes surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// No address found for the target.
    Resolution,
    /// Invalid address, handle allocation, bind or listen failure.
    Setup,
    /// Handshake rejected by the peer or the OS.
    Connect,
    /// Send/receive OS error or peer closed mid-write.
    Transfer,
    /// A blocking step ran past its deadline.
    Timeout,
}

/// Transport layer errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Hostname resolution produced no usable address.
    #[error("no {family} address found for {host:?}")]
    Resolve {
        /// Host that failed to resolve.
        host: String,
        /// Family that was requested.
        family: Family,
    },

    /// Address text is not a numeric address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Address belongs to the other family.
    #[error("address family mismatch: expected {expected}, got {actual}")]
    FamilyMismatch {
        /// Family of the transport.
        expected: Family,
        /// Family of the offered address.
        actual: Family,
    },

    /// No destination has been configured.
    #[error("no remote address set")]
    NoAddress,

    /// The transport has no open handle (never opened or already closed).
    #[error("transport is not open")]
    NotOpen,

    /// Socket allocation, option, bind or listen failure.
    #[error("{stage} failed: {source}")]
    Setup {
        /// Step that failed.
        stage: SetupStage,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },

    /// Handshake explicitly rejected.
    #[error("connect failed: {0}")]
    Connect(#[source] io::Error),

    /// Send or receive OS error.
    #[error("{op} failed: {source}")]
    Transfer {
        /// Step that failed.
        op: Operation,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },

    /// A stream write made no progress; the peer is gone.
    #[error("peer closed the stream after {sent} bytes")]
    PeerClosed {
        /// Bytes accepted by the OS before the failing write.
        sent: usize,
    },

    /// A datagram or message went out shorter than the payload.
    #[error("short send: {sent} of {expected} bytes")]
    ShortSend {
        /// Bytes the OS reported as sent.
        sent: usize,
        /// Payload length.
        expected: usize,
    },

    /// The deadline elapsed while waiting.
    #[error("{op} timed out")]
    Timeout {
        /// Step that timed out.
        op: Operation,
    },
}

impl TransportError {
    /// Wrap an OS error raised during setup.
    pub fn setup(stage: SetupStage, source: io::Error) -> Self {
        TransportError::Setup { stage, source }
    }

    /// Wrap an OS error raised during transfer.
    pub fn transfer(op: Operation, source: io::Error) -> Self {
        TransportError::Transfer { op, source }
    }

    /// Classify the error.
    pub fn kind(&self) -> FailureKind {
        match self {
            TransportError::Resolve { .. } => FailureKind::Resolution,
            TransportError::InvalidAddress(_)
            | TransportError::FamilyMismatch { .. }
            | TransportError::NoAddress
            | TransportError::NotOpen
            | TransportError::Setup { .. } => FailureKind::Setup,
            TransportError::Connect(_) => FailureKind::Connect,
            TransportError::Transfer { .. }
            | TransportError::PeerClosed { .. }
            | TransportError::ShortSend { .. } => FailureKind::Transfer,
            TransportError::Timeout { .. } => FailureKind::Timeout,
        }
    }

    /// Check if a deadline elapsed.
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout { .. })
    }

    /// Check if connection establishment failed, by rejection or by timeout.
    pub fn is_connect_failure(&self) -> bool {
        matches!(
            self,
            TransportError::Connect(_)
                | TransportError::Timeout {
                    op: Operation::Connect
                }
        )
    }

    /// OS error number, where one was observed.
    pub fn os_error(&self) -> Option<i32> {
        match self {
            TransportError::Setup { source, .. }
            | TransportError::Connect(source)
            | TransportError::Transfer { source, .. } => source.raw_os_error(),
            _ => None,
        }
    }
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;
