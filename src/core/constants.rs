//! Fixed values shared by every transport.
//!
//! These are protocol and buffer ceilings, not tunables. Values that callers
//! may adjust live in [`TransportConfig`](super::TransportConfig).

// =============================================================================
// BUFFER SIZES
// =============================================================================

/// Per-read chunk used by the stream receive loop.
pub const STREAM_CHUNK_SIZE: usize = 4096;

/// Receive buffer ceiling for one datagram or one message.
pub const MAX_DATAGRAM_SIZE: usize = 65536;

// =============================================================================
// LISTENERS
// =============================================================================

/// Backlog used by `listen` when the caller does not pick one.
pub const DEFAULT_BACKLOG: i32 = 5;

// =============================================================================
// TIMEOUTS
// =============================================================================

/// Timeout value meaning "block indefinitely".
pub const NO_TIMEOUT_MS: u64 = 0;

// =============================================================================
// HTTP
// =============================================================================

/// Port used by the HTTP client unless overridden.
pub const HTTP_DEFAULT_PORT: u16 = 80;

/// Product token sent in the `User-Agent` header.
pub const USER_AGENT: &str = "Tidewire-HttpClient/1.0";

/// HTTP version token on the request line.
pub const HTTP_VERSION: &str = "HTTP/1.1";

// =============================================================================
// SCTP (Linux ABI)
// =============================================================================

/// Socket option level for SCTP options.
pub const SOL_SCTP: i32 = 132;

/// `SCTP_EVENTS` socket option.
pub const SCTP_EVENTS: i32 = 11;

/// Ancillary data type carrying `sctp_sndrcvinfo`.
pub const SCTP_SNDRCV: i32 = 1;

/// Stream tag used when the caller does not supply one.
pub const DEFAULT_STREAM: u16 = 0;
