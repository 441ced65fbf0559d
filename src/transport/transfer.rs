//! Transfer loops.
//!
//! Two disjoint policies:
//!
//! - **Stream**: `send_all` repeats partial writes until every byte is
//!   accepted; `receive_up_to` accumulates partial reads until the requested
//!   length or a graceful peer close (a *short read*, not an error).
//! - **Datagram**: exactly one OS send or receive per call, each bounded by
//!   one readiness wait. No accumulation and no partial retry.
//!
//! With a finite [`TimeoutPolicy`] every OS call is preceded by a readiness
//! wait with a fresh deadline, so the timeout bounds each idle period rather
//! than the whole transfer.

use std::io::{self, Read};
use std::mem::MaybeUninit;
use std::net::SocketAddr;

use socket2::{SockAddr, Socket};
use tracing::{debug, trace};

use super::readiness::{self, Interest, Readiness};
use super::socket::SocketHandle;
use super::timing::TimeoutPolicy;
use crate::core::constants::MAX_DATAGRAM_SIZE;
use crate::core::{Operation, TransportError, TransportResult};

#[cfg(target_os = "linux")]
pub(crate) const SEND_FLAGS: libc::c_int = libc::MSG_NOSIGNAL;
#[cfg(not(target_os = "linux"))]
pub(crate) const SEND_FLAGS: libc::c_int = 0;

/// Wait for `interest` under `timeout`, mapping the outcome to transport
/// errors. Infinite policies skip the wait.
pub(crate) fn await_ready(
    socket: &Socket,
    interest: Interest,
    timeout: TimeoutPolicy,
    op: Operation,
) -> TransportResult<()> {
    if timeout.is_infinite() {
        return Ok(());
    }
    match readiness::wait(socket, interest, timeout.deadline()) {
        Ok(Readiness::Ready) => Ok(()),
        Ok(Readiness::TimedOut) => Err(TransportError::Timeout { op }),
        Err(err) => Err(TransportError::transfer(op, err)),
    }
}

/// Closes the handle when a connection-bound transfer fails.
fn close_on_error<T>(handle: &mut SocketHandle, result: TransportResult<T>) -> TransportResult<T> {
    if let Err(err) = &result {
        debug!(fd = ?handle.raw_fd(), error = %err, "transfer failed, closing handle");
        handle.close();
    }
    result
}

// =============================================================================
// STREAM POLICY
// =============================================================================

/// Write all of `data`, or fail.
///
/// A write error, a zero-length write or a timeout fails the whole call and
/// closes the handle; how much was consumed before that is not reported as
/// success.
pub fn send_all(
    handle: &mut SocketHandle,
    data: &[u8],
    timeout: TimeoutPolicy,
) -> TransportResult<usize> {
    let result = write_loop(handle.get()?, data, timeout);
    close_on_error(handle, result)
}

fn write_loop(socket: &Socket, data: &[u8], timeout: TimeoutPolicy) -> TransportResult<usize> {
    let mut sent = 0;
    while sent < data.len() {
        await_ready(socket, Interest::Writable, timeout, Operation::Send)?;
        match socket.send_with_flags(&data[sent..], SEND_FLAGS) {
            Ok(0) => return Err(TransportError::PeerClosed { sent }),
            Ok(n) => {
                sent += n;
                trace!(n, sent, total = data.len(), "partial write");
            }
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(TransportError::transfer(Operation::Send, err)),
        }
    }
    Ok(sent)
}

/// Read until `max` bytes are collected or the peer closes.
///
/// A peer close returns everything gathered so far as success. An OS error
/// after some bytes arrived ends the read the same way; an OS error before
/// any byte, or a timeout, fails the call and closes the handle.
pub fn receive_up_to(
    handle: &mut SocketHandle,
    max: usize,
    chunk_size: usize,
    timeout: TimeoutPolicy,
) -> TransportResult<Vec<u8>> {
    let result = read_loop(handle.get()?, max, chunk_size, timeout);
    close_on_error(handle, result)
}

/// Like [`receive_up_to`], but appends into `out` so bytes read before a
/// failure stay with the caller. Returns how many bytes this call added.
///
/// The handle is closed on the same conditions as [`receive_up_to`].
pub fn receive_into(
    handle: &mut SocketHandle,
    out: &mut Vec<u8>,
    max: usize,
    chunk_size: usize,
    timeout: TimeoutPolicy,
) -> TransportResult<usize> {
    let result = read_into(handle.get()?, out, max, chunk_size, timeout);
    close_on_error(handle, result)
}

fn read_loop(
    socket: &Socket,
    max: usize,
    chunk_size: usize,
    timeout: TimeoutPolicy,
) -> TransportResult<Vec<u8>> {
    let mut received = Vec::with_capacity(max.min(MAX_DATAGRAM_SIZE));
    read_into(socket, &mut received, max, chunk_size, timeout)?;
    Ok(received)
}

fn read_into(
    socket: &Socket,
    out: &mut Vec<u8>,
    max: usize,
    chunk_size: usize,
    timeout: TimeoutPolicy,
) -> TransportResult<usize> {
    let start = out.len();
    let mut chunk = vec![0u8; chunk_size.max(1)];
    let mut reader = socket;
    while out.len() - start < max {
        await_ready(socket, Interest::Readable, timeout, Operation::Receive)?;
        let want = chunk.len().min(max - (out.len() - start));
        match reader.read(&mut chunk[..want]) {
            Ok(0) => {
                debug!(len = out.len() - start, max, "peer closed, short read");
                break;
            }
            Ok(n) => out.extend_from_slice(&chunk[..n]),
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) if out.len() > start => {
                debug!(len = out.len() - start, error = %err, "read error after data, short read");
                break;
            }
            Err(err) => return Err(TransportError::transfer(Operation::Receive, err)),
        }
    }
    Ok(out.len() - start)
}

// =============================================================================
// DATAGRAM POLICY
// =============================================================================

/// Send one datagram to `dest`. Anything short of the full payload is an
/// error.
pub fn send_datagram(
    socket: &Socket,
    data: &[u8],
    dest: SocketAddr,
    timeout: TimeoutPolicy,
) -> TransportResult<()> {
    await_ready(socket, Interest::Writable, timeout, Operation::Send)?;
    let sent = socket
        .send_to_with_flags(data, &SockAddr::from(dest), SEND_FLAGS)
        .map_err(|err| TransportError::transfer(Operation::Send, err))?;
    trace!(len = sent, %dest, "datagram sent");
    if sent != data.len() {
        return Err(TransportError::ShortSend {
            sent,
            expected: data.len(),
        });
    }
    Ok(())
}

/// Receive exactly one datagram (up to [`MAX_DATAGRAM_SIZE`] bytes) and its
/// source address.
pub fn receive_datagram(
    socket: &Socket,
    timeout: TimeoutPolicy,
) -> TransportResult<(Vec<u8>, SocketAddr)> {
    await_ready(socket, Interest::Readable, timeout, Operation::Receive)?;
    let mut buf = vec![MaybeUninit::<u8>::uninit(); MAX_DATAGRAM_SIZE];
    let (len, source) = loop {
        match socket.recv_from(&mut buf) {
            Ok(done) => break done,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(TransportError::transfer(Operation::Receive, err)),
        }
    };
    let source = source
        .as_socket()
        .ok_or_else(|| TransportError::InvalidAddress(format!("{source:?}")))?;
    trace!(len, %source, "datagram received");
    Ok((initialized(&buf[..len]).to_vec(), source))
}

/// View the prefix of a receive buffer that the kernel filled in.
pub(crate) fn initialized(buf: &[MaybeUninit<u8>]) -> &[u8] {
    // SAFETY: callers pass only the prefix the OS reported as written, and
    // `MaybeUninit<u8>` has the same layout as `u8`.
    unsafe { &*(buf as *const [MaybeUninit<u8>] as *const [u8]) }
}
