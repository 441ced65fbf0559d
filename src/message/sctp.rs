//! Raw SCTP calls.
//!
//! `socket2` covers allocation, bind, listen and connect for SCTP sockets;
//! per-message stream numbers travel as `SCTP_SNDRCV` ancillary data, which
//! needs `sendmsg`/`recvmsg` directly. Structures follow the Linux ABI
//! (`<linux/sctp.h>`).

use std::io;
use std::mem;
use std::net::SocketAddr;
use std::os::fd::AsRawFd;
use std::ptr;

use socket2::{SockAddr, Socket};

use crate::core::constants::{MAX_DATAGRAM_SIZE, SCTP_EVENTS, SCTP_SNDRCV, SOL_SCTP};
use crate::transport::transfer::SEND_FLAGS;

/// `MSG_NOTIFICATION`: the message is an event, not user data.
const MSG_NOTIFICATION: libc::c_int = 0x8000;

/// `struct sctp_sndrcvinfo`.
#[repr(C)]
#[derive(Debug, Default, Clone, Copy)]
struct SndRcvInfo {
    sinfo_stream: u16,
    sinfo_ssn: u16,
    sinfo_flags: u16,
    sinfo_ppid: u32,
    sinfo_context: u32,
    sinfo_timetolive: u32,
    sinfo_tsn: u32,
    sinfo_cumtsn: u32,
    sinfo_assoc_id: i32,
}

/// Leading fields of `struct sctp_event_subscribe`. The kernel accepts a
/// prefix of the full structure.
#[repr(C)]
#[derive(Debug, Default, Clone, Copy)]
struct EventSubscribe {
    data_io: u8,
    association: u8,
    address: u8,
    send_failure: u8,
    peer_error: u8,
    shutdown: u8,
    partial_delivery: u8,
    adaptation_layer: u8,
    authentication: u8,
    sender_dry: u8,
}

/// One received message.
#[derive(Debug)]
pub(crate) struct RawMessage {
    pub payload: Vec<u8>,
    pub peer: Option<SocketAddr>,
    pub stream: Option<u16>,
}

/// Turn on per-message `sctp_sndrcvinfo` delivery.
pub(crate) fn subscribe_data_io(socket: &Socket) -> io::Result<()> {
    subscribe(
        socket,
        &EventSubscribe {
            data_io: 1,
            ..EventSubscribe::default()
        },
    )
}

/// Also deliver association change notifications.
#[cfg(test)]
pub(crate) fn subscribe_data_io_and_association(socket: &Socket) -> io::Result<()> {
    subscribe(
        socket,
        &EventSubscribe {
            data_io: 1,
            association: 1,
            ..EventSubscribe::default()
        },
    )
}

fn subscribe(socket: &Socket, events: &EventSubscribe) -> io::Result<()> {
    // SAFETY: `events` outlives the call and the length matches its size.
    let rc = unsafe {
        libc::setsockopt(
            socket.as_raw_fd(),
            SOL_SCTP,
            SCTP_EVENTS,
            (events as *const EventSubscribe).cast::<libc::c_void>(),
            mem::size_of::<EventSubscribe>() as libc::socklen_t,
        )
    };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Aligned scratch space for one `sctp_sndrcvinfo` control message.
fn control_buffer() -> (Vec<u64>, usize) {
    // SAFETY: pure arithmetic on a constant length.
    let space = unsafe { libc::CMSG_SPACE(mem::size_of::<SndRcvInfo>() as libc::c_uint) } as usize;
    (vec![0u64; space.div_ceil(mem::size_of::<u64>())], space)
}

/// Send one message on `stream`, to `dest` or to the connected peer.
pub(crate) fn send_message(
    socket: &Socket,
    data: &[u8],
    dest: Option<SocketAddr>,
    stream: u16,
) -> io::Result<usize> {
    let dest = dest.map(SockAddr::from);
    let info = SndRcvInfo {
        sinfo_stream: stream,
        ..SndRcvInfo::default()
    };
    let (mut control, space) = control_buffer();
    let mut iov = libc::iovec {
        iov_base: data.as_ptr() as *mut libc::c_void,
        iov_len: data.len(),
    };

    // SAFETY: every pointer stored in `msg` refers to a local that outlives
    // the `sendmsg` call; the control buffer is sized with CMSG_SPACE and
    // aligned for `cmsghdr`.
    let sent = unsafe {
        let mut msg: libc::msghdr = mem::zeroed();
        if let Some(addr) = &dest {
            msg.msg_name = addr.as_ptr() as *mut libc::c_void;
            msg.msg_namelen = addr.len();
        }
        msg.msg_iov = &mut iov;
        msg.msg_iovlen = 1;
        msg.msg_control = control.as_mut_ptr().cast::<libc::c_void>();
        msg.msg_controllen = space as _;

        let cmsg = libc::CMSG_FIRSTHDR(&msg);
        (*cmsg).cmsg_level = SOL_SCTP;
        (*cmsg).cmsg_type = SCTP_SNDRCV;
        (*cmsg).cmsg_len = libc::CMSG_LEN(mem::size_of::<SndRcvInfo>() as libc::c_uint) as _;
        ptr::write_unaligned(libc::CMSG_DATA(cmsg).cast::<SndRcvInfo>(), info);

        libc::sendmsg(socket.as_raw_fd(), &msg, SEND_FLAGS)
    };
    if sent < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(sent as usize)
}

/// What one `recvmsg` produced.
#[derive(Debug)]
pub(crate) enum Received {
    /// A user message.
    Data(RawMessage),
    /// An event notification, already consumed.
    Notification,
}

/// Receive one message or notification.
///
/// Exactly one `recvmsg` per call, so callers can wait for readiness again
/// before the next one. Returns `UnexpectedEof` when the association has
/// been shut down.
pub(crate) fn receive_message(socket: &Socket) -> io::Result<Received> {
    let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
    let (mut control, space) = control_buffer();
    let mut iov = libc::iovec {
        iov_base: buf.as_mut_ptr().cast::<libc::c_void>(),
        iov_len: buf.len(),
    };

    // SAFETY: `try_init` hands us storage for one socket address and its
    // length; `msg` only points at that storage and at locals that outlive
    // the `recvmsg` call.
    let ((len, flags, stream), addr) = unsafe {
        SockAddr::try_init(|storage, addr_len| {
            let mut msg: libc::msghdr = mem::zeroed();
            msg.msg_name = storage.cast::<libc::c_void>();
            msg.msg_namelen = *addr_len;
            msg.msg_iov = &mut iov;
            msg.msg_iovlen = 1;
            msg.msg_control = control.as_mut_ptr().cast::<libc::c_void>();
            msg.msg_controllen = space as _;

            let received = libc::recvmsg(socket.as_raw_fd(), &mut msg, 0);
            if received < 0 {
                return Err(io::Error::last_os_error());
            }
            *addr_len = msg.msg_namelen;
            Ok((received as usize, msg.msg_flags, stream_of(&msg)))
        })?
    };

    if flags & MSG_NOTIFICATION != 0 {
        return Ok(Received::Notification);
    }
    if len == 0 {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "association shut down",
        ));
    }
    Ok(Received::Data(RawMessage {
        payload: buf[..len].to_vec(),
        peer: addr.as_socket(),
        stream,
    }))
}

/// Stream number from an `SCTP_SNDRCV` control message, if present.
///
/// # Safety
///
/// `msg` must come from a completed `recvmsg` whose control buffer is
/// still alive.
unsafe fn stream_of(msg: &libc::msghdr) -> Option<u16> {
    // SAFETY: guaranteed by the caller; the CMSG_* walkers stay within
    // `msg_controllen`.
    unsafe {
        let mut cmsg = libc::CMSG_FIRSTHDR(msg);
        while !cmsg.is_null() {
            if (*cmsg).cmsg_level == SOL_SCTP && (*cmsg).cmsg_type == SCTP_SNDRCV {
                let info = ptr::read_unaligned(libc::CMSG_DATA(cmsg).cast::<SndRcvInfo>());
                return Some(info.sinfo_stream);
            }
            cmsg = libc::CMSG_NXTHDR(msg, cmsg);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sndrcvinfo_layout() {
        assert_eq!(mem::size_of::<SndRcvInfo>(), 32);
    }

    #[test]
    fn test_control_buffer_fits_header_and_info() {
        let (control, space) = control_buffer();
        assert!(space >= mem::size_of::<libc::cmsghdr>() + mem::size_of::<SndRcvInfo>());
        assert!(control.len() * mem::size_of::<u64>() >= space);
    }
}
