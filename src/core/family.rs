//! Address families.
//!
//! Transports are generic over an [`AddressFamily`] marker so the IPv4 and
//! IPv6 variants share one implementation. A transport's family is fixed at
//! the type level and every address it is handed is checked against it.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6};

use socket2::Domain;

use super::error::{TransportError, TransportResult};

/// Runtime tag for an address family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    /// IPv4.
    V4,
    /// IPv6.
    V6,
}

impl Family {
    /// Family of a socket address.
    pub fn of(addr: &SocketAddr) -> Self {
        match addr {
            SocketAddr::V4(_) => Family::V4,
            SocketAddr::V6(_) => Family::V6,
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Family::V4 => f.write_str("IPv4"),
            Family::V6 => f.write_str("IPv6"),
        }
    }
}

/// Capability a transport needs from its address family.
pub trait AddressFamily: Send + Sync + 'static {
    /// Runtime tag.
    const FAMILY: Family;

    /// Socket domain constant for this family.
    fn domain() -> Domain;

    /// Wildcard address on `port`, used by passive sockets.
    fn wildcard(port: u16) -> SocketAddr;

    /// Build a socket address from a numeric address string.
    fn parse(ip: &str, port: u16) -> TransportResult<SocketAddr> {
        let ip: IpAddr = ip
            .trim()
            .parse()
            .map_err(|_| TransportError::InvalidAddress(ip.to_string()))?;
        Self::check(SocketAddr::new(ip, port))
    }

    /// Accept `addr` only if it belongs to this family.
    fn check(addr: SocketAddr) -> TransportResult<SocketAddr> {
        let actual = Family::of(&addr);
        if actual == Self::FAMILY {
            Ok(addr)
        } else {
            Err(TransportError::FamilyMismatch {
                expected: Self::FAMILY,
                actual,
            })
        }
    }
}

/// IPv4 marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Inet4;

/// IPv6 marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Inet6;

impl AddressFamily for Inet4 {
    const FAMILY: Family = Family::V4;

    fn domain() -> Domain {
        Domain::IPV4
    }

    fn wildcard(port: u16) -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port))
    }
}

impl AddressFamily for Inet6 {
    const FAMILY: Family = Family::V6;

    fn domain() -> Domain {
        Domain::IPV6
    }

    fn wildcard(port: u16) -> SocketAddr {
        SocketAddr::V6(SocketAddrV6::new(Ipv6Addr::UNSPECIFIED, port, 0, 0))
    }
}
