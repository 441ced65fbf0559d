//! Hostname resolution.
//!
//! Transports never resolve names themselves; they consume a numeric
//! address picked from a [`Resolver`]'s answer.

use std::io;
use std::net::{SocketAddr, ToSocketAddrs};

use tracing::debug;

use super::error::{TransportError, TransportResult};
use super::family::{AddressFamily, Family};

/// Turns a hostname into candidate socket addresses.
pub trait Resolver {
    /// All addresses for `host` on `port`, in preference order.
    fn resolve(&self, host: &str, port: u16) -> io::Result<Vec<SocketAddr>>;
}

/// Resolver backed by the system (`getaddrinfo` via `ToSocketAddrs`).
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

impl Resolver for SystemResolver {
    fn resolve(&self, host: &str, port: u16) -> io::Result<Vec<SocketAddr>> {
        Ok((host, port).to_socket_addrs()?.collect())
    }
}

/// A fixed answer, for tests and for callers that resolve elsewhere.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    addrs: Vec<SocketAddr>,
}

impl StaticResolver {
    /// Resolve every host to `addrs`, with the port replaced by the caller's.
    pub fn new(addrs: Vec<SocketAddr>) -> Self {
        Self { addrs }
    }
}

impl Resolver for StaticResolver {
    fn resolve(&self, _host: &str, port: u16) -> io::Result<Vec<SocketAddr>> {
        Ok(self
            .addrs
            .iter()
            .map(|addr| SocketAddr::new(addr.ip(), port))
            .collect())
    }
}

/// First resolved address of family `F`.
pub fn resolve_first<F: AddressFamily, R: Resolver + ?Sized>(
    resolver: &R,
    host: &str,
    port: u16,
) -> TransportResult<SocketAddr> {
    let not_found = || TransportError::Resolve {
        host: host.to_string(),
        family: F::FAMILY,
    };
    let addrs = resolver.resolve(host, port).map_err(|err| {
        debug!(host, error = %err, "resolution failed");
        not_found()
    })?;
    addrs
        .into_iter()
        .find(|addr| Family::of(addr) == F::FAMILY)
        .ok_or_else(not_found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::family::{Inet4, Inet6};

    #[test]
    fn test_picks_first_of_family() {
        let resolver = StaticResolver::new(vec![
            "[::1]:0".parse().unwrap(),
            "10.0.0.1:0".parse().unwrap(),
            "10.0.0.2:0".parse().unwrap(),
        ]);
        let v4 = resolve_first::<Inet4, _>(&resolver, "example", 80).unwrap();
        assert_eq!(v4, "10.0.0.1:80".parse().unwrap());

        let v6 = resolve_first::<Inet6, _>(&resolver, "example", 8080).unwrap();
        assert_eq!(v6, "[::1]:8080".parse().unwrap());
    }

    #[test]
    fn test_no_address_of_family() {
        let resolver = StaticResolver::new(vec!["10.0.0.1:0".parse().unwrap()]);
        let err = resolve_first::<Inet6, _>(&resolver, "v4only", 80).unwrap_err();
        assert!(matches!(
            err,
            TransportError::Resolve {
                family: Family::V6,
                ..
            }
        ));
    }

    #[test]
    fn test_system_resolver_numeric() {
        let addrs = SystemResolver.resolve("127.0.0.1", 7).unwrap();
        assert_eq!(addrs, vec!["127.0.0.1:7".parse().unwrap()]);
    }
}
