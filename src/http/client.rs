//! HTTP client over a stream transport.

use std::net::{IpAddr, SocketAddr};

use tracing::{debug, trace};

use super::request::{Method, RequestBuilder};
use crate::core::constants::HTTP_DEFAULT_PORT;
use crate::core::{
    resolve_first, AddressFamily, Inet4, Inet6, Resolver, SystemResolver, TransportConfig,
    TransportError, TransportResult,
};
use crate::stream::StreamTransport;
use crate::transport::TimeoutPolicy;

/// One-request-per-connection HTTP/1.1 client over address family `F`.
///
/// The host is resolved once at construction. Every [`connect`](Self::connect)
/// opens a fresh [`StreamTransport`]; requests carry `Connection: close` and
/// the response is whatever the server writes before closing. No response
/// parsing takes place.
///
/// # Example
///
/// ```no_run
/// use tidewire::http::HttpV4;
///
/// let mut http = HttpV4::new("example.org").unwrap();
/// http.connect().unwrap();
/// http.get("/", "").unwrap();
/// http.receive_response().unwrap();
/// println!("{}", String::from_utf8_lossy(http.response()));
/// ```
#[derive(Debug)]
pub struct HttpClient<F: AddressFamily, R: Resolver = SystemResolver> {
    host: String,
    ip: IpAddr,
    port: u16,
    resolver: R,
    config: TransportConfig,
    stream: Option<StreamTransport<F>>,
    request: Vec<u8>,
    response: Vec<u8>,
}

/// HTTP over IPv4.
pub type HttpV4 = HttpClient<Inet4>;

/// HTTP over IPv6.
pub type HttpV6 = HttpClient<Inet6>;

impl<F: AddressFamily> HttpClient<F> {
    /// Resolve `host` with the system resolver.
    pub fn new(host: impl Into<String>) -> TransportResult<Self> {
        Self::with_resolver(host, SystemResolver)
    }
}

impl<F: AddressFamily, R: Resolver> HttpClient<F, R> {
    /// Resolve `host` with `resolver`, keeping the first address of `F`.
    pub fn with_resolver(host: impl Into<String>, resolver: R) -> TransportResult<Self> {
        let host = host.into();
        let addr = resolve_first::<F, R>(&resolver, &host, HTTP_DEFAULT_PORT)?;
        debug!(host = %host, ip = %addr.ip(), "http host resolved");
        Ok(Self {
            host,
            ip: addr.ip(),
            port: HTTP_DEFAULT_PORT,
            resolver,
            config: TransportConfig::default(),
            stream: None,
            request: Vec::new(),
            response: Vec::new(),
        })
    }

    /// Re-resolve the host, for example after a DNS change.
    pub fn refresh(&mut self) -> TransportResult<()> {
        let addr = resolve_first::<F, R>(&self.resolver, &self.host, self.port)?;
        self.ip = addr.ip();
        Ok(())
    }

    /// Port for subsequent connects.
    pub fn set_port(&mut self, port: u16) {
        self.port = port;
    }

    /// Timeout policy for subsequent connects and transfers.
    pub fn set_timeout(&mut self, timeout: TimeoutPolicy) {
        self.config.timeout = timeout;
        if let Some(stream) = self.stream.as_mut() {
            stream.set_timeout(timeout);
        }
    }

    /// Current timeout policy.
    pub fn timeout(&self) -> TimeoutPolicy {
        self.config.timeout
    }

    /// Host name given at construction.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Address connects go to.
    pub fn server_addr(&self) -> SocketAddr {
        SocketAddr::new(self.ip, self.port)
    }

    /// Drop any previous connection and connect afresh.
    pub fn connect(&mut self) -> TransportResult<()> {
        self.close();
        let mut stream = StreamTransport::<F>::with_config(self.config.clone())?;
        stream.connect_to(self.server_addr())?;
        debug!(addr = %self.server_addr(), "http connected");
        self.stream = Some(stream);
        Ok(())
    }

    /// Send `GET path`.
    pub fn get(&mut self, path: &str, headers: &str) -> TransportResult<usize> {
        self.build_and_send(Method::Get, path, headers, b"")
    }

    /// Send `POST path` with `body`.
    pub fn post(&mut self, path: &str, body: &[u8], headers: &str) -> TransportResult<usize> {
        self.build_and_send(Method::Post, path, headers, body)
    }

    /// Send `HEAD path`.
    pub fn head(&mut self, path: &str, headers: &str) -> TransportResult<usize> {
        self.build_and_send(Method::Head, path, headers, b"")
    }

    /// Send `PUT path` with `body`.
    pub fn put(&mut self, path: &str, body: &[u8], headers: &str) -> TransportResult<usize> {
        self.build_and_send(Method::Put, path, headers, body)
    }

    /// Send `DELETE path`.
    pub fn delete(&mut self, path: &str, headers: &str) -> TransportResult<usize> {
        self.build_and_send(Method::Delete, path, headers, b"")
    }

    fn build_and_send(
        &mut self,
        method: Method,
        path: &str,
        headers: &str,
        body: &[u8],
    ) -> TransportResult<usize> {
        self.request = RequestBuilder::new(method, path, self.host.as_str())
            .headers(headers)
            .body(body)
            .build();
        let stream = self.stream.as_mut().ok_or(TransportError::NotOpen)?;
        let sent = stream.send(&self.request)?;
        trace!(%method, path, len = sent, "http request sent");
        Ok(sent)
    }

    /// Read until the server closes; returns the response length.
    ///
    /// Bytes read before a failure stay available through
    /// [`response`](Self::response).
    pub fn receive_response(&mut self) -> TransportResult<usize> {
        self.response.clear();
        let stream = self.stream.as_mut().ok_or(TransportError::NotOpen)?;
        if let Err(err) = stream.receive_to_end_into(&mut self.response) {
            debug!(len = self.response.len(), error = %err, "http response cut short");
            return Err(err);
        }
        trace!(len = self.response.len(), "http response received");
        Ok(self.response.len())
    }

    /// Raw bytes of the last response.
    pub fn response(&self) -> &[u8] {
        &self.response
    }

    /// Wire bytes of the last request.
    pub fn request(&self) -> &[u8] {
        &self.request
    }

    /// Close the current connection, if any.
    pub fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.close();
        }
    }

    /// Whether a connection is held.
    pub fn is_connected(&self) -> bool {
        self.stream.as_ref().is_some_and(|stream| stream.is_open())
    }
}
