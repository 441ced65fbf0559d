//! TLS session parameters.

use zeroize::Zeroizing;

use crate::transport::TimeoutPolicy;

/// Parameters a TLS layer would be configured with.
///
/// A plain holder: nothing here performs a handshake or validates that the
/// version, cipher or PEM material make sense together. The private key is
/// wiped from memory when the config is dropped or the key replaced.
///
/// # Example
///
/// ```
/// use tidewire::tls::TlsConfig;
///
/// let tls = TlsConfig::new()
///     .with_version("TLSv1.3")
///     .with_sni("example.org");
/// assert_eq!(tls.version(), "TLSv1.3");
/// assert_eq!(tls.sni(), Some("example.org"));
/// ```
#[derive(Clone, Default)]
pub struct TlsConfig {
    version: String,
    cipher: u32,
    cert: Option<String>,
    key: Option<Zeroizing<String>>,
    ca_cert: Option<String>,
    sni: Option<String>,
    timeout: TimeoutPolicy,
}

impl TlsConfig {
    /// Empty configuration with an infinite timeout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Protocol version label, e.g. `"TLSv1.3"`.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// IANA cipher suite identifier.
    pub fn with_cipher(mut self, cipher: u32) -> Self {
        self.cipher = cipher;
        self
    }

    /// Certificate chain, PEM.
    pub fn with_cert(mut self, cert: impl Into<String>) -> Self {
        self.cert = Some(cert.into());
        self
    }

    /// Private key, PEM.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(Zeroizing::new(key.into()));
        self
    }

    /// Trusted CA certificate, PEM.
    pub fn with_ca_cert(mut self, ca_cert: impl Into<String>) -> Self {
        self.ca_cert = Some(ca_cert.into());
        self
    }

    /// Server name indication.
    pub fn with_sni(mut self, sni: impl Into<String>) -> Self {
        self.sni = Some(sni.into());
        self
    }

    /// Handshake and transfer timeout.
    pub fn with_timeout(mut self, timeout: TimeoutPolicy) -> Self {
        self.timeout = timeout;
        self
    }

    /// In-place variant of [`with_timeout`](Self::with_timeout).
    pub fn set_timeout(&mut self, timeout: TimeoutPolicy) {
        self.timeout = timeout;
    }

    /// Forget the private key, wiping it.
    pub fn clear_key(&mut self) {
        self.key = None;
    }

    /// Protocol version label.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Cipher suite identifier.
    pub fn cipher(&self) -> u32 {
        self.cipher
    }

    /// Certificate chain.
    pub fn cert(&self) -> Option<&str> {
        self.cert.as_deref()
    }

    /// Private key.
    pub fn key(&self) -> Option<&str> {
        self.key.as_ref().map(|key| key.as_str())
    }

    /// CA certificate.
    pub fn ca_cert(&self) -> Option<&str> {
        self.ca_cert.as_deref()
    }

    /// Server name indication.
    pub fn sni(&self) -> Option<&str> {
        self.sni.as_deref()
    }

    /// Timeout policy.
    pub fn timeout(&self) -> TimeoutPolicy {
        self.timeout
    }
}

impl std::fmt::Debug for TlsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsConfig")
            .field("version", &self.version)
            .field("cipher", &format_args!("{:#06x}", self.cipher))
            .field("cert", &self.cert.as_ref().map(|_| "<pem>"))
            .field("key", &self.key.as_ref().map(|_| "<redacted>"))
            .field("ca_cert", &self.ca_cert.as_ref().map(|_| "<pem>"))
            .field("sni", &self.sni)
            .field("timeout", &self.timeout)
            .finish()
    }
}
