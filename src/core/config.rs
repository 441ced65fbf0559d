//! Transport configuration.

use std::time::Duration;

use super::constants::{DEFAULT_BACKLOG, STREAM_CHUNK_SIZE};
use crate::transport::TimeoutPolicy;

/// Settings shared by every transport and listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// Bound on every blocking call. Infinite by default.
    pub timeout: TimeoutPolicy,

    /// Per-read chunk for the stream receive loop.
    pub chunk_size: usize,

    /// Listen backlog.
    pub backlog: i32,

    /// Set `SO_REUSEADDR` before binding.
    pub reuse_address: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: TimeoutPolicy::INFINITE,
            chunk_size: STREAM_CHUNK_SIZE,
            backlog: DEFAULT_BACKLOG,
            reuse_address: true,
        }
    }
}

impl TransportConfig {
    /// Start a builder from the defaults.
    pub fn builder() -> TransportConfigBuilder {
        TransportConfigBuilder::new()
    }
}

/// Builder for [`TransportConfig`].
#[derive(Debug, Clone)]
pub struct TransportConfigBuilder {
    config: TransportConfig,
}

impl Default for TransportConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TransportConfigBuilder {
    /// Create a new builder with default options.
    pub fn new() -> Self {
        Self {
            config: TransportConfig::default(),
        }
    }

    /// Set the timeout policy.
    pub fn timeout(mut self, timeout: TimeoutPolicy) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the timeout in milliseconds (`0` = infinite).
    pub fn timeout_ms(self, millis: u64) -> Self {
        self.timeout(TimeoutPolicy::from_millis(millis))
    }

    /// Set the timeout from a duration.
    pub fn timeout_duration(self, duration: Duration) -> Self {
        self.timeout(TimeoutPolicy::from_duration(duration))
    }

    /// Set the stream read chunk size. Zero is raised to one.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size.max(1);
        self
    }

    /// Set the listen backlog.
    pub fn backlog(mut self, backlog: i32) -> Self {
        self.config.backlog = backlog;
        self
    }

    /// Enable or disable `SO_REUSEADDR` on bind.
    pub fn reuse_address(mut self, enabled: bool) -> Self {
        self.config.reuse_address = enabled;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> TransportConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TransportConfig::default();
        assert!(config.timeout.is_infinite());
        assert_eq!(config.chunk_size, 4096);
        assert_eq!(config.backlog, 5);
        assert!(config.reuse_address);
    }

    #[test]
    fn test_builder() {
        let config = TransportConfig::builder()
            .timeout_ms(250)
            .chunk_size(0)
            .backlog(64)
            .reuse_address(false)
            .build();

        assert_eq!(config.timeout.as_millis(), 250);
        assert_eq!(config.chunk_size, 1);
        assert_eq!(config.backlog, 64);
        assert!(!config.reuse_address);
    }

    #[test]
    fn test_builder_duration() {
        let config = TransportConfigBuilder::default()
            .timeout_duration(Duration::from_secs(2))
            .build();
        assert_eq!(config.timeout, TimeoutPolicy::from_millis(2_000));
    }
}
