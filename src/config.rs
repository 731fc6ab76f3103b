//! Pipeline configuration.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use relay_lens::Config;
//!
//! let config = Config::new()
//!     .with_registry_capacity(1024)
//!     .with_host_call_timeout(Duration::from_secs(5));
//!
//! config.validate()?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Debugger protocol version requested on attach.
pub const DEFAULT_PROTOCOL_VERSION: &str = "1.3";

/// Connections remembered before the oldest is evicted.
pub const DEFAULT_REGISTRY_CAPACITY: usize = 4096;

/// Upper bound on a single host attach/detach call.
pub const DEFAULT_HOST_CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// Row limit for [`EventStore::recent_events`](crate::EventStore::recent_events).
pub const DEFAULT_RECENT_LIMIT: usize = 500;

// ============================================================================
// Config
// ============================================================================

/// Capture and store configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Debugger protocol version passed to the host's attach call.
    pub protocol_version: String,

    /// Maximum tracked WebSocket connections (`0` = unbounded).
    pub registry_capacity: usize,

    /// Timeout for host attach/detach calls (`None` = wait forever).
    pub host_call_timeout: Option<Duration>,

    /// Default row limit for recent-event queries.
    pub recent_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl Config {
    /// Creates a configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            protocol_version: DEFAULT_PROTOCOL_VERSION.to_string(),
            registry_capacity: DEFAULT_REGISTRY_CAPACITY,
            host_call_timeout: Some(DEFAULT_HOST_CALL_TIMEOUT),
            recent_limit: DEFAULT_RECENT_LIMIT,
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl Config {
    /// Sets the debugger protocol version.
    #[inline]
    #[must_use]
    pub fn with_protocol_version(mut self, version: impl Into<String>) -> Self {
        self.protocol_version = version.into();
        self
    }

    /// Sets the connection registry capacity.
    #[inline]
    #[must_use]
    pub fn with_registry_capacity(mut self, capacity: usize) -> Self {
        self.registry_capacity = capacity;
        self
    }

    /// Sets the host call timeout.
    #[inline]
    #[must_use]
    pub fn with_host_call_timeout(mut self, timeout: Duration) -> Self {
        self.host_call_timeout = Some(timeout);
        self
    }

    /// Lets host calls wait forever.
    #[inline]
    #[must_use]
    pub fn without_host_call_timeout(mut self) -> Self {
        self.host_call_timeout = None;
        self
    }

    /// Sets the default recent-events limit.
    #[inline]
    #[must_use]
    pub fn with_recent_limit(mut self, limit: usize) -> Self {
        self.recent_limit = limit;
        self
    }
}

// ============================================================================
// Validation
// ============================================================================

impl Config {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for an empty protocol version, a zero
    /// timeout or a zero recent limit.
    pub fn validate(&self) -> Result<()> {
        if self.protocol_version.trim().is_empty() {
            return Err(Error::config("Protocol version must not be empty"));
        }

        if self.host_call_timeout.is_some_and(|t| t.is_zero()) {
            return Err(Error::config("Host call timeout must be greater than zero"));
        }

        if self.recent_limit == 0 {
            return Err(Error::config("Recent limit must be greater than zero"));
        }

        Ok(())
    }

    /// Returns `true` if the connection registry never evicts.
    #[inline]
    #[must_use]
    pub const fn is_registry_unbounded(&self) -> bool {
        self.registry_capacity == 0
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_creates_default() {
        let config = Config::new();
        assert_eq!(config.protocol_version, "1.3");
        assert_eq!(config.registry_capacity, 4096);
        assert_eq!(config.host_call_timeout, Some(Duration::from_secs(10)));
        assert_eq!(config.recent_limit, 500);
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_builder_chain() {
        let config = Config::new()
            .with_protocol_version("1.2")
            .with_registry_capacity(0)
            .without_host_call_timeout()
            .with_recent_limit(50);

        assert_eq!(config.protocol_version, "1.2");
        assert!(config.is_registry_unbounded());
        assert!(config.host_call_timeout.is_none());
        assert_eq!(config.recent_limit, 50);
    }

    #[test]
    fn test_validate_valid() {
        assert!(Config::new().validate().is_ok());
        assert!(Config::new().without_host_call_timeout().validate().is_ok());
    }

    #[test]
    fn test_validate_empty_version() {
        let config = Config::new().with_protocol_version("  ");
        assert!(matches!(config.validate(), Err(Error::Config { .. })));
    }

    #[test]
    fn test_validate_zero_timeout() {
        let config = Config::new().with_host_call_timeout(Duration::ZERO);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_zero_recent_limit() {
        let config = Config::new().with_recent_limit(0);
        assert!(config.validate().is_err());
    }
}
