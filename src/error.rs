//! Error types for relay-lens.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use relay_lens::{Result, TabId};
//!
//! async fn example(service: &CaptureService) -> Result<()> {
//!     service.sessions().attach(TabId::new(7)).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Host debugger | [`Error::HostAttach`], [`Error::HostDetach`], [`Error::HostTimeout`] |
//! | Channel | [`Error::InvalidChannelName`], [`Error::ChannelClosed`] |
//! | Session | [`Error::TabNotFound`] |
//! | External | [`Error::Json`] |
//!
//! Host failures never cross the channel as errors. The session state
//! machine converts them into status messages at the call site.

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use thiserror::Error;

use crate::identifiers::TabId;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when [`Config::validate`](crate::Config::validate) rejects a value.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Host Debugger Errors
    // ========================================================================
    /// The host refused to attach its debugger to the tab.
    ///
    /// Usually means another debugging session already owns the tab.
    #[error("Attach to tab {tab_id} failed: {message}")]
    HostAttach {
        /// Tab the attach was requested for.
        tab_id: TabId,
        /// Message reported by the host.
        message: String,
    },

    /// The host refused to detach its debugger from the tab.
    #[error("Detach from tab {tab_id} failed: {message}")]
    HostDetach {
        /// Tab the detach was requested for.
        tab_id: TabId,
        /// Message reported by the host.
        message: String,
    },

    /// A host call did not settle within the configured timeout.
    #[error("Timeout after {timeout_ms}ms: {operation}")]
    HostTimeout {
        /// Description of the host call.
        operation: String,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    // ========================================================================
    // Channel Errors
    // ========================================================================
    /// Channel name does not encode a tab id.
    #[error("Invalid channel name: {name}")]
    InvalidChannelName {
        /// The rejected channel name.
        name: String,
    },

    /// The other end of a channel went away.
    #[error("Channel closed")]
    ChannelClosed,

    // ========================================================================
    // Session Errors
    // ========================================================================
    /// No session is registered for the tab.
    #[error("Tab not found: {tab_id}")]
    TabNotFound {
        /// The missing tab ID.
        tab_id: TabId,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a host attach error.
    #[inline]
    pub fn host_attach(tab_id: TabId, message: impl Into<String>) -> Self {
        Self::HostAttach {
            tab_id,
            message: message.into(),
        }
    }

    /// Creates a host detach error.
    #[inline]
    pub fn host_detach(tab_id: TabId, message: impl Into<String>) -> Self {
        Self::HostDetach {
            tab_id,
            message: message.into(),
        }
    }

    /// Creates a host timeout error.
    #[inline]
    pub fn host_timeout(operation: impl Into<String>, timeout_ms: u64) -> Self {
        Self::HostTimeout {
            operation: operation.into(),
            timeout_ms,
        }
    }

    /// Creates an invalid channel name error.
    #[inline]
    pub fn invalid_channel_name(name: impl Into<String>) -> Self {
        Self::InvalidChannelName { name: name.into() }
    }

    /// Creates a tab not found error.
    #[inline]
    pub fn tab_not_found(tab_id: TabId) -> Self {
        Self::TabNotFound { tab_id }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::HostTimeout { .. })
    }

    /// Returns `true` if this error is recoverable.
    ///
    /// Recoverable errors may succeed on retry (the user can press attach again).
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::HostAttach { .. } | Self::HostTimeout { .. })
    }

    /// Message suitable for the `error` field of a status message.
    ///
    /// Host errors report the host's own message, everything else its display form.
    #[must_use]
    pub fn status_message(&self) -> String {
        match self {
            Self::HostAttach { message, .. } | Self::HostDetach { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::host_attach(TabId::new(3), "Another debugger is already attached");
        assert_eq!(
            err.to_string(),
            "Attach to tab 3 failed: Another debugger is already attached"
        );
    }

    #[test]
    fn test_config_error() {
        let err = Error::config("empty protocol version");
        assert_eq!(err.to_string(), "Configuration error: empty protocol version");
    }

    #[test]
    fn test_is_timeout() {
        let timeout_err = Error::host_timeout("attach", 5000);
        let other_err = Error::ChannelClosed;

        assert!(timeout_err.is_timeout());
        assert!(!other_err.is_timeout());
    }

    #[test]
    fn test_is_recoverable() {
        assert!(Error::host_attach(TabId::new(1), "busy").is_recoverable());
        assert!(!Error::config("test").is_recoverable());
        assert!(!Error::tab_not_found(TabId::new(9)).is_recoverable());
    }

    #[test]
    fn test_status_message_uses_host_text() {
        let err = Error::host_attach(TabId::new(1), "Cannot access a chrome:// URL");
        assert_eq!(err.status_message(), "Cannot access a chrome:// URL");

        let err = Error::host_timeout("attach", 250);
        assert_eq!(err.status_message(), "Timeout after 250ms: attach");
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
