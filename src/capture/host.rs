//! Host debugger seam.
//!
//! The host's debugging API is consumed, not reimplemented. Anything that
//! can attach a debugger to a tab and stream its network events implements
//! [`DebuggerHost`]; the event stream itself arrives separately as
//! [`HostNotification`](crate::protocol::HostNotification)s.

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;

use crate::error::Result;
use crate::identifiers::TabId;

// ============================================================================
// DebuggerHost
// ============================================================================

/// Attach/detach primitives of the host debugger.
///
/// Implementations report failures as [`Error::HostAttach`] /
/// [`Error::HostDetach`](crate::Error::HostDetach) carrying the host's own
/// message.
///
/// [`Error::HostAttach`]: crate::Error::HostAttach
#[async_trait]
pub trait DebuggerHost: Send + Sync {
    /// Attaches the debugger to a tab.
    async fn attach(&self, tab_id: TabId, protocol_version: &str) -> Result<()>;

    /// Enables the network event feed for an attached tab.
    async fn enable_network(&self, tab_id: TabId) -> Result<()>;

    /// Detaches the debugger from a tab.
    async fn detach(&self, tab_id: TabId) -> Result<()>;
}

// ============================================================================
// Test Host
// ============================================================================
