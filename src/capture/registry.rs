//! Request id → relay URL resolution.
//!
//! The host reports the socket URL only at handshake time; frame events
//! carry just the request id. The registry remembers the mapping so frames
//! can be attributed to their relay.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use crate::identifiers::RequestId;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Default)]
struct RegistryInner {
    urls: FxHashMap<RequestId, String>,
    /// Request ids in first-recorded order, for eviction.
    order: VecDeque<RequestId>,
}

// ============================================================================
// ConnectionRegistry
// ============================================================================

/// Maps host request ids to the relay URL seen at handshake time.
///
/// Last write for an id wins. Once `capacity` ids are tracked, recording a
/// new id evicts the oldest one; overwriting an existing id does not change
/// its age. A capacity of `0` never evicts.
#[derive(Debug)]
pub struct ConnectionRegistry {
    inner: Mutex<RegistryInner>,
    capacity: usize,
}

impl ConnectionRegistry {
    /// Creates a registry holding at most `capacity` connections.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(RegistryInner::default()),
            capacity,
        }
    }

    /// Creates a registry that never evicts.
    #[must_use]
    pub fn unbounded() -> Self {
        Self::new(0)
    }

    /// Records the URL of a connection.
    ///
    /// Empty ids and empty URLs are ignored.
    pub fn record(&self, request_id: RequestId, url: impl Into<String>) {
        let url = url.into();
        if request_id.is_empty() || url.is_empty() {
            trace!("Ignoring incomplete handshake");
            return;
        }

        let mut inner = self.inner.lock();

        if let Some(existing) = inner.urls.get_mut(&request_id) {
            *existing = url;
            debug!(%request_id, "Updated WebSocket connection");
            return;
        }

        if self.capacity > 0 && inner.urls.len() >= self.capacity
            && let Some(oldest) = inner.order.pop_front()
        {
            inner.urls.remove(&oldest);
            trace!(request_id = %oldest, "Evicted WebSocket connection");
        }

        debug!(%request_id, %url, "Tracked WebSocket connection");
        inner.order.push_back(request_id.clone());
        inner.urls.insert(request_id, url);
    }

    /// Looks up the URL of a connection.
    #[must_use]
    pub fn resolve(&self, request_id: &RequestId) -> Option<String> {
        self.inner.lock().urls.get(request_id).cloned()
    }

    /// Returns the number of tracked connections.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().urls.len()
    }

    /// Returns `true` if no connection is tracked.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the configured capacity (`0` = unbounded).
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Forgets every connection.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.urls.clear();
        inner.order.clear();
    }
}

// ============================================================================
// Tests
// ============================================================================
