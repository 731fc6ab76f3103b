//! Append-only event log with live aggregates and change notification.
//!
//! # Notification
//!
//! Subscribers are plain callbacks. They run synchronously, in subscription
//! order, inside the call that changed the store ([`EventStore::add_event`]
//! or [`EventStore::clear`]). Internal locks are released before the first
//! callback runs, so a callback may query the store freely.
//!
//! A panicking callback is not isolated: it unwinds through the mutating
//! call and later callbacks do not run for that change.

// ============================================================================
// Imports
// ============================================================================

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, RwLock};
use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::config::{Config, DEFAULT_RECENT_LIMIT};
use crate::identifiers::SubscriptionId;
use crate::protocol::{ClassifiedFrame, MessageType};

use super::stats::{Aggregates, DirectionCounts, Stats};

// ============================================================================
// Types
// ============================================================================

/// Store change callback.
pub type Listener = Arc<dyn Fn() + Send + Sync>;

#[derive(Debug, Default)]
struct Log {
    events: Vec<ClassifiedFrame>,
    aggregates: Aggregates,
}

// ============================================================================
// EventStore
// ============================================================================

/// In-memory log of captured relay frames.
///
/// The log is unbounded. Display capping is done with
/// [`EventStore::recent_events`].
pub struct EventStore {
    log: RwLock<Log>,
    listeners: Mutex<Vec<(SubscriptionId, Listener)>>,
    paused: AtomicBool,
    recent_limit: usize,
}

impl Default for EventStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventStore")
            .field("len", &self.len())
            .field("paused", &self.is_paused())
            .field("listeners", &self.listeners.lock().len())
            .field("recent_limit", &self.recent_limit)
            .finish()
    }
}

// ============================================================================
// EventStore - Constructors
// ============================================================================

impl EventStore {
    /// Creates an empty, unpaused store.
    #[must_use]
    pub fn new() -> Self {
        Self::with_recent_limit(DEFAULT_RECENT_LIMIT)
    }

    /// Creates a store using the configured default display limit.
    #[must_use]
    pub fn with_config(config: &Config) -> Self {
        Self::with_recent_limit(config.recent_limit)
    }

    fn with_recent_limit(recent_limit: usize) -> Self {
        Self {
            log: RwLock::new(Log::default()),
            listeners: Mutex::new(Vec::new()),
            paused: AtomicBool::new(false),
            recent_limit,
        }
    }
}

// ============================================================================
// EventStore - Mutation
// ============================================================================

impl EventStore {
    /// Appends a frame and notifies subscribers.
    ///
    /// While paused the frame is dropped: it is not queued, not counted,
    /// and subscribers are not notified. Returns `true` if it was stored.
    pub fn add_event(&self, frame: ClassifiedFrame) -> bool {
        if self.is_paused() {
            trace!(tag = %frame.tag(), "Store paused, frame dropped");
            return false;
        }

        {
            let mut log = self.log.write();
            log.aggregates.record(&frame);
            log.events.push(frame);
        }

        self.notify();
        true
    }

    /// Empties the log, resets every aggregate and notifies subscribers.
    ///
    /// The pause flag is left as is.
    pub fn clear(&self) {
        {
            let mut log = self.log.write();
            debug!(events = log.events.len(), "Store cleared");
            *log = Log::default();
        }

        self.notify();
    }

    /// Sets the pause flag. Frames dropped while paused are not recovered.
    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::Release);
        debug!(paused, "Store pause toggled");
    }

    /// Returns the pause flag.
    #[inline]
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }
}

// ============================================================================
// EventStore - Queries
// ============================================================================

impl EventStore {
    /// Number of stored frames.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.log.read().events.len()
    }

    /// Returns `true` if no frame is stored.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.log.read().events.is_empty()
    }

    /// Default display limit for [`Self::recent_events`].
    #[inline]
    #[must_use]
    pub fn recent_limit(&self) -> usize {
        self.recent_limit
    }

    /// Every stored frame, in arrival order.
    #[must_use]
    pub fn all_events(&self) -> Vec<ClassifiedFrame> {
        self.log.read().events.clone()
    }

    /// The last `limit` frames, in arrival order.
    #[must_use]
    pub fn recent_events(&self, limit: usize) -> Vec<ClassifiedFrame> {
        let log = self.log.read();
        let start = log.events.len().saturating_sub(limit);
        log.events[start..].to_vec()
    }

    /// Summary counters.
    #[must_use]
    pub fn stats(&self) -> Stats {
        let log = self.log.read();
        log.aggregates.stats(log.events.len())
    }

    /// Frames per message tag. Tags never seen are absent.
    #[must_use]
    pub fn type_counts(&self) -> BTreeMap<MessageType, usize> {
        self.log.read().aggregates.type_counts()
    }

    /// `EVENT` frames per event kind.
    #[must_use]
    pub fn kind_counts(&self) -> BTreeMap<u64, usize> {
        self.log.read().aggregates.kind_counts()
    }

    /// First event object seen for each kind.
    #[must_use]
    pub fn kind_samples(&self) -> BTreeMap<u64, Map<String, Value>> {
        self.log.read().aggregates.kind_samples()
    }

    /// Distinct event authors.
    #[must_use]
    pub fn unique_pubkeys(&self) -> BTreeSet<String> {
        self.log.read().aggregates.unique_pubkeys()
    }

    /// Frames per direction.
    #[must_use]
    pub fn direction_counts(&self) -> DirectionCounts {
        self.log.read().aggregates.direction_counts()
    }
}

// ============================================================================
// EventStore - Subscribers
// ============================================================================

impl EventStore {
    /// Registers a change callback.
    ///
    /// Returns an id for [`Self::unsubscribe`].
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = SubscriptionId::generate();
        self.listeners.lock().push((id, Arc::new(callback)));
        trace!(%id, "Store subscriber added");
        id
    }

    /// Removes a change callback.
    ///
    /// Returns `false` if the id was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        listeners.len() != before
    }

    /// Number of registered callbacks.
    #[inline]
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.listeners.lock().len()
    }

    fn notify(&self) {
        let listeners: Vec<Listener> = self
            .listeners
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in listeners {
            listener();
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
