//! Per-tab attach/detach state machine.
//!
//! Each inspected tab with a connected presentation channel owns one
//! session. The [`SessionRegistry`] is the only component that asks
//! the host to start or stop capture.
//!
//! # States
//!
//! ```text
//!            attach                 host ok
//! Detached ─────────► Attaching ─────────────► Attached
//!    ▲                    │ host error             │ detach
//!    │                    ▼                        ▼
//!    │                 Error(reason)           Detaching
//!    │                    │ attach                 │ host settles (ok or error)
//!    └────────────────────┴────────────────────────┘
//!
//! any state ── host detach notification ──► Detached
//! any state ── channel disconnect ────────► (session removed)
//! ```
//!
//! # Serialization
//!
//! Attach and detach requests for one tab run one at a time through a
//! per-session operation lock. The "already attached" / "already detached"
//! guards are evaluated after the lock is taken, so they only ever see a
//! settled state.

// ============================================================================
// Imports
// ============================================================================

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tokio::time::timeout;
use tracing::{debug, trace, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::identifiers::TabId;
use crate::protocol::CaptureMessage;
use crate::transport::CaptureSender;

use super::host::DebuggerHost;

// ============================================================================
// AttachState
// ============================================================================

/// Capture state of one tab.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AttachState {
    /// Not capturing.
    #[default]
    Detached,
    /// Host attach in flight.
    Attaching,
    /// Capturing.
    Attached,
    /// Host detach in flight.
    Detaching,
    /// Not capturing; the last attach failed with this reason.
    Error(String),
}

/// Inputs to the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The presentation side asked to attach.
    AttachRequested,
    /// The host attach (and network enable) succeeded.
    AttachSucceeded,
    /// The host attach failed.
    AttachFailed(String),
    /// The presentation side asked to detach.
    DetachRequested,
    /// The host detach settled, successfully or not.
    DetachSettled,
    /// The host ended the debugging session on its own.
    HostDetached,
}

/// Host call requested by a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostAction {
    /// Attach and enable the network feed.
    Attach,
    /// Detach.
    Detach,
}

/// Result of feeding a [`SessionEvent`] to an [`AttachState`].
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    /// State after the event.
    pub next: AttachState,
    /// Host call to perform, if any.
    pub action: Option<HostAction>,
    /// Status to send to the presentation side, if any.
    pub status: Option<CaptureMessage>,
}

impl Transition {
    fn to(next: AttachState) -> Self {
        Self {
            next,
            action: None,
            status: None,
        }
    }

    fn with_action(mut self, action: HostAction) -> Self {
        self.action = Some(action);
        self
    }

    fn with_status(mut self, status: CaptureMessage) -> Self {
        self.status = Some(status);
        self
    }
}

impl AttachState {
    /// Returns `true` only for [`AttachState::Attached`].
    #[inline]
    #[must_use]
    pub fn is_attached(&self) -> bool {
        matches!(self, Self::Attached)
    }

    /// Returns `true` while a host call is in flight.
    #[inline]
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Attaching | Self::Detaching)
    }

    /// Status message describing this state.
    #[must_use]
    pub fn status(&self) -> CaptureMessage {
        match self {
            Self::Attached => CaptureMessage::status(true),
            Self::Error(reason) => CaptureMessage::attach_failed(reason.clone()),
            Self::Detached | Self::Attaching | Self::Detaching => CaptureMessage::status(false),
        }
    }

    /// Transition table.
    #[must_use]
    pub fn on(&self, event: SessionEvent) -> Transition {
        match (self, event) {
            (Self::Attached, SessionEvent::AttachRequested) => {
                Transition::to(Self::Attached).with_status(CaptureMessage::status(true))
            }
            (Self::Detached | Self::Error(_), SessionEvent::AttachRequested) => {
                Transition::to(Self::Attaching).with_action(HostAction::Attach)
            }
            (Self::Attaching | Self::Detaching, SessionEvent::AttachRequested) => {
                Transition::to(self.clone()).with_status(self.status())
            }

            (_, SessionEvent::AttachSucceeded) => {
                Transition::to(Self::Attached).with_status(CaptureMessage::status(true))
            }
            (_, SessionEvent::AttachFailed(reason)) => {
                let status = CaptureMessage::attach_failed(reason.clone());
                Transition::to(Self::Error(reason)).with_status(status)
            }

            (Self::Attached, SessionEvent::DetachRequested) => {
                Transition::to(Self::Detaching).with_action(HostAction::Detach)
            }
            (_, SessionEvent::DetachRequested) => {
                Transition::to(self.clone()).with_status(CaptureMessage::status(false))
            }

            (_, SessionEvent::DetachSettled | SessionEvent::HostDetached) => {
                Transition::to(Self::Detached).with_status(CaptureMessage::status(false))
            }
        }
    }
}

// ============================================================================
// TabSession
// ============================================================================

/// Capture state and channel of one inspected tab.
///
/// A session exists only while its presentation channel is connected.
#[derive(Debug)]
struct TabSession {
    state: AttachState,
    port: CaptureSender,
    /// Serializes attach/detach for this tab.
    op_lock: Arc<tokio::sync::Mutex<()>>,
    /// Distinguishes this channel from a later reconnect of the same tab.
    generation: u64,
}

// ============================================================================
// SessionRegistry
// ============================================================================

/// Tab-keyed table of sessions plus the host they drive.
pub struct SessionRegistry {
    host: Arc<dyn DebuggerHost>,
    sessions: Mutex<FxHashMap<TabId, TabSession>>,
    protocol_version: String,
    host_call_timeout: Option<Duration>,
    next_generation: AtomicU64,
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("sessions", &self.sessions.lock().len())
            .field("protocol_version", &self.protocol_version)
            .field("host_call_timeout", &self.host_call_timeout)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// SessionRegistry - Constructor
// ============================================================================

impl SessionRegistry {
    /// Creates an empty registry driving `host`.
    #[must_use]
    pub fn new(host: Arc<dyn DebuggerHost>, config: &Config) -> Self {
        Self {
            host,
            sessions: Mutex::new(FxHashMap::default()),
            protocol_version: config.protocol_version.clone(),
            host_call_timeout: config.host_call_timeout,
            next_generation: AtomicU64::new(1),
        }
    }
}

// ============================================================================
// SessionRegistry - Channel Lifecycle
// ============================================================================

impl SessionRegistry {
    /// Binds a presentation channel to a tab.
    ///
    /// A tab that already has a session keeps its state and gets the new
    /// channel. Returns the generation to pass to [`Self::disconnect`].
    pub fn connect(&self, tab_id: TabId, port: CaptureSender) -> u64 {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let mut sessions = self.sessions.lock();

        match sessions.get_mut(&tab_id) {
            Some(session) => {
                debug!(%tab_id, generation, state = ?session.state, "Channel replaced");
                session.port = port;
                session.generation = generation;
            }
            None => {
                debug!(%tab_id, generation, "Session created");
                sessions.insert(
                    tab_id,
                    TabSession {
                        state: AttachState::Detached,
                        port,
                        op_lock: Arc::new(tokio::sync::Mutex::new(())),
                        generation,
                    },
                );
            }
        }

        generation
    }

    /// Handles the disconnect of a presentation channel.
    ///
    /// Removes the session and, if it was attached, detaches the host on a
    /// best-effort basis. A stale generation (the tab has reconnected since)
    /// is ignored.
    pub async fn disconnect(&self, tab_id: TabId, generation: u64) {
        let removed = {
            let mut sessions = self.sessions.lock();
            let is_current = sessions
                .get(&tab_id)
                .is_some_and(|s| s.generation == generation);
            if is_current { sessions.remove(&tab_id) } else { None }
        };

        let Some(session) = removed else {
            trace!(%tab_id, generation, "Stale disconnect ignored");
            return;
        };

        if session.state.is_pending() {
            debug!(%tab_id, state = ?session.state, "Session removed with host call in flight");
        } else {
            debug!(%tab_id, state = ?session.state, "Session removed");
        }

        if session.state.is_attached()
            && let Err(e) = self.call_host("detach", self.host.detach(tab_id)).await
        {
            debug!(%tab_id, error = %e, "Detach on disconnect failed (ignored)");
        }
    }

    /// Handles a detach the host performed on its own.
    pub fn host_detached(&self, tab_id: TabId, reason: &str) {
        debug!(%tab_id, reason, "Host detached debugger");

        if self.apply(tab_id, SessionEvent::HostDetached).is_none() {
            trace!(%tab_id, "Host detach for untracked tab");
        }
    }
}

// ============================================================================
// SessionRegistry - Attach / Detach
// ============================================================================

impl SessionRegistry {
    /// Starts capturing a tab.
    ///
    /// Host failures are reported to the presentation side as a status
    /// message and reflected in the returned state, never as an `Err`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TabNotFound`] if the tab has no connected channel.
    pub async fn attach(&self, tab_id: TabId) -> Result<AttachState> {
        let op_lock = self.op_lock(tab_id)?;
        let _op = op_lock.lock().await;

        let transition = self
            .apply(tab_id, SessionEvent::AttachRequested)
            .ok_or_else(|| Error::tab_not_found(tab_id))?;

        if transition.action != Some(HostAction::Attach) {
            debug!(%tab_id, "Already attached");
            return Ok(transition.next);
        }

        debug!(%tab_id, "Attaching debugger");
        let event = match self.attach_host(tab_id).await {
            Ok(()) => SessionEvent::AttachSucceeded,
            Err(e) if e.is_timeout() => {
                warn!(%tab_id, error = %e, "Attach timed out");
                SessionEvent::AttachFailed(e.status_message())
            }
            Err(e) => {
                warn!(%tab_id, error = %e, retry = e.is_recoverable(), "Attach failed");
                SessionEvent::AttachFailed(e.status_message())
            }
        };
        let succeeded = event == SessionEvent::AttachSucceeded;

        match self.apply(tab_id, event) {
            Some(transition) => Ok(transition.next),
            None => {
                // Channel went away while the attach was in flight.
                if succeeded {
                    let _ = self.call_host("detach", self.host.detach(tab_id)).await;
                }
                Err(Error::tab_not_found(tab_id))
            }
        }
    }

    /// Stops capturing a tab.
    ///
    /// Host failures are swallowed: the tab always ends up detached.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TabNotFound`] if the tab has no connected channel.
    pub async fn detach(&self, tab_id: TabId) -> Result<AttachState> {
        let op_lock = self.op_lock(tab_id)?;
        let _op = op_lock.lock().await;

        let transition = self
            .apply(tab_id, SessionEvent::DetachRequested)
            .ok_or_else(|| Error::tab_not_found(tab_id))?;

        if transition.action != Some(HostAction::Detach) {
            debug!(%tab_id, "Already detached");
            return Ok(transition.next);
        }

        debug!(%tab_id, "Detaching debugger");
        if let Err(e) = self.call_host("detach", self.host.detach(tab_id)).await {
            debug!(%tab_id, error = %e, "Detach failed (ignored)");
        }

        // The session may be gone if the channel closed meanwhile.
        Ok(self
            .apply(tab_id, SessionEvent::DetachSettled)
            .map_or(AttachState::Detached, |t| t.next))
    }

    /// Attaches and enables the network feed, undoing the attach if the
    /// feed cannot be enabled.
    async fn attach_host(&self, tab_id: TabId) -> Result<()> {
        self.call_host("attach", self.host.attach(tab_id, &self.protocol_version))
            .await?;

        if let Err(e) = self
            .call_host("enable network", self.host.enable_network(tab_id))
            .await
        {
            let _ = self.call_host("detach", self.host.detach(tab_id)).await;
            return Err(e);
        }

        Ok(())
    }

    /// Runs a host call under the configured timeout.
    async fn call_host<F>(&self, operation: &str, call: F) -> Result<()>
    where
        F: Future<Output = Result<()>>,
    {
        match self.host_call_timeout {
            Some(limit) => timeout(limit, call)
                .await
                .map_err(|_| Error::host_timeout(operation, millis(limit)))?,
            None => call.await,
        }
    }
}

/// Whole milliseconds of `limit`, saturating at `u64::MAX`.
#[inline]
fn millis(limit: Duration) -> u64 {
    u64::try_from(limit.as_millis()).unwrap_or(u64::MAX)
}

// ============================================================================
// SessionRegistry - Queries
// ============================================================================

impl SessionRegistry {
    /// Returns the state of a tab, if it has a session.
    #[must_use]
    pub fn state(&self, tab_id: TabId) -> Option<AttachState> {
        self.sessions.lock().get(&tab_id).map(|s| s.state.clone())
    }

    /// Returns `true` if the tab is being captured.
    #[must_use]
    pub fn is_attached(&self, tab_id: TabId) -> bool {
        self.sessions
            .lock()
            .get(&tab_id)
            .is_some_and(|s| s.state.is_attached())
    }

    /// Returns the number of sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    /// Returns `true` if no tab has a session.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the tabs that have a session, sorted.
    #[must_use]
    pub fn tabs(&self) -> Vec<TabId> {
        let mut tabs: Vec<_> = self.sessions.lock().keys().copied().collect();
        tabs.sort_unstable();
        tabs
    }

    /// Sends a message to an attached tab's presentation side.
    ///
    /// Returns `false` when the tab is not attached or its channel is gone.
    pub fn forward(&self, tab_id: TabId, message: CaptureMessage) -> bool {
        let sessions = self.sessions.lock();
        let Some(session) = sessions.get(&tab_id).filter(|s| s.state.is_attached()) else {
            return false;
        };

        match session.port.post(message) {
            Ok(()) => true,
            Err(_) => {
                trace!(%tab_id, "Channel closed, message dropped");
                false
            }
        }
    }
}

// ============================================================================
// SessionRegistry - Internals
// ============================================================================

impl SessionRegistry {
    fn op_lock(&self, tab_id: TabId) -> Result<Arc<tokio::sync::Mutex<()>>> {
        self.sessions
            .lock()
            .get(&tab_id)
            .map(|s| Arc::clone(&s.op_lock))
            .ok_or_else(|| Error::tab_not_found(tab_id))
    }

    /// Feeds an event to a tab's state machine, stores the next state and
    /// posts the resulting status. Returns `None` for untracked tabs.
    fn apply(&self, tab_id: TabId, event: SessionEvent) -> Option<Transition> {
        let mut sessions = self.sessions.lock();
        let session = sessions.get_mut(&tab_id)?;

        let transition = session.state.on(event);
        if transition.next != session.state {
            debug!(%tab_id, from = ?session.state, to = ?transition.next, "Session transition");
        }
        session.state = transition.next.clone();

        if let Some(status) = &transition.status
            && session.port.post(status.clone()).is_err()
        {
            trace!(%tab_id, "Channel closed, status dropped");
        }

        Some(transition)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::capture::host::testing::{HangingHost, HostCall, ScriptedHost};
    use crate::transport::{EventRouter, PanelPort};

    async fn registry_with(
        host: Arc<dyn DebuggerHost>,
        config: &Config,
    ) -> (Arc<SessionRegistry>, PanelPort, u64) {
        let (router, mut listener) = EventRouter::bind();
        let panel = router.connect_tab(TabId::new(1)).expect("connect");
        let (sender, _receiver) = listener.accept().await.expect("capture end").split();

        let registry = Arc::new(SessionRegistry::new(host, config));
        let generation = registry.connect(TabId::new(1), sender);
        (registry, panel, generation)
    }

    fn drain(panel: &mut PanelPort) -> Vec<CaptureMessage> {
        std::iter::from_fn(|| panel.try_recv()).collect()
    }

    const TAB: TabId = TabId::new(1);

    // ------------------------------------------------------------------------
    // Transition table
    // ------------------------------------------------------------------------

    #[test]
    fn test_attach_from_detached_requests_host() {
        let t = AttachState::Detached.on(SessionEvent::AttachRequested);
        assert_eq!(t.next, AttachState::Attaching);
        assert_eq!(t.action, Some(HostAction::Attach));
        assert_eq!(t.status, None);
    }

    #[test]
    fn test_attach_when_attached_is_noop() {
        let t = AttachState::Attached.on(SessionEvent::AttachRequested);
        assert_eq!(t.next, AttachState::Attached);
        assert_eq!(t.action, None);
        assert_eq!(t.status, Some(CaptureMessage::status(true)));
    }

    #[test]
    fn test_attach_retry_from_error() {
        let t = AttachState::Error("busy".into()).on(SessionEvent::AttachRequested);
        assert_eq!(t.action, Some(HostAction::Attach));
    }

    #[test]
    fn test_attach_failure_carries_reason() {
        let t = AttachState::Attaching.on(SessionEvent::AttachFailed("busy".into()));
        assert_eq!(t.next, AttachState::Error("busy".into()));
        assert_eq!(t.status, Some(CaptureMessage::attach_failed("busy")));
        assert!(!t.next.is_attached());
    }

    #[test]
    fn test_detach_when_detached_is_noop() {
        for state in [AttachState::Detached, AttachState::Error("x".into())] {
            let t = state.on(SessionEvent::DetachRequested);
            assert_eq!(t.next, state);
            assert_eq!(t.action, None);
            assert_eq!(t.status, Some(CaptureMessage::status(false)));
        }
    }

    #[test]
    fn test_host_detach_from_any_state() {
        for state in [
            AttachState::Detached,
            AttachState::Attaching,
            AttachState::Attached,
            AttachState::Detaching,
            AttachState::Error("x".into()),
        ] {
            let t = state.on(SessionEvent::HostDetached);
            assert_eq!(t.next, AttachState::Detached);
            assert_eq!(t.status, Some(CaptureMessage::status(false)));
        }
    }

    // ------------------------------------------------------------------------
    // Registry
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_attach_twice_calls_host_once() {
        let host = ScriptedHost::new();
        let (registry, mut panel, _) = registry_with(Arc::new(host.clone()), &Config::new()).await;

        assert_eq!(registry.attach(TAB).await.expect("attach"), AttachState::Attached);
        assert_eq!(registry.attach(TAB).await.expect("attach"), AttachState::Attached);

        assert_eq!(host.attach_count(), 1);
        assert_eq!(
            host.calls(),
            vec![HostCall::Attach(TAB, "1.3".into()), HostCall::EnableNetwork(TAB)]
        );
        assert_eq!(
            drain(&mut panel),
            vec![CaptureMessage::status(true), CaptureMessage::status(true)]
        );
    }

    #[tokio::test]
    async fn test_concurrent_attach_is_serialized() {
        let host = ScriptedHost::gated();
        let (registry, mut panel, _) = registry_with(Arc::new(host.clone()), &Config::new()).await;

        let first = tokio::spawn({
            let registry = Arc::clone(&registry);
            async move { registry.attach(TAB).await }
        });
        let second = tokio::spawn({
            let registry = Arc::clone(&registry);
            async move { registry.attach(TAB).await }
        });

        tokio::task::yield_now().await;
        host.release_attach();

        assert!(first.await.expect("join").is_ok());
        assert!(second.await.expect("join").is_ok());
        assert_eq!(host.attach_count(), 1);
        assert_eq!(
            drain(&mut panel),
            vec![CaptureMessage::status(true), CaptureMessage::status(true)]
        );
    }

    #[tokio::test]
    async fn test_host_detach_during_attach_is_overridden() {
        let host = ScriptedHost::gated();
        let (registry, mut panel, _) = registry_with(Arc::new(host.clone()), &Config::new()).await;

        let attach = tokio::spawn({
            let registry = Arc::clone(&registry);
            async move { registry.attach(TAB).await }
        });

        tokio::task::yield_now().await;
        assert_eq!(registry.state(TAB), Some(AttachState::Attaching));
        assert!(registry.state(TAB).is_some_and(|s| s.is_pending()));

        // The host detach is not serialized with the in-flight attach, so
        // the attach result lands last and wins.
        registry.host_detached(TAB, "target_closed");
        assert_eq!(registry.state(TAB), Some(AttachState::Detached));

        host.release_attach();
        let state = attach.await.expect("join").expect("attach settles");

        assert_eq!(state, AttachState::Attached);
        assert!(registry.is_attached(TAB));
        assert_eq!(
            drain(&mut panel),
            vec![CaptureMessage::status(false), CaptureMessage::status(true)]
        );
    }

    #[tokio::test]
    async fn test_attach_failure_reports_error_status() {
        let host = ScriptedHost::new();
        host.fail_attach("Another debugger is already attached");
        let (registry, mut panel, _) = registry_with(Arc::new(host.clone()), &Config::new()).await;

        let state = registry.attach(TAB).await.expect("attach settles");
        assert_eq!(state, AttachState::Error("Another debugger is already attached".into()));
        assert!(!registry.is_attached(TAB));
        assert_eq!(
            drain(&mut panel),
            vec![CaptureMessage::attach_failed("Another debugger is already attached")]
        );
    }

    #[tokio::test]
    async fn test_enable_failure_undoes_attach() {
        let host = ScriptedHost::new();
        host.fail_enable("Network domain unavailable");
        let (registry, mut panel, _) = registry_with(Arc::new(host.clone()), &Config::new()).await;

        let state = registry.attach(TAB).await.expect("attach settles");
        assert!(matches!(state, AttachState::Error(_)));
        assert_eq!(host.detach_count(), 1);
        assert_eq!(
            drain(&mut panel),
            vec![CaptureMessage::attach_failed("Network domain unavailable")]
        );
    }

    #[tokio::test]
    async fn test_detach_while_detached_skips_host() {
        let host = ScriptedHost::new();
        let (registry, mut panel, _) = registry_with(Arc::new(host.clone()), &Config::new()).await;

        assert_eq!(registry.detach(TAB).await.expect("detach"), AttachState::Detached);
        assert_eq!(host.detach_count(), 0);
        assert_eq!(drain(&mut panel), vec![CaptureMessage::status(false)]);
    }

    #[tokio::test]
    async fn test_detach_failure_is_swallowed() {
        let host = ScriptedHost::new();
        host.fail_detach("No debugger attached");
        let (registry, mut panel, _) = registry_with(Arc::new(host.clone()), &Config::new()).await;

        registry.attach(TAB).await.expect("attach");
        assert_eq!(registry.detach(TAB).await.expect("detach"), AttachState::Detached);

        assert_eq!(host.detach_count(), 1);
        assert_eq!(
            drain(&mut panel),
            vec![CaptureMessage::status(true), CaptureMessage::status(false)]
        );
    }

    #[tokio::test]
    async fn test_host_detached_forces_detached() {
        let host = ScriptedHost::new();
        let (registry, mut panel, _) = registry_with(Arc::new(host.clone()), &Config::new()).await;

        registry.attach(TAB).await.expect("attach");
        registry.host_detached(TAB, "canceled_by_user");

        assert_eq!(registry.state(TAB), Some(AttachState::Detached));
        assert_eq!(
            drain(&mut panel),
            vec![CaptureMessage::status(true), CaptureMessage::status(false)]
        );
        // No host call for an external detach.
        assert_eq!(host.detach_count(), 0);
    }

    #[tokio::test]
    async fn test_disconnect_detaches_attached_tab() {
        let host = ScriptedHost::new();
        host.fail_detach("already gone");
        let (registry, _panel, generation) =
            registry_with(Arc::new(host.clone()), &Config::new()).await;

        registry.attach(TAB).await.expect("attach");
        registry.disconnect(TAB, generation).await;

        assert!(registry.is_empty());
        assert_eq!(host.detach_count(), 1);
        assert!(matches!(registry.attach(TAB).await, Err(Error::TabNotFound { .. })));
    }

    #[tokio::test]
    async fn test_disconnect_detached_tab_skips_host() {
        let host = ScriptedHost::new();
        let (registry, _panel, generation) =
            registry_with(Arc::new(host.clone()), &Config::new()).await;

        registry.disconnect(TAB, generation).await;
        assert!(registry.is_empty());
        assert_eq!(host.detach_count(), 0);
    }

    #[tokio::test]
    async fn test_stale_disconnect_keeps_reconnected_session() {
        let host = ScriptedHost::new();
        let (registry, _panel, old_generation) =
            registry_with(Arc::new(host.clone()), &Config::new()).await;
        registry.attach(TAB).await.expect("attach");

        let (router, mut listener) = EventRouter::bind();
        let _panel2 = router.connect_tab(TAB).expect("connect");
        let (sender, _rx) = listener.accept().await.expect("capture end").split();
        let new_generation = registry.connect(TAB, sender);
        assert_ne!(old_generation, new_generation);

        registry.disconnect(TAB, old_generation).await;
        assert_eq!(registry.state(TAB), Some(AttachState::Attached));
        assert_eq!(host.detach_count(), 0);
    }

    #[tokio::test]
    async fn test_forward_requires_attached() {
        let host = ScriptedHost::new();
        let (registry, mut panel, _) = registry_with(Arc::new(host), &Config::new()).await;

        assert!(!registry.forward(TAB, CaptureMessage::status(true)));
        registry.attach(TAB).await.expect("attach");
        drain(&mut panel);

        assert!(registry.forward(TAB, CaptureMessage::status(true)));
        assert_eq!(drain(&mut panel).len(), 1);
        assert!(!registry.forward(TabId::new(99), CaptureMessage::status(true)));
    }

    #[tokio::test]
    async fn test_unknown_tab() {
        let registry = SessionRegistry::new(Arc::new(ScriptedHost::new()), &Config::new());
        assert!(matches!(
            registry.attach(TabId::new(7)).await,
            Err(Error::TabNotFound { .. })
        ));
        assert!(matches!(
            registry.detach(TabId::new(7)).await,
            Err(Error::TabNotFound { .. })
        ));
        registry.host_detached(TabId::new(7), "target_closed");
        assert!(registry.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_attach_timeout_reports_failure() {
        let config = Config::new().with_host_call_timeout(Duration::from_millis(50));
        let (registry, mut panel, _) = registry_with(Arc::new(HangingHost), &config).await;

        let state = registry.attach(TAB).await.expect("attach settles");
        assert_eq!(state, AttachState::Error("Timeout after 50ms: attach".into()));
        assert!(!state.is_pending());
        assert_eq!(
            drain(&mut panel),
            vec![CaptureMessage::attach_failed("Timeout after 50ms: attach")]
        );
    }

    #[test]
    fn test_timeout_millis_saturates() {
        assert_eq!(millis(Duration::from_millis(50)), 50);
        assert_eq!(millis(Duration::from_micros(1_999)), 1);
        assert_eq!(millis(Duration::MAX), u64::MAX);
        assert_eq!(
            Error::host_timeout("attach", millis(Duration::MAX)).to_string(),
            format!("Timeout after {}ms: attach", u64::MAX)
        );
    }

    #[tokio::test]
    async fn test_tabs_sorted() {
        let registry = SessionRegistry::new(Arc::new(ScriptedHost::new()), &Config::new());
        let (router, mut listener) = EventRouter::bind();
        let mut panels = Vec::new();
        for id in [9, 3, 5] {
            panels.push(router.connect_tab(TabId::new(id)).expect("connect"));
            let (sender, _rx) = listener.accept().await.expect("capture end").split();
            registry.connect(TabId::new(id), sender);
        }
        assert_eq!(registry.tabs(), vec![TabId::new(3), TabId::new(5), TabId::new(9)]);
        assert_eq!(registry.len(), 3);
    }
}
