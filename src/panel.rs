//! Presentation-side channel controller.
//!
//! A [`Panel`] owns the presentation end of one tab's channel. It sends
//! attach/detach requests, tracks whether the tab is being inspected and
//! feeds captured frames into an [`EventStore`].
//!
//! # Inspection flag
//!
//! | Action | Flag |
//! |--------|------|
//! | [`Panel::request_attach`] | unchanged until a status arrives |
//! | [`Panel::request_detach`] | cleared immediately |
//! | status message | set to its `attached` value |
//! | channel closed | cleared |
//!
//! # Example
//!
//! ```ignore
//! let store = Arc::new(EventStore::new());
//! let (panel, receiver) = Panel::connect(&router, tab_id, Arc::clone(&store))?;
//! let panel = Arc::new(panel);
//!
//! tokio::spawn({
//!     let panel = Arc::clone(&panel);
//!     async move { panel.run(receiver).await }
//! });
//!
//! panel.toggle()?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::error::Result;
use crate::identifiers::TabId;
use crate::protocol::{CaptureMessage, PanelMessage};
use crate::store::EventStore;
use crate::transport::{EventRouter, PanelReceiver, PanelSender};

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Default)]
struct PanelState {
    inspecting: bool,
    last_error: Option<String>,
}

// ============================================================================
// Panel
// ============================================================================

/// Presentation end of a tab's channel.
#[derive(Debug)]
pub struct Panel {
    sender: PanelSender,
    store: Arc<EventStore>,
    state: Mutex<PanelState>,
}

// ============================================================================
// Panel - Constructors
// ============================================================================

impl Panel {
    /// Creates a panel posting through `sender` into `store`.
    #[must_use]
    pub fn new(sender: PanelSender, store: Arc<EventStore>) -> Self {
        Self {
            sender,
            store,
            state: Mutex::new(PanelState::default()),
        }
    }

    /// Opens the channel for `tab_id` and creates its panel.
    ///
    /// The returned receiver is meant for [`Self::run`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelClosed`](crate::Error::ChannelClosed) if the
    /// capture side is not listening.
    pub fn connect(
        router: &EventRouter,
        tab_id: TabId,
        store: Arc<EventStore>,
    ) -> Result<(Self, PanelReceiver)> {
        let (sender, receiver) = router.connect_tab(tab_id)?.split();
        Ok((Self::new(sender, store), receiver))
    }
}

// ============================================================================
// Panel - Accessors
// ============================================================================

impl Panel {
    /// Channel name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        self.sender.name()
    }

    /// Store fed by this panel.
    #[inline]
    #[must_use]
    pub fn store(&self) -> &Arc<EventStore> {
        &self.store
    }

    /// Returns `true` while the tab is being inspected.
    #[inline]
    #[must_use]
    pub fn is_inspecting(&self) -> bool {
        self.state.lock().inspecting
    }

    /// Error carried by the last status message, if any.
    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.state.lock().last_error.clone()
    }
}

// ============================================================================
// Panel - Requests
// ============================================================================

impl Panel {
    /// Asks the capture side to start inspecting.
    ///
    /// The flag only changes once the capture side confirms.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelClosed`](crate::Error::ChannelClosed) if the
    /// capture end is gone.
    pub fn request_attach(&self) -> Result<()> {
        debug!(channel = self.name(), "Attach requested");
        self.sender.post(PanelMessage::Attach)
    }

    /// Asks the capture side to stop inspecting.
    ///
    /// The flag is cleared right away.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelClosed`](crate::Error::ChannelClosed) if the
    /// capture end is gone.
    pub fn request_detach(&self) -> Result<()> {
        debug!(channel = self.name(), "Detach requested");
        self.state.lock().inspecting = false;
        self.sender.post(PanelMessage::Detach)
    }

    /// Detaches while inspecting, attaches otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelClosed`](crate::Error::ChannelClosed) if the
    /// capture end is gone.
    pub fn toggle(&self) -> Result<()> {
        if self.is_inspecting() {
            self.request_detach()
        } else {
            self.request_attach()
        }
    }
}

// ============================================================================
// Panel - Messages
// ============================================================================

impl Panel {
    /// Pumps capture messages until the capture end closes.
    pub async fn run(&self, mut receiver: PanelReceiver) {
        while let Some(message) = receiver.recv().await {
            self.handle_message(message);
        }

        debug!(channel = self.name(), "Capture end closed");
        self.state.lock().inspecting = false;
    }

    /// Applies one capture message.
    pub fn handle_message(&self, message: CaptureMessage) {
        match message {
            CaptureMessage::Status { attached, error } => {
                match (&error, attached) {
                    (Some(reason), false) => debug!(channel = self.name(), reason, "Not inspecting"),
                    (Some(reason), true) => warn!(channel = self.name(), reason, "Inspection error"),
                    (None, _) => debug!(channel = self.name(), attached, "Status"),
                }

                let mut state = self.state.lock();
                state.inspecting = attached;
                state.last_error = error;
            }

            nostr @ CaptureMessage::Nostr { .. } => match nostr.into_frame() {
                Some(frame) => {
                    self.store.add_event(frame);
                }
                None => trace!(channel = self.name(), "Frame with unknown tag dropped"),
            },
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    use crate::capture::CaptureService;
    use crate::capture::host::testing::ScriptedHost;
    use crate::config::Config;
    use crate::protocol::{Direction, HostEvent, HostNotification};

    const TAB: TabId = TabId::new(12);

    struct Harness {
        service: Arc<CaptureService>,
        panel: Panel,
        receiver: PanelReceiver,
        host: ScriptedHost,
        _router: EventRouter,
    }

    async fn harness() -> Harness {
        let host = ScriptedHost::new();
        let service = CaptureService::new(Arc::new(host.clone()), Config::new()).expect("service");
        let (router, mut listener) = EventRouter::bind();

        let (panel, receiver) =
            Panel::connect(&router, TAB, Arc::new(EventStore::new())).expect("connect");
        service
            .connect_port(listener.accept().await.expect("capture end"))
            .expect("valid name");

        Harness {
            service,
            panel,
            receiver,
            host,
            _router: router,
        }
    }

    async fn pump_one(h: &mut Harness) {
        let message = h.receiver.recv().await.expect("message");
        h.panel.handle_message(message);
    }

    fn frame_received(payload: &str) -> HostNotification {
        HostNotification::Event {
            tab_id: TAB,
            event: HostEvent::new(
                "Network.webSocketFrameReceived",
                json!({ "requestId": "3", "timestamp": 1.0, "response": { "payloadData": payload } }),
            ),
        }
    }

    #[tokio::test]
    async fn test_toggle_attach_then_detach() {
        let mut h = harness().await;
        assert_eq!(h.panel.name(), "devtools-12");
        assert!(!h.panel.is_inspecting());

        h.panel.toggle().expect("attach");
        pump_one(&mut h).await;
        assert!(h.panel.is_inspecting());

        h.panel.toggle().expect("detach");
        assert!(!h.panel.is_inspecting());
        pump_one(&mut h).await;
        assert!(!h.panel.is_inspecting());

        assert_eq!(h.host.attach_count(), 1);
        assert_eq!(h.host.detach_count(), 1);
    }

    #[tokio::test]
    async fn test_attach_failure_reported() {
        let mut h = harness().await;
        h.host.fail_attach("Another debugger is already attached");

        h.panel.request_attach().expect("post");
        pump_one(&mut h).await;

        assert!(!h.panel.is_inspecting());
        assert_eq!(
            h.panel.last_error().as_deref(),
            Some("Another debugger is already attached")
        );
    }

    #[tokio::test]
    async fn test_frames_reach_store() {
        let mut h = harness().await;
        h.panel.request_attach().expect("post");
        pump_one(&mut h).await;

        h.service
            .handle_host_notification(frame_received(r#"["EVENT","s",{"kind":1,"pubkey":"abc"}]"#));
        h.service.handle_host_notification(frame_received(r#"["EOSE","s"]"#));
        h.service.handle_host_notification(frame_received("garbage"));
        pump_one(&mut h).await;
        pump_one(&mut h).await;

        let store = h.panel.store();
        assert_eq!(store.len(), 2);
        assert_eq!(store.stats().nostr_events, 1);
        assert_eq!(store.all_events()[0].direction(), Direction::In);
        assert!(h.receiver.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_paused_store_drops_forwarded_frames() {
        let mut h = harness().await;
        h.panel.request_attach().expect("post");
        pump_one(&mut h).await;

        h.panel.store().set_paused(true);
        h.service.handle_host_notification(frame_received(r#"["NOTICE","hi"]"#));
        pump_one(&mut h).await;

        assert!(h.panel.store().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_tag_message_dropped() {
        let h = harness().await;
        h.panel.handle_message(CaptureMessage::Nostr {
            dir: Direction::In,
            frame: vec![json!("BOGUS")],
            timestamp: None,
            relay: None,
        });
        assert!(h.panel.store().is_empty());
    }

    #[tokio::test]
    async fn test_run_clears_flag_when_capture_closes() {
        let (router, mut listener) = EventRouter::bind();
        let (panel, receiver) =
            Panel::connect(&router, TAB, Arc::new(EventStore::new())).expect("connect");
        let capture = listener.accept().await.expect("capture end");

        capture.post(CaptureMessage::status(true)).expect("post");
        capture.disconnect();
        panel.run(receiver).await;

        assert!(!panel.is_inspecting());
        assert!(panel.request_attach().is_err());
    }

    #[test]
    fn test_connect_without_listener() {
        let (router, listener) = EventRouter::bind();
        drop(listener);
        assert!(Panel::connect(&router, TAB, Arc::new(EventStore::new())).is_err());
    }
}
