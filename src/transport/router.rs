//! Per-tab duplex channels between capture side and presentation side.
//!
//! # Lifecycle
//!
//! 1. The presentation side calls [`EventRouter::connect`] with a channel
//!    name (`devtools-<tab id>`) and keeps the returned [`PanelPort`]
//! 2. The capture side receives the matching [`CapturePort`] from
//!    [`PortListener::accept`]
//! 3. Both ends exchange messages in FIFO order, unbounded
//! 4. Dropping either end closes the channel; the other end's `recv`
//!    returns `None`
//!
//! There is no ordering between different channels.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::identifiers::{ChannelName, TabId};
use crate::protocol::{CaptureMessage, PanelMessage};

// ============================================================================
// Types
// ============================================================================

/// Capture-side end of a tab channel.
pub type CapturePort = Port<CaptureMessage, PanelMessage>;

/// Presentation-side end of a tab channel.
pub type PanelPort = Port<PanelMessage, CaptureMessage>;

/// Sending half of a [`CapturePort`].
pub type CaptureSender = PortSender<CaptureMessage>;

/// Receiving half of a [`CapturePort`].
pub type CaptureReceiver = PortReceiver<PanelMessage>;

/// Sending half of a [`PanelPort`].
pub type PanelSender = PortSender<PanelMessage>;

/// Receiving half of a [`PanelPort`].
pub type PanelReceiver = PortReceiver<CaptureMessage>;

// ============================================================================
// EventRouter
// ============================================================================

/// Opens named channels and hands their capture ends to a [`PortListener`].
///
/// Cloning the router shares the same listener.
#[derive(Clone)]
pub struct EventRouter {
    connect_tx: mpsc::UnboundedSender<CapturePort>,
}

impl fmt::Debug for EventRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventRouter")
            .field("listening", &!self.connect_tx.is_closed())
            .finish()
    }
}

impl EventRouter {
    /// Creates a router and the listener that receives its capture ends.
    #[must_use]
    pub fn bind() -> (Self, PortListener) {
        let (connect_tx, connect_rx) = mpsc::unbounded_channel();
        (Self { connect_tx }, PortListener { connect_rx })
    }

    /// Opens a channel under `name` and returns the presentation end.
    ///
    /// The name is not validated here; the capture side rejects names that
    /// do not encode a tab id by dropping its end.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelClosed`] if the listener is gone.
    pub fn connect(&self, name: impl Into<String>) -> Result<PanelPort> {
        let name: Arc<str> = Arc::from(name.into());
        let (capture_end, panel_end) = CapturePort::pair(Arc::clone(&name));

        self.connect_tx
            .send(capture_end)
            .map_err(|_| Error::ChannelClosed)?;

        debug!(channel = %name, "Channel opened");
        Ok(panel_end)
    }

    /// Opens the channel for a tab (`devtools-<tab id>`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelClosed`] if the listener is gone.
    pub fn connect_tab(&self, tab_id: TabId) -> Result<PanelPort> {
        self.connect(ChannelName::for_tab(tab_id).as_str())
    }
}

// ============================================================================
// PortListener
// ============================================================================

/// Receives the capture ends of newly opened channels.
#[derive(Debug)]
pub struct PortListener {
    connect_rx: mpsc::UnboundedReceiver<CapturePort>,
}

impl PortListener {
    /// Waits for the next channel.
    ///
    /// Returns `None` once every router clone has been dropped.
    pub async fn accept(&mut self) -> Option<CapturePort> {
        self.connect_rx.recv().await
    }
}

// ============================================================================
// Port
// ============================================================================

/// One end of a named duplex channel.
///
/// Sends `S`, receives `R`.
pub struct Port<S, R> {
    name: Arc<str>,
    tx: mpsc::UnboundedSender<S>,
    rx: mpsc::UnboundedReceiver<R>,
}

impl<S, R> fmt::Debug for Port<S, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Port")
            .field("name", &self.name)
            .field("closed", &self.tx.is_closed())
            .finish_non_exhaustive()
    }
}

impl<S, R> Port<S, R> {
    /// Creates two connected ends sharing one name.
    fn pair(name: Arc<str>) -> (Self, Port<R, S>) {
        let (a_tx, b_rx) = mpsc::unbounded_channel();
        let (b_tx, a_rx) = mpsc::unbounded_channel();

        (
            Self {
                name: Arc::clone(&name),
                tx: a_tx,
                rx: a_rx,
            },
            Port {
                name,
                tx: b_tx,
                rx: b_rx,
            },
        )
    }

    /// Returns the channel name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Posts a message to the other end.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelClosed`] if the other end is gone.
    pub fn post(&self, message: S) -> Result<()> {
        self.tx.send(message).map_err(|_| Error::ChannelClosed)
    }

    /// Waits for the next message from the other end.
    ///
    /// Returns `None` once the other end has disconnected and every queued
    /// message has been read.
    pub async fn recv(&mut self) -> Option<R> {
        self.rx.recv().await
    }

    /// Returns a queued message without waiting.
    pub fn try_recv(&mut self) -> Option<R> {
        self.rx.try_recv().ok()
    }

    /// Splits the port so sending and receiving can live in different tasks.
    #[must_use]
    pub fn split(self) -> (PortSender<S>, PortReceiver<R>) {
        (
            PortSender {
                name: Arc::clone(&self.name),
                tx: self.tx,
            },
            PortReceiver {
                name: self.name,
                rx: self.rx,
            },
        )
    }

    /// Closes this end.
    pub fn disconnect(self) {
        debug!(channel = %self.name, "Channel disconnected");
    }
}

// ============================================================================
// PortSender
// ============================================================================

/// Sending half of a [`Port`].
pub struct PortSender<S> {
    name: Arc<str>,
    tx: mpsc::UnboundedSender<S>,
}

impl<S> Clone for PortSender<S> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            tx: self.tx.clone(),
        }
    }
}

impl<S> fmt::Debug for PortSender<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PortSender")
            .field("name", &self.name)
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

impl<S> PortSender<S> {
    /// Returns the channel name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Posts a message to the other end.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelClosed`] if the other end is gone.
    pub fn post(&self, message: S) -> Result<()> {
        trace!(channel = %self.name, "Posting message");
        self.tx.send(message).map_err(|_| Error::ChannelClosed)
    }

    /// Returns `true` once the other end has disconnected.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

// ============================================================================
// PortReceiver
// ============================================================================

/// Receiving half of a [`Port`].
pub struct PortReceiver<R> {
    name: Arc<str>,
    rx: mpsc::UnboundedReceiver<R>,
}

impl<R> fmt::Debug for PortReceiver<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PortReceiver")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl<R> PortReceiver<R> {
    /// Returns the channel name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Waits for the next message from the other end.
    pub async fn recv(&mut self) -> Option<R> {
        self.rx.recv().await
    }

    /// Returns a queued message without waiting.
    pub fn try_recv(&mut self) -> Option<R> {
        self.rx.try_recv().ok()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    use crate::protocol::Direction;

    fn nostr(n: u64) -> CaptureMessage {
        CaptureMessage::Nostr {
            dir: Direction::In,
            frame: vec![json!("EOSE"), json!(format!("sub{n}"))],
            timestamp: Some(n as f64),
            relay: None,
        }
    }

    #[tokio::test]
    async fn test_connect_delivers_capture_end() {
        let (router, mut listener) = EventRouter::bind();
        let panel = router.connect_tab(TabId::new(5)).expect("connect");

        let capture = listener.accept().await.expect("capture end");
        assert_eq!(capture.name(), "devtools-5");
        assert_eq!(panel.name(), "devtools-5");
    }

    #[tokio::test]
    async fn test_messages_flow_both_ways_in_order() {
        let (router, mut listener) = EventRouter::bind();
        let mut panel = router.connect("devtools-1").expect("connect");
        let mut capture = listener.accept().await.expect("capture end");

        panel.post(PanelMessage::Attach).expect("post");
        panel.post(PanelMessage::Detach).expect("post");
        assert_eq!(capture.recv().await, Some(PanelMessage::Attach));
        assert_eq!(capture.recv().await, Some(PanelMessage::Detach));

        for n in 0..10 {
            capture.post(nostr(n)).expect("post");
        }
        for n in 0..10 {
            assert_eq!(panel.recv().await, Some(nostr(n)));
        }
    }

    #[tokio::test]
    async fn test_disconnect_is_observed() {
        let (router, mut listener) = EventRouter::bind();
        let panel = router.connect_tab(TabId::new(2)).expect("connect");
        let (sender, mut receiver) = listener.accept().await.expect("capture end").split();

        assert!(!sender.is_closed());
        panel.disconnect();

        assert_eq!(receiver.recv().await, None);
        assert!(sender.is_closed());
        assert!(matches!(
            sender.post(CaptureMessage::status(false)),
            Err(Error::ChannelClosed)
        ));
    }

    #[tokio::test]
    async fn test_connect_without_listener_fails() {
        let (router, listener) = EventRouter::bind();
        drop(listener);
        assert!(matches!(router.connect("devtools-1"), Err(Error::ChannelClosed)));
    }

    #[test]
    fn test_accept_waits_for_connect() {
        let (router, mut listener) = EventRouter::bind();
        let mut accept = tokio_test::task::spawn(async move {
            listener.accept().await.map(|port| port.name().to_string())
        });

        tokio_test::assert_pending!(accept.poll());

        let _panel = router.connect_tab(TabId::new(8)).expect("connect");
        assert!(accept.is_woken());
        tokio_test::assert_ready_eq!(accept.poll(), Some("devtools-8".to_string()));
    }

    #[tokio::test]
    async fn test_queued_messages_survive_disconnect() {
        let (router, mut listener) = EventRouter::bind();
        let panel = router.connect_tab(TabId::new(3)).expect("connect");
        let mut capture = listener.accept().await.expect("capture end");

        panel.post(PanelMessage::Attach).expect("post");
        drop(panel);

        assert_eq!(capture.recv().await, Some(PanelMessage::Attach));
        assert_eq!(capture.recv().await, None);
    }
}
