//! Capture-side event dispatch.
//!
//! [`CaptureService`] owns everything on the capture side and wires the two
//! inputs it receives:
//!
//! - Presentation channels, one per inspected tab (attach/detach requests)
//! - The host's notification feed (network events, external detaches)
//!
//! # Example
//!
//! ```ignore
//! let (router, listener) = EventRouter::bind();
//! let service = CaptureService::new(host, Config::new())?;
//!
//! tokio::spawn(Arc::clone(&service).serve(listener));
//! tokio::spawn(Arc::clone(&service).run(host_events));
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::config::Config;
use crate::error::Result;
use crate::identifiers::{ChannelName, TabId};
use crate::protocol::{CaptureMessage, HostEvent, HostNotification, PanelMessage, ParsedHostEvent};
use crate::transport::{CapturePort, CaptureReceiver, PortListener};

use super::classifier::FrameClassifier;
use super::host::DebuggerHost;
use super::registry::ConnectionRegistry;
use super::session::SessionRegistry;

// ============================================================================
// CaptureService
// ============================================================================

/// Owner of the capture side: sessions, connection registry, classifier.
#[derive(Debug)]
pub struct CaptureService {
    sessions: SessionRegistry,
    classifier: FrameClassifier,
}

// ============================================================================
// CaptureService - Constructor
// ============================================================================

impl CaptureService {
    /// Creates a capture service driving `host`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) if the configuration is invalid.
    pub fn new(host: Arc<dyn DebuggerHost>, config: Config) -> Result<Arc<Self>> {
        config.validate()?;

        let registry = Arc::new(ConnectionRegistry::new(config.registry_capacity));

        Ok(Arc::new(Self {
            sessions: SessionRegistry::new(host, &config),
            classifier: FrameClassifier::new(registry),
        }))
    }
}

// ============================================================================
// CaptureService - Accessors
// ============================================================================

impl CaptureService {
    /// Per-tab sessions.
    #[inline]
    #[must_use]
    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    /// Tracked WebSocket connections.
    #[inline]
    #[must_use]
    pub fn connections(&self) -> &ConnectionRegistry {
        self.classifier.registry()
    }
}

// ============================================================================
// CaptureService - Channels
// ============================================================================

impl CaptureService {
    /// Accepts presentation channels until the router is dropped.
    pub async fn serve(self: Arc<Self>, mut listener: PortListener) {
        while let Some(port) = listener.accept().await {
            if let Err(e) = self.connect_port(port) {
                warn!(error = %e, "Rejected channel");
            }
        }
        debug!("Channel listener closed");
    }

    /// Registers a presentation channel and spawns its message pump.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidChannelName`](crate::Error::InvalidChannelName)
    /// if the channel name does not encode a tab id. The port is dropped,
    /// which closes the channel.
    pub fn connect_port(self: &Arc<Self>, port: CapturePort) -> Result<JoinHandle<()>> {
        let tab_id = ChannelName::parse(port.name())?.tab_id();
        let (sender, receiver) = port.split();
        let generation = self.sessions.connect(tab_id, sender);

        Ok(tokio::spawn(
            Arc::clone(self).pump_port(tab_id, generation, receiver),
        ))
    }

    /// Handles one channel's requests in order, then its disconnect.
    async fn pump_port(self: Arc<Self>, tab_id: TabId, generation: u64, mut receiver: CaptureReceiver) {
        while let Some(message) = receiver.recv().await {
            debug!(%tab_id, ?message, "Panel request");

            let result = match message {
                PanelMessage::Attach => self.sessions.attach(tab_id).await,
                PanelMessage::Detach => self.sessions.detach(tab_id).await,
            };

            if let Err(e) = result {
                debug!(%tab_id, error = %e, "Panel request dropped");
            }
        }

        self.sessions.disconnect(tab_id, generation).await;
    }
}

// ============================================================================
// CaptureService - Host Events
// ============================================================================

impl CaptureService {
    /// Drives the host notification feed until it closes.
    pub async fn run(self: Arc<Self>, mut host_events: mpsc::UnboundedReceiver<HostNotification>) {
        while let Some(notification) = host_events.recv().await {
            self.handle_host_notification(notification);
        }
        debug!("Host event feed closed");
    }

    /// Dispatches one host notification.
    pub fn handle_host_notification(&self, notification: HostNotification) {
        match notification {
            HostNotification::Event { tab_id, event } => {
                self.handle_host_event(tab_id, &event);
            }
            HostNotification::Detached { tab_id, reason } => {
                self.sessions.host_detached(tab_id, &reason);
            }
        }
    }

    /// Handles one host event for a tab.
    ///
    /// Events for tabs that are not attached are ignored entirely, handshake
    /// tracking included. Returns `true` if a frame was forwarded.
    pub fn handle_host_event(&self, tab_id: TabId, event: &HostEvent) -> bool {
        if !self.sessions.is_attached(tab_id) {
            return false;
        }

        match event.parse() {
            ParsedHostEvent::WebSocketHandshake { request_id, url }
            | ParsedHostEvent::WebSocketCreated { request_id, url } => {
                self.connections().record(request_id, url);
                false
            }

            ParsedHostEvent::WebSocketFrame {
                request_id,
                direction,
                payload,
                timestamp,
            } => {
                let Some(payload) = payload else {
                    trace!(%tab_id, "Frame without text payload");
                    return false;
                };

                let Some(frame) = self.classifier.classify_frame(
                    request_id.as_ref(),
                    direction,
                    &payload,
                    timestamp,
                ) else {
                    return false;
                };

                trace!(%tab_id, tag = %frame.tag(), relay = frame.relay(), "Relay frame");
                self.sessions.forward(tab_id, CaptureMessage::from(frame))
            }

            ParsedHostEvent::Unknown { .. } => {
                trace!(
                    %tab_id,
                    domain = event.domain(),
                    event = event.event_name(),
                    "Host event ignored"
                );
                false
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
