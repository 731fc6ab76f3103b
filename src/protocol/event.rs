//! Host capture events.
//!
//! Events are notifications delivered by the host debugger API while it is
//! attached to a tab. Only the WebSocket part of the network domain is
//! interpreted, everything else parses to [`ParsedHostEvent::Unknown`].
//!
//! # Event Types
//!
//! | Method | Parsed as |
//! |--------|-----------|
//! | `Network.webSocketWillSendHandshakeRequest` | [`ParsedHostEvent::WebSocketHandshake`] |
//! | `Network.webSocketCreated` | [`ParsedHostEvent::WebSocketCreated`] |
//! | `Network.webSocketFrameSent` | [`ParsedHostEvent::WebSocketFrame`] (out) |
//! | `Network.webSocketFrameReceived` | [`ParsedHostEvent::WebSocketFrame`] (in) |

// ============================================================================
// Imports
// ============================================================================

use serde::Deserialize;
use serde_json::Value;

use crate::identifiers::{RequestId, TabId};

use super::frame::Direction;

// ============================================================================
// Constants
// ============================================================================

const HANDSHAKE_REQUEST: &str = "Network.webSocketWillSendHandshakeRequest";
const SOCKET_CREATED: &str = "Network.webSocketCreated";
const FRAME_SENT: &str = "Network.webSocketFrameSent";
const FRAME_RECEIVED: &str = "Network.webSocketFrameReceived";

// ============================================================================
// HostEvent
// ============================================================================

/// An event notification from the host debugger.
///
/// # Format
///
/// ```json
/// {
///   "method": "Network.webSocketFrameReceived",
///   "params": { "requestId": "1234.5", "timestamp": 17.2, "response": { "payloadData": "[...]" } }
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct HostEvent {
    /// Event name in `Domain.eventName` format.
    pub method: String,

    /// Event-specific data.
    #[serde(default)]
    pub params: Value,
}

impl HostEvent {
    /// Creates a host event.
    #[inline]
    #[must_use]
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            method: method.into(),
            params,
        }
    }

    /// Returns the domain name from the method (`Network`).
    #[inline]
    #[must_use]
    pub fn domain(&self) -> &str {
        self.method.split('.').next().unwrap_or_default()
    }

    /// Returns the event name from the method (`webSocketCreated`).
    #[inline]
    #[must_use]
    pub fn event_name(&self) -> &str {
        self.method.split('.').nth(1).unwrap_or_default()
    }

    /// Parses the event into a typed variant.
    #[must_use]
    pub fn parse(&self) -> ParsedHostEvent {
        match self.method.as_str() {
            HANDSHAKE_REQUEST => ParsedHostEvent::WebSocketHandshake {
                request_id: RequestId::new(self.get_string(&["requestId"])),
                url: self.get_string(&["request", "url"]),
            },

            SOCKET_CREATED => ParsedHostEvent::WebSocketCreated {
                request_id: RequestId::new(self.get_string(&["requestId"])),
                url: self.get_string(&["url"]),
            },

            FRAME_SENT => self.parse_frame(Direction::Out),

            FRAME_RECEIVED => self.parse_frame(Direction::In),

            _ => ParsedHostEvent::Unknown {
                method: self.method.clone(),
                params: self.params.clone(),
            },
        }
    }

    fn parse_frame(&self, direction: Direction) -> ParsedHostEvent {
        ParsedHostEvent::WebSocketFrame {
            request_id: self.frame_request_id(),
            direction,
            payload: self.get_optional_string(&["response", "payloadData"]),
            timestamp: self.pointer(&["timestamp"]).and_then(Value::as_f64),
        }
    }

    /// Request id of a frame event.
    ///
    /// Lives at `params.requestId`; some host versions nest it under
    /// `params.request.requestId` instead.
    fn frame_request_id(&self) -> Option<RequestId> {
        [&["requestId"][..], &["request", "requestId"][..]]
            .into_iter()
            .filter_map(|path| self.get_optional_string(path))
            .find(|id| !id.is_empty())
            .map(RequestId::new)
    }

    /// Walks a key path into params.
    #[inline]
    fn pointer(&self, path: &[&str]) -> Option<&Value> {
        path.iter()
            .try_fold(&self.params, |value, key| value.get(*key))
    }

    /// Gets a string from params.
    #[inline]
    fn get_string(&self, path: &[&str]) -> String {
        self.get_optional_string(path).unwrap_or_default()
    }

    /// Gets an optional string from params.
    #[inline]
    fn get_optional_string(&self, path: &[&str]) -> Option<String> {
        self.pointer(path)
            .and_then(Value::as_str)
            .map(str::to_string)
    }
}

// ============================================================================
// ParsedHostEvent
// ============================================================================

/// Parsed host events for type-safe handling.
#[derive(Debug, Clone)]
pub enum ParsedHostEvent {
    /// A WebSocket handshake is about to be sent.
    WebSocketHandshake {
        /// Request ID (empty when missing).
        request_id: RequestId,
        /// Target URL (empty when missing).
        url: String,
    },

    /// A WebSocket was created.
    WebSocketCreated {
        /// Request ID (empty when missing).
        request_id: RequestId,
        /// Socket URL (empty when missing).
        url: String,
    },

    /// A WebSocket frame was sent or received.
    WebSocketFrame {
        /// Request ID of the socket, if the host reported one.
        request_id: Option<RequestId>,
        /// Direction of travel.
        direction: Direction,
        /// Text payload; `None` for missing or non-string payloads.
        payload: Option<String>,
        /// Host timestamp.
        timestamp: Option<f64>,
    },

    /// Any other event.
    Unknown {
        /// Event method.
        method: String,
        /// Event params.
        params: Value,
    },
}

// ============================================================================
// HostNotification
// ============================================================================

/// Everything the host debugger feed can deliver for a tab.
#[derive(Debug, Clone)]
pub enum HostNotification {
    /// A debugger event for an attached tab.
    Event {
        /// Tab the event belongs to.
        tab_id: TabId,
        /// The event itself.
        event: HostEvent,
    },

    /// The host ended the debugging session on its own.
    ///
    /// Fires without a local detach call, e.g. when the user dismisses the
    /// host's "debugging this tab" banner.
    Detached {
        /// Tab that lost its debugger.
        tab_id: TabId,
        /// Host-provided reason (informational only).
        reason: String,
    },
}

impl HostNotification {
    /// Tab the notification belongs to.
    #[inline]
    #[must_use]
    pub fn tab_id(&self) -> TabId {
        match self {
            Self::Event { tab_id, .. } | Self::Detached { tab_id, .. } => *tab_id,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
