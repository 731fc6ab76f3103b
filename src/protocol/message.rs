//! Channel message types.
//!
//! Messages exchanged over a per-tab [`EventRouter`](crate::EventRouter)
//! channel between the capture side and the presentation side.
//!
//! | Message | Direction | JSON |
//! |---------|-----------|------|
//! | [`CaptureMessage::Status`] | capture → panel | `{"type":"status","attached":true,"error"?:"..."}` |
//! | [`CaptureMessage::Nostr`] | capture → panel | `{"type":"nostr","dir":"in","frame":[...],"timestamp"?:1.5,"relay"?:"host"}` |
//! | [`PanelMessage::Attach`] | panel → capture | `{"type":"attach"}` |
//! | [`PanelMessage::Detach`] | panel → capture | `{"type":"detach"}` |

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::frame::{ClassifiedFrame, Direction};

// ============================================================================
// CaptureMessage
// ============================================================================

/// A message from the capture side to the presentation side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CaptureMessage {
    /// Current attach status of the tab.
    Status {
        /// Whether traffic is being captured.
        attached: bool,
        /// Attach failure reason.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },

    /// A classified relay frame.
    Nostr {
        /// Direction of travel.
        dir: Direction,
        /// Full frame, tag included.
        frame: Vec<Value>,
        /// Host timestamp.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<f64>,
        /// Relay hostname (empty when unresolved).
        #[serde(default, skip_serializing_if = "Option::is_none")]
        relay: Option<String>,
    },
}

impl CaptureMessage {
    /// Creates a status message without an error.
    #[inline]
    #[must_use]
    pub fn status(attached: bool) -> Self {
        Self::Status {
            attached,
            error: None,
        }
    }

    /// Creates a detached status carrying a failure reason.
    #[inline]
    #[must_use]
    pub fn attach_failed(error: impl Into<String>) -> Self {
        Self::Status {
            attached: false,
            error: Some(error.into()),
        }
    }

    /// Converts a `Nostr` message back into a frame.
    ///
    /// Returns `None` for status messages and for frames whose tag is not in
    /// the vocabulary.
    #[must_use]
    pub fn into_frame(self) -> Option<ClassifiedFrame> {
        match self {
            Self::Nostr {
                dir,
                frame,
                timestamp,
                relay,
            } => ClassifiedFrame::from_parts(dir, frame, timestamp, relay.unwrap_or_default()),
            Self::Status { .. } => None,
        }
    }
}

impl From<ClassifiedFrame> for CaptureMessage {
    fn from(frame: ClassifiedFrame) -> Self {
        let dir = frame.direction();
        let timestamp = frame.timestamp();
        let relay = frame.relay().to_string();

        Self::Nostr {
            dir,
            frame: frame.into_payload(),
            timestamp,
            relay: Some(relay),
        }
    }
}

// ============================================================================
// PanelMessage
// ============================================================================

/// A request from the presentation side to the capture side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PanelMessage {
    /// Start capturing the tab's traffic.
    Attach,
    /// Stop capturing the tab's traffic.
    Detach,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_status_json() {
        let json = serde_json::to_value(CaptureMessage::status(true)).expect("serialize");
        assert_eq!(json, json!({"type": "status", "attached": true}));

        let json =
            serde_json::to_value(CaptureMessage::attach_failed("already attached")).expect("serialize");
        assert_eq!(
            json,
            json!({"type": "status", "attached": false, "error": "already attached"})
        );
    }

    #[test]
    fn test_nostr_json() {
        let frame = ClassifiedFrame::from_parts(
            Direction::Out,
            vec![json!("REQ"), json!("sub1"), json!({"kinds": [1]})],
            Some(1700.25),
            "relay.damus.io",
        )
        .expect("known tag");

        let json = serde_json::to_value(CaptureMessage::from(frame)).expect("serialize");
        assert_eq!(
            json,
            json!({
                "type": "nostr",
                "dir": "out",
                "frame": ["REQ", "sub1", {"kinds": [1]}],
                "timestamp": 1700.25,
                "relay": "relay.damus.io"
            })
        );
    }

    #[test]
    fn test_nostr_without_optional_fields() {
        let msg: CaptureMessage =
            serde_json::from_str(r#"{"type":"nostr","dir":"in","frame":["EOSE","s"]}"#)
                .expect("parse");
        let frame = msg.into_frame().expect("frame");
        assert_eq!(frame.relay(), "");
        assert_eq!(frame.timestamp(), None);
    }

    #[test]
    fn test_into_frame_rejects_status_and_bogus_tags() {
        assert!(CaptureMessage::status(false).into_frame().is_none());

        let msg = CaptureMessage::Nostr {
            dir: Direction::In,
            frame: vec![json!("BOGUS")],
            timestamp: None,
            relay: None,
        };
        assert!(msg.into_frame().is_none());
    }

    #[test]
    fn test_panel_messages() {
        assert_eq!(
            serde_json::to_value(PanelMessage::Attach).expect("serialize"),
            json!({"type": "attach"})
        );
        let msg: PanelMessage = serde_json::from_str(r#"{"type":"detach"}"#).expect("parse");
        assert_eq!(msg, PanelMessage::Detach);
        assert!(serde_json::from_str::<PanelMessage>(r#"{"type":"reload"}"#).is_err());
    }
}
