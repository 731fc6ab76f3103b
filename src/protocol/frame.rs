//! Relay protocol frames.
//!
//! A relay frame is a JSON array whose first element is a message tag:
//!
//! ```json
//! ["REQ", "sub1", {"kinds": [1]}]
//! ["EVENT", "sub1", {"kind": 1, "pubkey": "abc", ...}]
//! ["CLOSE", "sub1"]
//! ```
//!
//! # Tags
//!
//! | Tag | Meaning |
//! |-----|---------|
//! | `REQ` | Open a subscription |
//! | `EVENT` | Data-carrying event |
//! | `EOSE` | End of stored events |
//! | `NOTICE` | Human-readable relay message |
//! | `CLOSE` | Close a subscription |
//! | `AUTH` | Authentication challenge/response |
//! | `COUNT` | Count request/response |
//! | `OK` | Command result |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;

// ============================================================================
// Constants
// ============================================================================

/// Number of characters kept by [`ClassifiedFrame::short_pubkey`].
const SHORT_PUBKEY_LEN: usize = 16;

/// Number of characters kept by a compact [`ClassifiedFrame::preview`].
const PREVIEW_LEN: usize = 100;

// ============================================================================
// MessageType
// ============================================================================

/// The fixed vocabulary of relay message tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageType {
    /// Open a subscription.
    Req,
    /// Data-carrying event.
    Event,
    /// End of stored events.
    Eose,
    /// Relay notice.
    Notice,
    /// Close a subscription.
    Close,
    /// Authentication.
    Auth,
    /// Count.
    Count,
    /// Command result.
    Ok,
}

impl MessageType {
    /// Every tag, in protocol order.
    pub const ALL: [Self; 8] = [
        Self::Req,
        Self::Event,
        Self::Eose,
        Self::Notice,
        Self::Close,
        Self::Auth,
        Self::Count,
        Self::Ok,
    ];

    /// Looks up a tag by its wire spelling. Matching is case-sensitive.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "REQ" => Some(Self::Req),
            "EVENT" => Some(Self::Event),
            "EOSE" => Some(Self::Eose),
            "NOTICE" => Some(Self::Notice),
            "CLOSE" => Some(Self::Close),
            "AUTH" => Some(Self::Auth),
            "COUNT" => Some(Self::Count),
            "OK" => Some(Self::Ok),
            _ => None,
        }
    }

    /// Returns the wire spelling.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Req => "REQ",
            Self::Event => "EVENT",
            Self::Eose => "EOSE",
            Self::Notice => "NOTICE",
            Self::Close => "CLOSE",
            Self::Auth => "AUTH",
            Self::Count => "COUNT",
            Self::Ok => "OK",
        }
    }

    /// Returns `true` for the data-carrying `EVENT` tag.
    ///
    /// Every other tag is a protocol-control message.
    #[inline]
    #[must_use]
    pub const fn is_data(self) -> bool {
        matches!(self, Self::Event)
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

// ============================================================================
// Direction
// ============================================================================

/// Direction of a frame relative to the inspected page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Received from the relay.
    In,
    /// Sent to the relay.
    Out,
}

impl Direction {
    /// Returns the wire spelling (`"in"` / `"out"`).
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::In => "in",
            Self::Out => "out",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

// ============================================================================
// ClassifiedFrame
// ============================================================================

/// A captured frame that passed classification.
///
/// Immutable once built. `payload[0]` always spells [`Self::tag`].
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedFrame {
    direction: Direction,
    tag: MessageType,
    payload: Vec<Value>,
    timestamp: Option<f64>,
    relay: String,
}

impl ClassifiedFrame {
    /// Builds a frame from its parts, re-deriving the tag from `payload[0]`.
    ///
    /// Returns `None` when the payload does not start with a known tag.
    #[must_use]
    pub fn from_parts(
        direction: Direction,
        payload: Vec<Value>,
        timestamp: Option<f64>,
        relay: impl Into<String>,
    ) -> Option<Self> {
        let tag = payload
            .first()
            .and_then(Value::as_str)
            .and_then(MessageType::from_tag)?;

        Some(Self {
            direction,
            tag,
            payload,
            timestamp,
            relay: relay.into(),
        })
    }

    /// Direction of travel.
    #[inline]
    #[must_use]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Message tag.
    #[inline]
    #[must_use]
    pub fn tag(&self) -> MessageType {
        self.tag
    }

    /// Full frame, tag included.
    #[inline]
    #[must_use]
    pub fn payload(&self) -> &[Value] {
        &self.payload
    }

    /// Host timestamp of the frame, if the host reported one.
    #[inline]
    #[must_use]
    pub fn timestamp(&self) -> Option<f64> {
        self.timestamp
    }

    /// Relay hostname, empty when the connection was never resolved.
    #[inline]
    #[must_use]
    pub fn relay(&self) -> &str {
        &self.relay
    }

    /// Consumes the frame and returns its payload.
    #[inline]
    #[must_use]
    pub fn into_payload(self) -> Vec<Value> {
        self.payload
    }
}

// ============================================================================
// ClassifiedFrame - Field Probes
// ============================================================================

impl ClassifiedFrame {
    /// Second positional element as a non-empty string.
    ///
    /// For `REQ`, `CLOSE`, `EOSE` and subscription-bound `EVENT`s this is the
    /// subscription id.
    #[must_use]
    pub fn subscription_id(&self) -> Option<&str> {
        self.payload
            .get(1)
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
    }

    /// Embedded event object of an `EVENT` frame.
    ///
    /// Relay-to-client frames carry it at position 2 (`["EVENT", sub, {..}]`),
    /// client-to-relay frames at position 1 (`["EVENT", {..}]`). Position 1
    /// wins when it has a `kind` field.
    #[must_use]
    pub fn event_object(&self) -> Option<&Map<String, Value>> {
        self.probe_event_object("kind", |_| true)
    }

    /// `kind` of the embedded event object.
    #[must_use]
    pub fn kind(&self) -> Option<u64> {
        self.event_object()
            .and_then(|event| event.get("kind"))
            .and_then(Value::as_u64)
    }

    /// `pubkey` of the embedded event object.
    ///
    /// Probed separately from [`Self::event_object`]: position 1 wins only
    /// when its `pubkey` is a non-empty string.
    #[must_use]
    pub fn pubkey(&self) -> Option<&str> {
        self.probe_event_object("pubkey", |v| v.as_str().is_some_and(|s| !s.is_empty()))
            .and_then(|event| event.get("pubkey"))
            .and_then(Value::as_str)
            .filter(|pubkey| !pubkey.is_empty())
    }

    /// Kind shown in a stream row.
    ///
    /// The event kind for `EVENT`, the first kind of the first filter that
    /// names any for `REQ`.
    #[must_use]
    pub fn display_kind(&self) -> Option<u64> {
        match self.tag {
            MessageType::Event => self.kind(),
            MessageType::Req => self
                .payload
                .iter()
                .skip(2)
                .filter_map(|filter| filter.get("kinds").and_then(Value::as_array))
                .find(|kinds| !kinds.is_empty())
                .and_then(|kinds| kinds[0].as_u64()),
            _ => None,
        }
    }

    /// Pubkey truncated for display (`abcdef0123456789...`).
    #[must_use]
    pub fn short_pubkey(&self) -> Option<String> {
        self.pubkey().map(|pubkey| {
            let short: String = pubkey.chars().take(SHORT_PUBKEY_LEN).collect();
            format!("{short}...")
        })
    }

    /// Preview text of a stream row.
    ///
    /// `EVENT` frames show their event object, everything else the whole
    /// frame. Expanded previews are pretty-printed; compact ones are a single
    /// line cut to 100 characters with a trailing `...`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if serialization fails.
    pub fn preview(&self, expanded: bool) -> Result<String> {
        let text = match self.event_object() {
            Some(event) => render(event, expanded)?,
            None => render(&self.payload, expanded)?,
        };

        if expanded {
            return Ok(text);
        }

        Ok(match text.char_indices().nth(PREVIEW_LEN) {
            Some((cut, _)) => format!("{}...", &text[..cut]),
            None => text,
        })
    }

    fn probe_event_object(
        &self,
        field: &str,
        accept: impl Fn(&Value) -> bool,
    ) -> Option<&Map<String, Value>> {
        if !self.tag.is_data() {
            return None;
        }

        let first = self.payload.get(1).and_then(Value::as_object);
        match first {
            Some(event) if event.get(field).is_some_and(&accept) => Some(event),
            _ => self.payload.get(2).and_then(Value::as_object),
        }
    }
}

fn render<T: Serialize + ?Sized>(value: &T, expanded: bool) -> Result<String> {
    let text = if expanded {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(text)
}

// ============================================================================
// Tests
// ============================================================================
