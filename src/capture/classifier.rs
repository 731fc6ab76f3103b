//! Relay frame classification.
//!
//! Most WebSocket traffic on a page is not relay traffic. Classification
//! keeps only text payloads shaped like `["<TAG>", ...]` with a tag from
//! the relay vocabulary and drops everything else without complaint.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use serde_json::Value;
use tracing::trace;
use url::Url;

use crate::identifiers::RequestId;
use crate::protocol::{ClassifiedFrame, Direction, MessageType};

use super::registry::ConnectionRegistry;

// ============================================================================
// Classification
// ============================================================================

/// A payload that passed the shape check but has no relay attached yet.
#[derive(Debug, Clone, PartialEq)]
pub struct RelayFrame {
    /// Message tag.
    pub tag: MessageType,
    /// Direction of travel.
    pub direction: Direction,
    /// Full frame, tag included.
    pub frame: Vec<Value>,
}

/// Checks whether a payload is a relay frame.
///
/// Returns `None` for non-JSON payloads, JSON that is not an array, and
/// arrays whose first element is not a known tag.
#[must_use]
pub fn classify(payload: &str, direction: Direction) -> Option<RelayFrame> {
    let Ok(Value::Array(frame)) = serde_json::from_str::<Value>(payload) else {
        return None;
    };

    let tag = frame
        .first()
        .and_then(Value::as_str)
        .and_then(MessageType::from_tag)?;

    Some(RelayFrame {
        tag,
        direction,
        frame,
    })
}

/// Reduces a relay URL to its hostname.
///
/// Falls back to the raw value when it does not parse as a URL.
#[must_use]
pub fn relay_hostname(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(url) => url.host_str().unwrap_or_default().to_string(),
        Err(_) => raw.to_string(),
    }
}

// ============================================================================
// FrameClassifier
// ============================================================================

/// Classifies captured frames and attributes them to their relay.
#[derive(Debug, Clone)]
pub struct FrameClassifier {
    registry: Arc<ConnectionRegistry>,
}

impl FrameClassifier {
    /// Creates a classifier resolving relays through `registry`.
    #[must_use]
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Returns the registry used for relay resolution.
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Classifies one captured frame.
    ///
    /// An unresolvable request id yields an empty relay, not an error.
    #[must_use]
    pub fn classify_frame(
        &self,
        request_id: Option<&RequestId>,
        direction: Direction,
        payload: &str,
        timestamp: Option<f64>,
    ) -> Option<ClassifiedFrame> {
        let Some(relay_frame) = classify(payload, direction) else {
            trace!(len = payload.len(), "Not a relay frame");
            return None;
        };

        let relay = match request_id {
            Some(id) => match self.registry.resolve(id) {
                Some(url) => relay_hostname(&url),
                None => {
                    trace!(request_id = %id, "No relay URL for request");
                    String::new()
                }
            },
            None => {
                trace!("Frame event without request id");
                String::new()
            }
        };

        ClassifiedFrame::from_parts(relay_frame.direction, relay_frame.frame, timestamp, relay)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_not_json() {
        assert!(classify("not json", Direction::In).is_none());
        assert!(classify("", Direction::Out).is_none());
    }

    #[test]
    fn test_not_array() {
        assert!(classify(r#"{"foo":1}"#, Direction::In).is_none());
        assert!(classify("\"REQ\"", Direction::In).is_none());
    }

    #[test]
    fn test_unknown_tag() {
        assert!(classify(r#"["BOGUS",1,2]"#, Direction::In).is_none());
        assert!(classify(r#"["",1]"#, Direction::In).is_none());
        assert!(classify(r#"[1,"REQ"]"#, Direction::In).is_none());
        assert!(classify("[]", Direction::In).is_none());
        assert!(classify(r#"["req","s"]"#, Direction::In).is_none());
    }

    #[test]
    fn test_req_out() {
        let frame = classify(r#"["REQ","sub1",{"kinds":[1]}]"#, Direction::Out).expect("relay frame");
        assert_eq!(frame.tag, MessageType::Req);
        assert_eq!(frame.direction, Direction::Out);
        assert_eq!(frame.frame, vec![json!("REQ"), json!("sub1"), json!({"kinds": [1]})]);
    }

    #[test]
    fn test_relay_hostname() {
        assert_eq!(relay_hostname("wss://relay.damus.io"), "relay.damus.io");
        assert_eq!(relay_hostname("wss://nos.lol:443/path?x=1"), "nos.lol");
        assert_eq!(relay_hostname("not a url"), "not a url");
    }

    #[test]
    fn test_classify_frame_resolves_relay() {
        let registry = Arc::new(ConnectionRegistry::unbounded());
        registry.record(RequestId::from("42.1"), "wss://relay.primal.net/v1");
        let classifier = FrameClassifier::new(registry);

        let frame = classifier
            .classify_frame(
                Some(&RequestId::from("42.1")),
                Direction::In,
                r#"["EOSE","sub1"]"#,
                Some(9.5),
            )
            .expect("classified");

        assert_eq!(frame.tag(), MessageType::Eose);
        assert_eq!(frame.relay(), "relay.primal.net");
        assert_eq!(frame.timestamp(), Some(9.5));
    }

    #[test]
    fn test_classify_frame_unresolved_relay_is_empty() {
        let classifier = FrameClassifier::new(Arc::new(ConnectionRegistry::unbounded()));

        let frame = classifier
            .classify_frame(Some(&RequestId::from("x")), Direction::In, r#"["NOTICE","hi"]"#, None)
            .expect("classified");
        assert_eq!(frame.relay(), "");

        let frame = classifier
            .classify_frame(None, Direction::Out, r#"["AUTH",{}]"#, None)
            .expect("classified");
        assert_eq!(frame.relay(), "");
    }

    proptest! {
        #[test]
        fn prop_non_array_json_never_classifies(n in any::<i64>(), s in "[a-zA-Z0-9 ]{0,24}") {
            let object = json!({ "tag": s.clone(), "n": n }).to_string();
            let string = Value::String(s).to_string();
            prop_assert!(classify(&object, Direction::In).is_none());
            prop_assert!(classify(&string, Direction::In).is_none());
            prop_assert!(classify(&n.to_string(), Direction::In).is_none());
        }

        #[test]
        fn prop_known_tags_always_classify(idx in 0usize..8, sub in "[a-z0-9]{1,12}") {
            let tag = MessageType::ALL[idx];
            let payload = json!([tag.as_str(), sub]).to_string();
            let frame = classify(&payload, Direction::In);
            prop_assert_eq!(frame.map(|f| f.tag), Some(tag));
        }

        #[test]
        fn prop_arbitrary_text_never_panics(payload in ".{0,64}") {
            let _ = classify(&payload, Direction::Out);
        }
    }
}
