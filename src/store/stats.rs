//! Incremental aggregates over the event log.
//!
//! Every aggregate is updated once per appended frame, so queries never
//! rescan the log.
//!
//! # Subscription counting
//!
//! Opened and closed subscriptions are tracked as two independent sets of
//! ids. The open count is the difference of their sizes, floored at zero:
//!
//! | Sequence | Opened | Closed | Open |
//! |----------|--------|--------|------|
//! | `REQ a`, `CLOSE a` | 1 | 1 | 0 |
//! | `REQ a`, `CLOSE a`, `REQ a` | 1 | 1 | 0 |
//! | `REQ a`, `CLOSE a`, `REQ b` | 2 | 1 | 1 |
//! | `CLOSE a` | 0 | 1 | 0 |
//!
//! This is an approximation, not a per-id lifecycle: reusing an id after
//! closing it does not reopen it, and closing an id that was never opened
//! still hides one open subscription.

// ============================================================================
// Imports
// ============================================================================

use std::collections::{BTreeMap, BTreeSet};

use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::protocol::{ClassifiedFrame, Direction, MessageType};

// ============================================================================
// Stats
// ============================================================================

/// Summary counters of the event log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    /// Frames in the log.
    pub total: usize,
    /// `EVENT` frames.
    pub nostr_events: usize,
    /// Protocol-control frames (every tag other than `EVENT`).
    pub ws_events: usize,
    /// Distinct subscription ids seen in `REQ` frames.
    pub subs_opened: usize,
    /// Distinct subscription ids seen in `CLOSE` frames.
    pub subs_closed: usize,
    /// `subs_opened - subs_closed`, floored at zero.
    pub subs_open: usize,
    /// Distinct event kinds seen.
    pub unique_kinds: usize,
}

// ============================================================================
// DirectionCounts
// ============================================================================

/// Frames per direction of travel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DirectionCounts {
    /// Relay to page.
    #[serde(rename = "in")]
    pub inbound: usize,
    /// Page to relay.
    #[serde(rename = "out")]
    pub outbound: usize,
}

impl DirectionCounts {
    /// Sum of both directions.
    #[inline]
    #[must_use]
    pub fn total(&self) -> usize {
        self.inbound + self.outbound
    }
}

// ============================================================================
// Aggregates
// ============================================================================

/// Running aggregates, updated per frame.
#[derive(Debug, Default)]
pub(crate) struct Aggregates {
    type_counts: FxHashMap<MessageType, usize>,
    kind_counts: FxHashMap<u64, usize>,
    kind_samples: FxHashMap<u64, Map<String, Value>>,
    pubkeys: FxHashSet<String>,
    directions: DirectionCounts,
    opened: FxHashSet<String>,
    closed: FxHashSet<String>,
}

impl Aggregates {
    /// Folds one frame into the aggregates.
    pub(crate) fn record(&mut self, frame: &ClassifiedFrame) {
        *self.type_counts.entry(frame.tag()).or_default() += 1;

        match frame.direction() {
            Direction::In => self.directions.inbound += 1,
            Direction::Out => self.directions.outbound += 1,
        }

        match frame.tag() {
            MessageType::Event => self.record_event(frame),
            MessageType::Req => {
                if let Some(id) = frame.subscription_id() {
                    self.opened.insert(id.to_string());
                }
            }
            MessageType::Close => {
                if let Some(id) = frame.subscription_id() {
                    self.closed.insert(id.to_string());
                }
            }
            _ => {}
        }
    }

    fn record_event(&mut self, frame: &ClassifiedFrame) {
        if let Some(kind) = frame.kind() {
            *self.kind_counts.entry(kind).or_default() += 1;

            if !self.kind_samples.contains_key(&kind)
                && let Some(event) = frame.event_object()
            {
                self.kind_samples.insert(kind, event.clone());
            }
        }

        if let Some(pubkey) = frame.pubkey()
            && !self.pubkeys.contains(pubkey)
        {
            self.pubkeys.insert(pubkey.to_string());
        }
    }

    /// Summary counters for a log of `total` frames.
    pub(crate) fn stats(&self, total: usize) -> Stats {
        let nostr_events = self.type_count(MessageType::Event);
        let ws_events = self
            .type_counts
            .iter()
            .filter(|(tag, _)| !tag.is_data())
            .map(|(_, count)| count)
            .sum();

        Stats {
            total,
            nostr_events,
            ws_events,
            subs_opened: self.opened.len(),
            subs_closed: self.closed.len(),
            subs_open: self.opened.len().saturating_sub(self.closed.len()),
            unique_kinds: self.kind_counts.len(),
        }
    }

    pub(crate) fn type_count(&self, tag: MessageType) -> usize {
        self.type_counts.get(&tag).copied().unwrap_or_default()
    }

    pub(crate) fn type_counts(&self) -> BTreeMap<MessageType, usize> {
        self.type_counts.iter().map(|(k, v)| (*k, *v)).collect()
    }

    pub(crate) fn kind_counts(&self) -> BTreeMap<u64, usize> {
        self.kind_counts.iter().map(|(k, v)| (*k, *v)).collect()
    }

    pub(crate) fn kind_samples(&self) -> BTreeMap<u64, Map<String, Value>> {
        self.kind_samples
            .iter()
            .map(|(k, v)| (*k, v.clone()))
            .collect()
    }

    pub(crate) fn unique_pubkeys(&self) -> BTreeSet<String> {
        self.pubkeys.iter().cloned().collect()
    }

    pub(crate) fn direction_counts(&self) -> DirectionCounts {
        self.directions
    }
}

// ============================================================================
// Tests
// ============================================================================
