//! Type-safe identifiers.
//!
//! Newtype wrappers prevent mixing a tab id with a host request id or a
//! store subscription id at compile time.
//!
//! | Type | Origin | Inner |
//! |------|--------|-------|
//! | [`TabId`] | Host tab numbering | `u32` |
//! | [`RequestId`] | Host network request numbering | `String` |
//! | [`SubscriptionId`] | Store change subscriptions | `Uuid` |
//! | [`ChannelName`] | `devtools-<tab id>` channel names | `String` |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Prefix of every presentation channel name.
pub const CHANNEL_PREFIX: &str = "devtools-";

/// Matches `devtools-<digits>` and captures the digits.
static CHANNEL_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^devtools-(\d+)$").expect("channel name regex is valid")
});

// ============================================================================
// TabId
// ============================================================================

/// Identifier of an inspected browser tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(u32);

impl TabId {
    /// Creates a tab id.
    #[inline]
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw numeric id.
    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for TabId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

// ============================================================================
// RequestId
// ============================================================================

/// Host-assigned id of one underlying network connection.
///
/// Correlates handshake events with the frame events of the same socket.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    /// Creates a request id.
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` for the empty id.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RequestId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

// ============================================================================
// SubscriptionId
// ============================================================================

/// Handle returned by [`EventStore::subscribe`](crate::EventStore::subscribe).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    /// Generates a fresh random id.
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// ChannelName
// ============================================================================

/// Name of a presentation channel, binding it to one tab.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelName {
    name: String,
    tab_id: TabId,
}

impl ChannelName {
    /// Builds the channel name for a tab.
    #[must_use]
    pub fn for_tab(tab_id: TabId) -> Self {
        Self {
            name: format!("{CHANNEL_PREFIX}{tab_id}"),
            tab_id,
        }
    }

    /// Parses a channel name of the form `devtools-<tab id>`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidChannelName`] if the name has another shape
    /// or the id does not fit a tab id.
    pub fn parse(name: &str) -> Result<Self> {
        let tab_id = CHANNEL_NAME_RE
            .captures(name)
            .and_then(|caps| caps.get(1))
            .and_then(|digits| digits.as_str().parse::<u32>().ok())
            .ok_or_else(|| Error::invalid_channel_name(name))?;

        Ok(Self {
            name: name.to_string(),
            tab_id: TabId::new(tab_id),
        })
    }

    /// Returns the tab this channel is bound to.
    #[inline]
    #[must_use]
    pub fn tab_id(&self) -> TabId {
        self.tab_id
    }

    /// Returns the full channel name.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for ChannelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

// ============================================================================
// Tests
// ============================================================================
