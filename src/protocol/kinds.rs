//! Human-readable names for common event kinds.

// ============================================================================
// Kind Table
// ============================================================================

/// Sorted by kind so lookups can binary search.
const KIND_NAMES: &[(u64, &str)] = &[
    (0, "Profile"),
    (1, "Text Note"),
    (2, "Relay Rec"),
    (3, "Contacts"),
    (4, "Encrypted DM"),
    (5, "Event Delete"),
    (6, "Repost"),
    (7, "Reaction"),
    (8, "Badge Award"),
    (16, "Generic Repost"),
    (40, "Channel Create"),
    (41, "Channel Metadata"),
    (42, "Channel Message"),
    (43, "Channel Hide"),
    (44, "Channel Mute"),
    (1040, "OpenTimestamps"),
    (1063, "File Metadata"),
    (1311, "Live Chat"),
    (1984, "Reporting"),
    (1985, "Label"),
    (4550, "Community Post Approval"),
    (5000, "DM Relays"),
    (5999, "DM Relays"),
    (6000, "Repost (Kind 6000-6999)"),
    (7000, "Job Request"),
    (7001, "Job Result"),
    (9041, "Zap Goal"),
    (9734, "Zap Request"),
    (9735, "Zap Receipt"),
    (9802, "Highlights"),
    (10000, "Mute List"),
    (10001, "Pin List"),
    (10002, "Relay List"),
    (10003, "Bookmarks"),
    (10004, "Communities"),
    (10005, "Public Chats"),
    (10006, "Blocked Relays"),
    (10007, "Search Relays"),
    (10009, "User Groups"),
    (10015, "Interests"),
    (10030, "User Emoji"),
    (10050, "DM Relay List"),
    (10096, "File Storage"),
    (13194, "Wallet Info"),
    (21000, "Lightning Pub RPC"),
    (22242, "Client Auth"),
    (23194, "Wallet Info"),
    (23195, "Wallet Request"),
    (24133, "Nostr Connect"),
    (27235, "HTTP Auth"),
    (30000, "Follow Sets"),
    (30001, "Generic Lists"),
    (30002, "Relay Sets"),
    (30003, "Bookmark Sets"),
    (30004, "Curation Sets"),
    (30005, "Video Sets"),
    (30007, "Video View"),
    (30008, "Profile Badges"),
    (30009, "Badge Definition"),
    (30015, "Interest Sets"),
    (30017, "Stall"),
    (30018, "Product"),
    (30019, "Marketplace"),
    (30020, "Product Sold"),
    (30023, "Long-form"),
    (30024, "Draft Long-form"),
    (30030, "Emoji Sets"),
    (30063, "Release Artifact Sets"),
    (30078, "App Data"),
    (30311, "Live Event"),
    (30315, "User Status"),
    (30388, "Slide Set"),
    (30402, "Classified Listing"),
    (30403, "Draft Classified"),
    (30617, "Repository"),
    (30618, "Repository State"),
    (30818, "Wiki Article"),
    (30819, "Wiki Redirect"),
    (31922, "Date-Based Calendar"),
    (31923, "Time-Based Calendar"),
    (31924, "Calendar"),
    (31925, "Calendar RSVP"),
    (31989, "Handler Rec"),
    (31990, "Handler Info"),
    (34235, "Video Event"),
    (34236, "Short Video"),
];

// ============================================================================
// Lookup
// ============================================================================

/// Returns the display name of a kind, if it is a well-known one.
#[must_use]
pub fn kind_name(kind: u64) -> Option<&'static str> {
    KIND_NAMES
        .binary_search_by_key(&kind, |(k, _)| *k)
        .ok()
        .map(|idx| KIND_NAMES[idx].1)
}

/// Label for a kind: `"1 - Text Note"`, or just `"12345"` when unnamed.
#[must_use]
pub fn kind_label(kind: u64) -> String {
    match kind_name(kind) {
        Some(name) => format!("{kind} - {name}"),
        None => kind.to_string(),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_sorted() {
        assert!(KIND_NAMES.windows(2).all(|w| w[0].0 < w[1].0));
    }

    #[test]
    fn test_known_kinds() {
        assert_eq!(kind_name(1), Some("Text Note"));
        assert_eq!(kind_name(9735), Some("Zap Receipt"));
        assert_eq!(kind_name(34236), Some("Short Video"));
    }

    #[test]
    fn test_unknown_kind() {
        assert_eq!(kind_name(12345), None);
        assert_eq!(kind_label(12345), "12345");
        assert_eq!(kind_label(0), "0 - Profile");
    }
}
