//! Channel transport between capture side and presentation side.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐                         ┌──────────────────────┐
//! │  Capture side        │     devtools-<tab id>   │  Presentation side   │
//! │                      │                         │                      │
//! │  CaptureService      │ ── status / nostr ────► │  Panel → EventStore  │
//! │  (CapturePort)       │ ◄── attach / detach ─── │  (PanelPort)         │
//! └──────────────────────┘                         └──────────────────────┘
//! ```
//!
//! One channel per inspected tab. Messages on a channel arrive in the order
//! they were posted; there is no flow control.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `router` | Channel factory, ports and listener |

// ============================================================================
// Submodules
// ============================================================================

/// Named per-tab duplex channels.
pub mod router;

// ============================================================================
// Re-exports
// ============================================================================

pub use router::{
    CapturePort, CaptureReceiver, CaptureSender, EventRouter, PanelPort, PanelReceiver,
    PanelSender, Port, PortListener, PortReceiver, PortSender,
};
