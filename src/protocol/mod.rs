//! Protocol types.
//!
//! This module defines the three vocabularies the pipeline speaks:
//!
//! | Vocabulary | Between | Module |
//! |------------|---------|--------|
//! | Host events | Host debugger → capture side | `event` |
//! | Relay frames | Page ↔ relay (observed) | `frame` |
//! | Channel messages | Capture side ↔ presentation side | `message` |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `event` | Host debugger events and notifications |
//! | `frame` | Message tags, directions, classified frames |
//! | `kinds` | Names of well-known event kinds |
//! | `message` | Status / frame / attach / detach messages |

// ============================================================================
// Submodules
// ============================================================================

/// Host debugger events.
pub mod event;

/// Relay frame types.
pub mod frame;

/// Event kind names.
pub mod kinds;

/// Channel message types.
pub mod message;

// ============================================================================
// Re-exports
// ============================================================================

pub use event::{HostEvent, HostNotification, ParsedHostEvent};
pub use frame::{ClassifiedFrame, Direction, MessageType};
pub use kinds::{kind_label, kind_name};
pub use message::{CaptureMessage, PanelMessage};
