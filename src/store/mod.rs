//! Presentation-side event store.
//!
//! Frames arriving from the capture side are appended to an [`EventStore`],
//! which keeps the full log, maintains aggregates incrementally and tells
//! subscribers about every change.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `event_store` | Log, pause flag, queries, subscribers |
//! | `stats` | Incremental aggregates and summary counters |

// ============================================================================
// Submodules
// ============================================================================

/// Event log and subscribers.
pub mod event_store;

/// Aggregates and summary counters.
pub mod stats;

// ============================================================================
// Re-exports
// ============================================================================

pub use event_store::{EventStore, Listener};
pub use stats::{DirectionCounts, Stats};
