//! Capture side of the pipeline.
//!
//! Turns the host debugger's network events for inspected tabs into
//! classified relay frames, one channel per tab.
//!
//! # Flow
//!
//! ```text
//! HostNotification ──► CaptureService ──► session Attached? ──no──► drop
//!                                              │ yes
//!                    handshake / created ◄─────┴─────► frame
//!                            │                           │
//!                            ▼                           ▼
//!                   ConnectionRegistry ─ resolve ─► FrameClassifier
//!                                                        │
//!                                                        ▼
//!                                              CaptureSender (per tab)
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `classifier` | Relay frame shape check and relay attribution |
//! | `host` | [`DebuggerHost`] trait |
//! | `registry` | Request id to relay URL map |
//! | `service` | [`CaptureService`], dispatch of host and channel events |
//! | `session` | Per-tab attach state machine |

// ============================================================================
// Submodules
// ============================================================================

/// Relay frame classification.
pub mod classifier;

/// Host debugger seam.
pub mod host;

/// WebSocket connection registry.
pub mod registry;

/// Capture service.
pub mod service;

/// Per-tab sessions.
pub mod session;

// ============================================================================
// Re-exports
// ============================================================================

pub use classifier::{FrameClassifier, RelayFrame, classify, relay_hostname};
pub use host::DebuggerHost;
pub use registry::ConnectionRegistry;
pub use service::CaptureService;
pub use session::{AttachState, HostAction, SessionEvent, SessionRegistry, Transition};
