//! Relay Lens - passive capture of Nostr relay traffic for browser devtools.
//!
//! This library watches the WebSocket traffic of an inspected browser tab
//! through the host's debugging API, keeps the frames that speak the
//! array-framed relay protocol, attributes each one to the relay it
//! travelled over and republishes them as a live, queryable event log.
//!
//! # Architecture
//!
//! The pipeline is split in two sides that only talk through a per-tab
//! channel:
//!
//! - **Capture side**: attaches the host debugger, tracks WebSocket
//!   handshakes, classifies frames and forwards them
//! - **Presentation side**: requests attach/detach, stores frames and
//!   derives statistics
//!
//! Key design principles:
//!
//! - Each tab has an explicit attach state machine; frames flow only while
//!   it is `Attached`
//! - Capture never initiates or modifies a connection
//! - Anything that is not a relay frame is dropped silently
//! - Host failures become status messages, never errors on the channel
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use relay_lens::{
//!     CaptureService, Config, DebuggerHost, EventRouter, EventStore, Panel, Result, TabId,
//! };
//!
//! async fn inspect(host: Arc<dyn DebuggerHost>) -> Result<()> {
//!     let (router, listener) = EventRouter::bind();
//!     let service = CaptureService::new(host, Config::new())?;
//!     tokio::spawn(Arc::clone(&service).serve(listener));
//!
//!     let store = Arc::new(EventStore::new());
//!     let (panel, receiver) = Panel::connect(&router, TabId::new(7), Arc::clone(&store))?;
//!     panel.request_attach()?;
//!
//!     // Host notifications go to `service.handle_host_notification(..)`.
//!     panel.run(receiver).await;
//!     println!("{:?}", store.stats());
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`capture`] | Sessions, connection registry, classifier, [`CaptureService`] |
//! | [`config`] | [`Config`] and defaults |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers and channel names |
//! | [`panel`] | Presentation-side controller |
//! | [`protocol`] | Host events, relay frames, channel messages |
//! | [`store`] | [`EventStore`] and aggregates |
//! | [`transport`] | Per-tab duplex channels |

// ============================================================================
// Modules
// ============================================================================

/// Capture side: sessions, connection tracking, classification.
///
/// - [`CaptureService`] - Dispatches host and channel events
/// - [`SessionRegistry`] - Per-tab attach state machine
/// - [`ConnectionRegistry`] - Request id to relay URL map
pub mod capture;

/// Pipeline configuration.
pub mod config;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers.
///
/// Newtype wrappers prevent mixing incompatible IDs at compile time.
pub mod identifiers;

/// Presentation-side channel controller.
pub mod panel;

/// Protocol message types.
pub mod protocol;

/// Event log, aggregates and subscribers.
pub mod store;

/// Channel transport between the two sides.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Capture types
pub use capture::{
    AttachState, CaptureService, ConnectionRegistry, DebuggerHost, FrameClassifier,
    SessionRegistry, classify,
};

// Configuration
pub use config::Config;

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{ChannelName, RequestId, SubscriptionId, TabId};

// Presentation types
pub use panel::Panel;
pub use store::{DirectionCounts, EventStore, Stats};

// Protocol types
pub use protocol::{
    CaptureMessage, ClassifiedFrame, Direction, HostEvent, HostNotification, MessageType,
    PanelMessage, kind_label, kind_name,
};

// Transport types
pub use transport::{EventRouter, PanelPort, PortListener};
