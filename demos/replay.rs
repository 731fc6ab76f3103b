//! Replays a short relay session through the whole pipeline.
//!
//! Usage:
//!   cargo run --example replay
//!   cargo run --example replay -- --debug

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::info;
use tracing_subscriber::EnvFilter;

use relay_lens::{
    CaptureMessage, CaptureService, Config, DebuggerHost, EventRouter, EventStore, HostEvent,
    HostNotification, Panel, Result, TabId, kind_label,
};

// ============================================================================
// Constants
// ============================================================================

const TAB: TabId = TabId::new(1);

// ============================================================================
// Host
// ============================================================================

/// Host that accepts every call and logs it.
struct ReplayHost;

#[async_trait]
impl DebuggerHost for ReplayHost {
    async fn attach(&self, tab_id: TabId, protocol_version: &str) -> Result<()> {
        info!(%tab_id, protocol_version, "Host attach");
        Ok(())
    }

    async fn enable_network(&self, tab_id: TabId) -> Result<()> {
        info!(%tab_id, "Host network enabled");
        Ok(())
    }

    async fn detach(&self, tab_id: TabId) -> Result<()> {
        info!(%tab_id, "Host detach");
        Ok(())
    }
}

// ============================================================================
// Script
// ============================================================================

fn event(method: &str, params: Value) -> HostNotification {
    HostNotification::Event {
        tab_id: TAB,
        event: HostEvent::new(method, params),
    }
}

fn frame(sent: bool, request_id: &str, timestamp: f64, payload: Value) -> HostNotification {
    let method = if sent {
        "Network.webSocketFrameSent"
    } else {
        "Network.webSocketFrameReceived"
    };
    event(
        method,
        json!({
            "requestId": request_id,
            "timestamp": timestamp,
            "response": { "opcode": 1, "payloadData": payload.to_string() }
        }),
    )
}

fn script() -> Vec<HostNotification> {
    vec![
        event(
            "Network.webSocketWillSendHandshakeRequest",
            json!({ "requestId": "10.1", "request": { "url": "wss://relay.damus.io/" } }),
        ),
        event(
            "Network.webSocketCreated",
            json!({ "requestId": "10.2", "url": "wss://nos.lol" }),
        ),
        frame(true, "10.1", 1.0, json!(["REQ", "feed", {"kinds": [1, 6], "limit": 20}])),
        frame(true, "10.2", 1.1, json!(["REQ", "meta", {"kinds": [0], "authors": ["abc"]}])),
        frame(false, "10.1", 1.4, json!(["EVENT", "feed", {"kind": 1, "pubkey": "abc", "content": "gm"}])),
        frame(false, "10.1", 1.5, json!(["EVENT", "feed", {"kind": 6, "pubkey": "def", "content": ""}])),
        frame(false, "10.2", 1.6, json!(["EVENT", "meta", {"kind": 0, "pubkey": "abc", "content": "{}"}])),
        frame(false, "10.1", 1.7, json!(["EOSE", "feed"])),
        frame(false, "10.2", 1.8, json!(["EOSE", "meta"])),
        frame(true, "10.2", 2.0, json!(["CLOSE", "meta"])),
        frame(false, "10.1", 2.2, json!(["NOTICE", "rate limited"])),
        frame(false, "10.1", 2.3, json!({"not": "a relay frame"})),
    ]
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let debug = std::env::args().any(|a| a == "--debug");
    let filter = if debug {
        "relay_lens=trace,replay=debug"
    } else {
        "relay_lens=info,replay=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();

    let (router, listener) = EventRouter::bind();
    let service = CaptureService::new(Arc::new(ReplayHost), Config::new())?;
    tokio::spawn(Arc::clone(&service).serve(listener));

    let store = Arc::new(EventStore::new());
    let (panel, mut receiver) = Panel::connect(&router, TAB, Arc::clone(&store))?;

    panel.request_attach()?;
    if let Some(status) = receiver.recv().await {
        panel.handle_message(status);
    }
    info!(inspecting = panel.is_inspecting(), "Attach confirmed");

    for notification in script() {
        service.handle_host_notification(notification);
    }

    panel.request_detach()?;
    while let Some(message) = receiver.recv().await {
        let detached = matches!(message, CaptureMessage::Status { attached: false, .. });
        panel.handle_message(message);
        if detached {
            break;
        }
    }

    for frame in store.recent_events(store.recent_limit()) {
        let kind = frame.display_kind().map(kind_label).unwrap_or_default();
        println!(
            "{:>4}  {:<6} {:<16} {:<20} {:<20} {}",
            frame.direction(),
            frame.tag(),
            frame.relay(),
            kind,
            frame.short_pubkey().unwrap_or_default(),
            frame.preview(false)?
        );
    }

    let stats = store.stats();
    println!();
    println!("{}", serde_json::to_string_pretty(&stats)?);
    println!("pubkeys: {:?}", store.unique_pubkeys());

    Ok(())
}
