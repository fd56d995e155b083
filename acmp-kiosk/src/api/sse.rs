//! Server-Sent Events (SSE) broadcaster
//!
//! Streams kiosk events (notifications, scanner transitions, session ticks)
//! to the connected front-end.

use crate::api::AppContext;
use acmp_common::events::KioskEvent;
use axum::{
    extract::State,
    response::sse::{Event, Sse},
};
use futures::stream::{Stream, StreamExt};
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, warn};

/// GET /events - SSE event stream
pub async fn event_stream(
    State(ctx): State<AppContext>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    debug!("New SSE client connected");

    // Subscribe to event broadcast
    let rx = ctx.kiosk.state().subscribe_events();

    // Convert broadcast receiver to stream
    let stream = BroadcastStream::new(rx).filter_map(|result| async move {
        match result {
            Ok(event) => match serde_json::to_string(&event) {
                Ok(json) => Some(Ok(Event::default()
                    .event(event_type_str(&event))
                    .data(json))),
                Err(e) => {
                    warn!("Failed to serialize event: {}", e);
                    None
                }
            },
            Err(e) => {
                // BroadcastStream error (lagged or closed)
                warn!("SSE stream error: {:?}", e);
                None
            }
        }
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Extract event type string from KioskEvent
fn event_type_str(event: &KioskEvent) -> &'static str {
    match event {
        KioskEvent::Notification { .. } => "Notification",
        KioskEvent::ScannerStateChanged { .. } => "ScannerStateChanged",
        KioskEvent::ManualEntryOffered { .. } => "ManualEntryOffered",
        KioskEvent::MemberIdentified { .. } => "MemberIdentified",
        KioskEvent::SessionStarted { .. } => "SessionStarted",
        KioskEvent::SessionTick { .. } => "SessionTick",
        KioskEvent::SessionClosed { .. } => "SessionClosed",
        KioskEvent::SessionCancelled { .. } => "SessionCancelled",
    }
}
