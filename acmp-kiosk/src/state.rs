//! Shared kiosk state
//!
//! Event broadcast channel shared by all components, plus the collaborator
//! notification surface. Components publish; the SSE route and tests
//! subscribe. Rendering is never done here.

use acmp_common::events::{KioskEvent, Severity};
use tokio::sync::broadcast;
use tracing::{info, warn};

/// Collaborator callback surface for transient status messages.
///
/// The core only calls this; it owns no rendering. The shipped implementation
/// republishes onto the kiosk event bus for the front-end to display.
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str, severity: Severity);
}

/// Shared state accessible by all components
pub struct KioskState {
    /// Event broadcaster for SSE events
    pub event_tx: broadcast::Sender<KioskEvent>,
}

impl KioskState {
    /// Create new shared state
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(100); // Buffer up to 100 events
        Self { event_tx }
    }

    /// Broadcast an event to all SSE listeners
    pub fn broadcast_event(&self, event: KioskEvent) {
        // Ignore send errors (no receivers is OK)
        let _ = self.event_tx.send(event);
    }

    /// Subscribe to event stream for SSE
    pub fn subscribe_events(&self) -> broadcast::Receiver<KioskEvent> {
        self.event_tx.subscribe()
    }
}

impl Default for KioskState {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for KioskState {
    fn notify(&self, message: &str, severity: Severity) {
        match severity {
            Severity::Warning | Severity::Error => warn!("notify [{severity}]: {message}"),
            _ => info!("notify [{severity}]: {message}"),
        }
        self.broadcast_event(KioskEvent::Notification {
            message: message.to_string(),
            severity,
            timestamp: chrono::Utc::now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_notify_broadcasts_event() {
        let state = KioskState::new();
        let mut rx = state.subscribe_events();

        state.notify("Mode démonstration activé", Severity::Warning);

        match rx.recv().await.unwrap() {
            KioskEvent::Notification { message, severity, .. } => {
                assert_eq!(message, "Mode démonstration activé");
                assert_eq!(severity, Severity::Warning);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_broadcast_without_receivers_is_ok() {
        let state = KioskState::new();
        state.broadcast_event(KioskEvent::SessionCancelled {
            timestamp: chrono::Utc::now(),
        });
    }
}
