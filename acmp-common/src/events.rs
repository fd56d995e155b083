//! Event types for the kiosk event system
//!
//! Events are published on a broadcast channel and streamed to the kiosk
//! front-end over SSE. The core only publishes; rendering is the
//! collaborator's concern.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Severity of a transient status notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Success => write!(f, "success"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// Camera scanner lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScannerState {
    Stopped,
    Starting,
    Active,
    Error,
}

impl std::fmt::Display for ScannerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScannerState::Stopped => write!(f, "stopped"),
            ScannerState::Starting => write!(f, "starting"),
            ScannerState::Active => write!(f, "active"),
            ScannerState::Error => write!(f, "error"),
        }
    }
}

/// Check-in workflow phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    Idle,
    Identified,
    Detailing,
    Active,
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionPhase::Idle => write!(f, "idle"),
            SessionPhase::Identified => write!(f, "identified"),
            SessionPhase::Detailing => write!(f, "detailing"),
            SessionPhase::Active => write!(f, "active"),
        }
    }
}

/// Kiosk event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum KioskEvent {
    /// Transient status message for the collaborator UI
    Notification {
        message: String,
        severity: Severity,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Scanner lifecycle transition
    ScannerStateChanged {
        state: ScannerState,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Manual-entry fallback offered after a camera failure
    ManualEntryOffered {
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A member was identified (scan or manual entry)
    MemberIdentified {
        registration_number: String,
        name: String,
        temporary: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A visit session officially began
    SessionStarted {
        session_id: Uuid,
        purpose: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Elapsed-time update (sent every 1s while a session is active)
    SessionTick {
        session_id: Uuid,
        elapsed_seconds: i64,
        display: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A session was closed and recorded
    SessionClosed {
        session_id: Uuid,
        duration: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// An in-progress check-in was discarded before starting
    SessionCancelled {
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}
