//! Check-in session state machine
//!
//! Idle → Identified → Detailing → Active → Idle, with cancel edges from
//! Identified/Detailing. At most one session exists per kiosk; a second
//! identification is rejected, not queued. The active-session display is
//! recomputed from wall clock every tick, never incremented.

use crate::checkin::log::{AttendanceLog, AttendanceRecord};
use crate::error::{Error, Result};
use crate::state::Notifier;
use acmp_common::events::{KioskEvent, SessionPhase, Severity};
use acmp_common::member::{Member, DEFAULT_FIELD};
use acmp_common::time::{format_elapsed, format_minutes};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Interval of the elapsed-display tick while a session is active
const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// In-memory check-in aggregate, mutated through the workflow states
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckinSession {
    pub member_id: String,
    pub name: String,
    pub temporary: bool,
    pub check_in_time: DateTime<Local>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Local>>,
}

struct SessionInner {
    phase: SessionPhase,
    session: Option<CheckinSession>,
}

/// The check-in workflow state machine.
///
/// One instance per kiosk; closed sessions are handed to the
/// [`AttendanceLog`], never written by this type directly.
pub struct SessionManager {
    log: Arc<AttendanceLog>,
    notifier: Arc<dyn Notifier>,
    events: broadcast::Sender<KioskEvent>,
    /// Shared with the tick task, which re-reads the start time every tick
    inner: Arc<RwLock<SessionInner>>,
    /// Cancellation for the running duration tick (None while no session
    /// is active)
    tick_token: Mutex<Option<CancellationToken>>,
}

impl SessionManager {
    pub fn new(
        log: Arc<AttendanceLog>,
        notifier: Arc<dyn Notifier>,
        events: broadcast::Sender<KioskEvent>,
    ) -> Self {
        Self {
            log,
            notifier,
            events,
            inner: Arc::new(RwLock::new(SessionInner {
                phase: SessionPhase::Idle,
                session: None,
            })),
            tick_token: Mutex::new(None),
        }
    }

    /// Current phase
    pub async fn phase(&self) -> SessionPhase {
        self.inner.read().await.phase
    }

    /// Whether a visit is officially running
    pub async fn is_active(&self) -> bool {
        self.inner.read().await.phase == SessionPhase::Active
    }

    /// Current phase + session snapshot for the API layer
    pub async fn snapshot(&self) -> (SessionPhase, Option<CheckinSession>) {
        let inner = self.inner.read().await;
        (inner.phase, inner.session.clone())
    }

    /// Record the identified member and open a check-in.
    ///
    /// Valid only from Idle: a second identification while a session exists
    /// is rejected, not queued.
    pub async fn identify(&self, member: &Member) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner.phase != SessionPhase::Idle {
            warn!("Identify rejected, session already in progress");
            self.notifier.notify(
                "Un enregistrement est déjà en cours. Terminez-le d'abord.",
                Severity::Warning,
            );
            return Err(Error::InvalidState(format!(
                "cannot identify while {}",
                inner.phase
            )));
        }

        let session = CheckinSession {
            member_id: member.registration_number.clone(),
            name: member.full_name(),
            temporary: member.is_temporary,
            check_in_time: Local::now(),
            purpose: None,
            topic: None,
            id: None,
            start_time: None,
        };

        info!("Member {} identified for check-in", session.member_id);
        inner.phase = SessionPhase::Identified;
        inner.session = Some(session.clone());
        drop(inner);

        let _ = self.events.send(KioskEvent::MemberIdentified {
            registration_number: session.member_id,
            name: session.name,
            temporary: session.temporary,
            timestamp: chrono::Utc::now(),
        });
        Ok(())
    }

    /// Present the purpose/topic capture step
    pub async fn start_details(&self) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner.phase != SessionPhase::Identified {
            return Err(Error::InvalidState(format!(
                "cannot open details while {}",
                inner.phase
            )));
        }
        inner.phase = SessionPhase::Detailing;
        Ok(())
    }

    /// Withdraw the capture step and discard the session
    pub async fn cancel_details(&self) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner.phase != SessionPhase::Detailing {
            return Err(Error::InvalidState(format!(
                "no details step open while {}",
                inner.phase
            )));
        }
        debug!("Details step cancelled, discarding session");
        inner.phase = SessionPhase::Idle;
        inner.session = None;
        drop(inner);

        let _ = self.events.send(KioskEvent::SessionCancelled {
            timestamp: chrono::Utc::now(),
        });
        Ok(())
    }

    /// Officially begin the visit.
    ///
    /// Requires a non-empty purpose (inline warning, no transition
    /// otherwise); an empty topic defaults. Assigns the session id, stamps
    /// the start time, and starts the 1s duration tick.
    pub async fn begin(&self, purpose: &str, topic: &str) -> Result<Uuid> {
        let mut inner = self.inner.write().await;
        if !matches!(
            inner.phase,
            SessionPhase::Identified | SessionPhase::Detailing
        ) {
            return Err(Error::InvalidState(format!(
                "cannot begin a visit while {}",
                inner.phase
            )));
        }

        let purpose = purpose.trim();
        if purpose.is_empty() {
            self.notifier
                .notify("Veuillez indiquer le motif de la visite.", Severity::Warning);
            return Err(Error::InvalidInput("empty purpose".to_string()));
        }

        let topic = match topic.trim() {
            "" => DEFAULT_FIELD.to_string(),
            t => t.to_string(),
        };

        let id = Uuid::new_v4();
        let start_time = Local::now();
        let session = inner
            .session
            .as_mut()
            .ok_or_else(|| Error::Internal("identified without session".to_string()))?;
        session.purpose = Some(purpose.to_string());
        session.topic = Some(topic);
        session.id = Some(id);
        session.start_time = Some(start_time);
        inner.phase = SessionPhase::Active;
        drop(inner);

        info!("Session {id} started");
        let _ = self.events.send(KioskEvent::SessionStarted {
            session_id: id,
            purpose: purpose.to_string(),
            timestamp: chrono::Utc::now(),
        });
        self.spawn_tick(id);
        Ok(id)
    }

    /// Discard the in-memory session before it started
    pub async fn cancel(&self) -> Result<()> {
        let mut inner = self.inner.write().await;
        if !matches!(
            inner.phase,
            SessionPhase::Identified | SessionPhase::Detailing
        ) {
            return Err(Error::InvalidState(format!(
                "nothing to cancel while {}",
                inner.phase
            )));
        }
        debug!("Check-in cancelled before start");
        inner.phase = SessionPhase::Idle;
        inner.session = None;
        drop(inner);

        let _ = self.events.send(KioskEvent::SessionCancelled {
            timestamp: chrono::Utc::now(),
        });
        Ok(())
    }

    /// Close the active session and hand the record to the attendance log.
    ///
    /// Destructive: callers surface the operator confirmation dialog before
    /// invoking this. Valid only from Active.
    pub async fn end(&self) -> Result<AttendanceRecord> {
        let mut inner = self.inner.write().await;
        if inner.phase != SessionPhase::Active {
            return Err(Error::InvalidState(format!(
                "no active session while {}",
                inner.phase
            )));
        }

        self.stop_tick();

        let session = inner
            .session
            .take()
            .ok_or_else(|| Error::Internal("active without session".to_string()))?;
        inner.phase = SessionPhase::Idle;
        drop(inner);

        let start_time = session
            .start_time
            .ok_or_else(|| Error::Internal("active without start time".to_string()))?;
        let id = session
            .id
            .ok_or_else(|| Error::Internal("active without id".to_string()))?;
        let end_time = Local::now();
        let duration = format_minutes((end_time - start_time).num_minutes());

        let record = AttendanceRecord {
            id,
            member_id: session.member_id,
            name: session.name,
            temporary: session.temporary,
            check_in_time: session.check_in_time,
            purpose: session.purpose.unwrap_or_default(),
            topic: session.topic.unwrap_or_else(|| DEFAULT_FIELD.to_string()),
            start_time,
            end_time,
            duration: duration.clone(),
        };

        self.log.append(record.clone()).await?;
        info!("Session {id} closed after {duration}");

        let _ = self.events.send(KioskEvent::SessionClosed {
            session_id: id,
            duration: duration.clone(),
            timestamp: chrono::Utc::now(),
        });
        self.notifier
            .notify(&format!("Visite enregistrée ({duration})."), Severity::Success);
        Ok(record)
    }

    /// Stop the duration tick and drop any open session. Invoked on kiosk
    /// teardown; an Active session is left unrecorded by design (it never
    /// officially ended).
    pub async fn cleanup(&self) {
        self.stop_tick();
        let mut inner = self.inner.write().await;
        if inner.phase != SessionPhase::Idle {
            debug!("Discarding {} session on teardown", inner.phase);
            inner.phase = SessionPhase::Idle;
            inner.session = None;
        }
    }

    fn stop_tick(&self) {
        if let Some(token) = self.tick_token.lock().unwrap().take() {
            token.cancel();
        }
    }

    /// Recompute and publish the elapsed display every second until the
    /// session closes. Always derived from `now − start_time`, so missed
    /// ticks never desynchronize the displayed value.
    fn spawn_tick(&self, session_id: Uuid) {
        self.stop_tick();
        let token = CancellationToken::new();
        *self.tick_token.lock().unwrap() = Some(token.clone());

        let events = self.events.clone();
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(TICK_INTERVAL);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {
                        let start_time = inner
                            .read()
                            .await
                            .session
                            .as_ref()
                            .and_then(|s| s.start_time);
                        let Some(start_time) = start_time else {
                            // Session is gone; the tick dies with it
                            break;
                        };
                        let elapsed = (Local::now() - start_time).num_seconds();
                        let _ = events.send(KioskEvent::SessionTick {
                            session_id,
                            elapsed_seconds: elapsed,
                            display: format_elapsed(elapsed),
                            timestamp: chrono::Utc::now(),
                        });
                    }
                }
            }
        });
    }

    /// Shift the running session's clocks into the past (test hook for
    /// duration computation).
    #[cfg(test)]
    pub async fn backdate_start(&self, seconds: i64) {
        let mut inner = self.inner.write().await;
        if let Some(session) = inner.session.as_mut() {
            let delta = chrono::Duration::seconds(seconds);
            session.check_in_time -= delta;
            if let Some(start) = session.start_time.as_mut() {
                *start -= delta;
            }
        }
    }
}
