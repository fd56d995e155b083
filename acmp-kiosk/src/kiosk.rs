//! Kiosk orchestrator
//!
//! Owns the registry, scanner, session manager and attendance log, and
//! bridges decoded scanner text into member resolution. Exactly one
//! CheckinKiosk is constructed per process (in `main`); the single-session
//! and single-scanner invariants follow from that ownership.

use crate::checkin::{AttendanceLog, SessionManager};
use crate::error::{Error, Result};
use crate::registry::MemberRegistry;
use crate::scanner::{CameraBackend, DecodeOutcome, DecodeSink, FeedCamera, ScannerController};
use crate::state::{KioskState, Notifier};
use acmp_common::events::Severity;
use acmp_common::member::{Member, ScanPayload};
use futures::future::BoxFuture;
use sqlx::{Pool, Sqlite};
use std::sync::Arc;
use tracing::{info, warn};

/// Bridges decoded QR text into member resolution and identification
struct ScanResolver {
    registry: Arc<MemberRegistry>,
    session: Arc<SessionManager>,
    notifier: Arc<dyn Notifier>,
}

impl DecodeSink for ScanResolver {
    fn on_decoded(&self, text: String) -> BoxFuture<'static, DecodeOutcome> {
        let registry = Arc::clone(&self.registry);
        let session = Arc::clone(&self.session);
        let notifier = Arc::clone(&self.notifier);

        Box::pin(async move {
            let identifier = ScanPayload::identifier(&text);
            match registry.resolve(&identifier).await {
                Ok(member) => {
                    // A rejected identification (session already open) is not
                    // a lookup failure; no rescan cycle is owed for it.
                    let _ = session.identify(&member).await;
                    DecodeOutcome::Identified
                }
                Err(e) => {
                    warn!("Scanned member lookup failed: {e}");
                    notifier.notify(
                        "Adhérent introuvable. Nouvelle lecture dans quelques secondes…",
                        Severity::Warning,
                    );
                    DecodeOutcome::LookupFailed
                }
            }
        })
    }
}

/// The assembled kiosk.
///
/// All components are explicit owned objects injected here; nothing is
/// module-scope global.
pub struct CheckinKiosk {
    state: Arc<KioskState>,
    registry: Arc<MemberRegistry>,
    scanner: Arc<ScannerController>,
    session: Arc<SessionManager>,
    log: Arc<AttendanceLog>,
    camera: Arc<FeedCamera>,
}

impl CheckinKiosk {
    /// Assemble the kiosk components over an open database.
    pub async fn new(
        state: Arc<KioskState>,
        db: Pool<Sqlite>,
        registry_url: String,
    ) -> Result<Arc<Self>> {
        let notifier: Arc<dyn Notifier> = Arc::clone(&state) as Arc<dyn Notifier>;

        let registry = Arc::new(MemberRegistry::new(registry_url, Arc::clone(&notifier))?);
        let log = Arc::new(AttendanceLog::open(db).await?);
        let session = Arc::new(SessionManager::new(
            Arc::clone(&log),
            Arc::clone(&notifier),
            state.event_tx.clone(),
        ));

        let camera = Arc::new(FeedCamera::with_default_cameras());
        let resolver = Arc::new(ScanResolver {
            registry: Arc::clone(&registry),
            session: Arc::clone(&session),
            notifier: Arc::clone(&notifier),
        });
        let scanner = Arc::new(ScannerController::new(
            Arc::clone(&camera) as Arc<dyn CameraBackend>,
            resolver,
            notifier,
            state.event_tx.clone(),
        ));

        Ok(Arc::new(Self {
            state,
            registry,
            scanner,
            session,
            log,
            camera,
        }))
    }

    /// Initial member load; always yields a usable (possibly demo) set
    pub async fn startup(&self) {
        let members = self.registry.load().await;
        info!("Kiosk ready with {} members", members.len());
    }

    /// Manual-entry fallback: same resolution path as a scan
    pub async fn manual_checkin(&self, identifier: &str) -> Result<Member> {
        if identifier.trim().is_empty() {
            self.state
                .notify("Veuillez saisir un numéro d'adhérent.", Severity::Warning);
            return Err(Error::InvalidInput("empty identifier".to_string()));
        }
        let member = self.registry.resolve(identifier).await?;
        self.session.identify(&member).await?;
        Ok(member)
    }

    /// Release the camera and stop all recurring work. Must run on
    /// shutdown/navigation teardown, even mid-scan.
    pub async fn cleanup(&self) {
        self.scanner.cleanup().await;
        self.session.cleanup().await;
        info!("Kiosk cleaned up");
    }

    pub fn state(&self) -> &Arc<KioskState> {
        &self.state
    }

    pub fn registry(&self) -> &Arc<MemberRegistry> {
        &self.registry
    }

    pub fn scanner(&self) -> &Arc<ScannerController> {
        &self.scanner
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    pub fn attendance_log(&self) -> &Arc<AttendanceLog> {
        &self.log
    }

    /// The frame feed the collaborator capture layer pushes decoded text into
    pub fn camera(&self) -> &Arc<FeedCamera> {
        &self.camera
    }
}
