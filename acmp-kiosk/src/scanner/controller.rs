//! Scanner lifecycle controller
//!
//! State machine over camera acquisition: Stopped → Starting → Active →
//! Stopped, with failures passing through Error and settling back in
//! Stopped. Decoding follows the scan-once policy: the controller stops
//! itself after the first successful decode so one physical badge can never
//! check in twice.

use crate::scanner::backend::{
    select_camera, CameraBackend, CameraError, CameraHandle, FrameRead,
};
use crate::state::Notifier;
use acmp_common::events::{KioskEvent, ScannerState, Severity};
use futures::future::BoxFuture;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

/// Cosmetic UI-feedback pause around decode start/success
const SCAN_FEEDBACK_PAUSE: Duration = Duration::from_millis(300);

/// Delay before the scanner restarts itself after a failed member lookup
const LOOKUP_RETRY_DELAY: Duration = Duration::from_secs(3);

/// Consecutive failed-lookup restart cycles before giving up
const MAX_LOOKUP_RETRIES: u8 = 3;

/// Delay before the manual-entry fallback offer after a camera failure
const MANUAL_ENTRY_PROMPT_DELAY: Duration = Duration::from_secs(2);

/// What the consumer did with decoded text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeOutcome {
    /// A member was identified; the check-in flow continues elsewhere
    Identified,
    /// Lookup failed; the scanner schedules a bounded auto-restart
    LookupFailed,
}

/// Consumer of decoded QR text.
///
/// The controller is independent of what is done with the text; the kiosk
/// orchestrator implements this to bridge into member resolution.
pub trait DecodeSink: Send + Sync {
    fn on_decoded(&self, text: String) -> BoxFuture<'static, DecodeOutcome>;
}

/// Camera scanner lifecycle controller.
///
/// One instance per kiosk. All failure paths resolve back to `Stopped`;
/// `cleanup()` must run on kiosk teardown so the camera stream is released
/// even when the workflow is abandoned mid-scan.
pub struct ScannerController {
    backend: Arc<dyn CameraBackend>,
    sink: Arc<dyn DecodeSink>,
    notifier: Arc<dyn Notifier>,
    events: broadcast::Sender<KioskEvent>,
    state: RwLock<ScannerState>,
    last_error: RwLock<Option<CameraError>>,
    /// Cancellation for the running decode loop (None while stopped)
    loop_token: Mutex<Option<CancellationToken>>,
    /// Root token for deferred retry/prompt tasks, cancelled on cleanup
    shutdown: CancellationToken,
    retries_remaining: AtomicU8,
}

impl ScannerController {
    pub fn new(
        backend: Arc<dyn CameraBackend>,
        sink: Arc<dyn DecodeSink>,
        notifier: Arc<dyn Notifier>,
        events: broadcast::Sender<KioskEvent>,
    ) -> Self {
        Self {
            backend,
            sink,
            notifier,
            events,
            state: RwLock::new(ScannerState::Stopped),
            last_error: RwLock::new(None),
            loop_token: Mutex::new(None),
            shutdown: CancellationToken::new(),
            retries_remaining: AtomicU8::new(MAX_LOOKUP_RETRIES),
        }
    }

    /// Current lifecycle state
    pub async fn state(&self) -> ScannerState {
        *self.state.read().await
    }

    /// Acquisition failure retained from the most recent start attempt
    pub async fn last_error(&self) -> Option<CameraError> {
        self.last_error.read().await.clone()
    }

    /// Start the camera and arm the decode loop.
    ///
    /// No-op when already Starting/Active (double-acquisition guard). Any
    /// prior device handle is torn down first, so restart is idempotent.
    /// Failures notify the operator, settle the state machine in `Stopped`,
    /// and are also returned for the API layer.
    pub async fn start(self: &Arc<Self>) -> Result<(), CameraError> {
        {
            // Check-and-transition under one lock: concurrent starts must
            // never race into a double acquisition
            let mut state = self.state.write().await;
            if matches!(*state, ScannerState::Starting | ScannerState::Active) {
                debug!("Scanner start ignored, already {}", *state);
                return Ok(());
            }
            *state = ScannerState::Starting;
        }
        self.broadcast_state(ScannerState::Starting);

        // Tear down any prior device handle before re-acquiring
        self.cancel_decode_loop();
        *self.last_error.write().await = None;

        match self.acquire().await {
            Ok(handle) => {
                info!("Camera stream open on '{}'", handle.camera.label);
                self.set_state(ScannerState::Active).await;
                self.spawn_decode_loop(handle);
                Ok(())
            }
            Err(kind) => {
                self.fail(kind.clone()).await;
                Err(kind)
            }
        }
    }

    /// Enumerate, select, probe permission, open. Permission is probed
    /// explicitly before the stream starts so permission failures are
    /// distinguished from device failures.
    async fn acquire(&self) -> Result<CameraHandle, CameraError> {
        let cameras = self.backend.list_cameras()?;
        let camera = select_camera(&cameras).ok_or(CameraError::NoCameraFound)?;
        debug!("Selected camera '{}'", camera.label);

        self.backend.probe_permission(camera)?;
        self.backend.open(camera)
    }

    /// Stop the camera and decode loop.
    ///
    /// Tolerant of being called when already stopped; teardown is
    /// best-effort and always ends in `Stopped`.
    pub async fn stop(&self) {
        self.cancel_decode_loop();
        let previous = {
            let mut state = self.state.write().await;
            let previous = *state;
            *state = ScannerState::Stopped;
            previous
        };
        if previous != ScannerState::Stopped {
            debug!("Scanner stopped (was {previous})");
            self.broadcast_state(ScannerState::Stopped);
        }
    }

    /// Release the camera and abort all pending retry/prompt tasks.
    ///
    /// Must be invoked on kiosk teardown so the stream is released even if
    /// the workflow was abandoned mid-scan.
    pub async fn cleanup(&self) {
        self.shutdown.cancel();
        self.stop().await;
    }

    fn cancel_decode_loop(&self) {
        if let Some(token) = self.loop_token.lock().unwrap().take() {
            token.cancel();
        }
    }

    async fn set_state(&self, next: ScannerState) {
        let changed = {
            let mut state = self.state.write().await;
            let changed = *state != next;
            *state = next;
            changed
        };
        if changed {
            self.broadcast_state(next);
        }
    }

    fn broadcast_state(&self, state: ScannerState) {
        let _ = self.events.send(KioskEvent::ScannerStateChanged {
            state,
            timestamp: chrono::Utc::now(),
        });
    }

    /// Acquisition failure path: Error → Stopped, operator notification,
    /// manual-entry offer for the kinds that warrant one.
    async fn fail(self: &Arc<Self>, kind: CameraError) {
        warn!("Camera acquisition failed: {kind}");
        self.set_state(ScannerState::Error).await;
        *self.last_error.write().await = Some(kind.clone());
        self.notifier.notify(&kind.user_message(), Severity::Error);
        if kind.offers_manual_entry() {
            self.schedule_manual_entry_offer();
        }
        self.set_state(ScannerState::Stopped).await;
    }

    /// Offer manual entry once, after a short delay, unless torn down first
    fn schedule_manual_entry_offer(self: &Arc<Self>) {
        let controller = Arc::clone(self);
        let token = self.shutdown.child_token();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(MANUAL_ENTRY_PROMPT_DELAY) => {
                    let _ = controller.events.send(KioskEvent::ManualEntryOffered {
                        timestamp: chrono::Utc::now(),
                    });
                    controller.notifier.notify(
                        "Vous pouvez saisir le numéro d'adhérent manuellement.",
                        Severity::Info,
                    );
                }
            }
        });
    }

    fn spawn_decode_loop(self: &Arc<Self>, handle: CameraHandle) {
        let token = CancellationToken::new();
        *self.loop_token.lock().unwrap() = Some(token.clone());

        let controller = Arc::clone(self);
        tokio::spawn(async move {
            controller.decode_loop(handle, token).await;
        });
    }

    async fn decode_loop(self: Arc<Self>, mut handle: CameraHandle, token: CancellationToken) {
        // Cosmetic UI-feedback pause before decode begins
        tokio::select! {
            _ = token.cancelled() => return,
            _ = tokio::time::sleep(SCAN_FEEDBACK_PAUSE) => {}
        }

        loop {
            let frame = tokio::select! {
                _ = token.cancelled() => return,
                frame = handle.frames.recv() => frame,
            };

            match frame {
                None => {
                    // Feed ended underneath us (device unplugged or replaced)
                    debug!("Camera frame feed closed, stopping scanner");
                    self.stop().await;
                    return;
                }
                Some(FrameRead::NoCode) => continue,
                Some(FrameRead::Transient(reason)) => {
                    // Normal scanning noise, never surfaced to the operator
                    trace!("Transient decode read: {reason}");
                    continue;
                }
                Some(FrameRead::Decoded(text)) => {
                    info!("QR decoded ({} chars)", text.len());
                    // Brief visual-success pause, then scan-once shutdown
                    tokio::time::sleep(SCAN_FEEDBACK_PAUSE).await;
                    self.stop().await;
                    self.handle_decoded(text).await;
                    return;
                }
            }
        }
    }

    async fn handle_decoded(self: &Arc<Self>, text: String) {
        match self.sink.on_decoded(text).await {
            DecodeOutcome::Identified => {
                self.retries_remaining
                    .store(MAX_LOOKUP_RETRIES, Ordering::SeqCst);
            }
            DecodeOutcome::LookupFailed => self.schedule_lookup_retry(),
        }
    }

    /// Bounded auto-restart after a failed lookup: one retry cycle per
    /// decode, at most MAX_LOOKUP_RETRIES consecutive cycles.
    fn schedule_lookup_retry(self: &Arc<Self>) {
        let remaining = self.retries_remaining.load(Ordering::SeqCst);
        if remaining == 0 {
            warn!("Lookup retry budget exhausted, scanner stays stopped");
            self.notifier.notify(
                "Adhérent introuvable. Relancez le scanner ou saisissez le numéro manuellement.",
                Severity::Warning,
            );
            self.retries_remaining
                .store(MAX_LOOKUP_RETRIES, Ordering::SeqCst);
            return;
        }
        self.retries_remaining.store(remaining - 1, Ordering::SeqCst);

        let controller = Arc::clone(self);
        let token = self.shutdown.child_token();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(LOOKUP_RETRY_DELAY) => {
                    debug!("Auto-restarting scanner after failed lookup");
                    let _ = controller.start().await;
                }
            }
        });
    }
}
