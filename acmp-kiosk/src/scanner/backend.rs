//! Camera backend boundary
//!
//! Classification of platform camera failures happens here, once, into a
//! closed error-kind enum; nothing downstream inspects error strings. The
//! shipped [`FeedCamera`] backend is fed already-decoded frame text by the
//! collaborator capture layer (kiosk front-end or tests); a platform capture
//! integration would implement [`CameraBackend`] the same way.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::debug;

/// Frame-feed channel depth; decode frames are consumed continuously
const FRAME_CHANNEL_CAPACITY: usize = 16;

/// Closed camera failure taxonomy, produced at the backend boundary
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CameraError {
    #[error("camera permission denied")]
    PermissionDenied,

    #[error("no camera found")]
    NoCameraFound,

    #[error("camera capture unsupported in this environment")]
    UnsupportedEnvironment,

    #[error("camera device busy")]
    DeviceBusy,

    #[error("camera stream failed to start")]
    StreamStartFailed,

    #[error("camera failure: {0}")]
    Unknown(String),
}

impl CameraError {
    /// Distinct user-facing message for each failure kind
    pub fn user_message(&self) -> String {
        match self {
            CameraError::PermissionDenied => {
                "Accès à la caméra refusé. Autorisez la caméra dans votre navigateur.".to_string()
            }
            CameraError::NoCameraFound => "Aucune caméra détectée sur cet appareil.".to_string(),
            CameraError::UnsupportedEnvironment => {
                "La caméra n'est pas prise en charge dans cet environnement.".to_string()
            }
            CameraError::DeviceBusy => {
                "La caméra est déjà utilisée par une autre application.".to_string()
            }
            CameraError::StreamStartFailed => {
                "Impossible de démarrer le flux de la caméra.".to_string()
            }
            CameraError::Unknown(message) => format!("Erreur caméra inattendue : {message}"),
        }
    }

    /// Whether this failure should be followed by a manual-entry fallback offer
    pub fn offers_manual_entry(&self) -> bool {
        matches!(self, CameraError::PermissionDenied | CameraError::Unknown(_))
    }
}

/// An enumerable capture device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraInfo {
    pub id: String,
    pub label: String,
}

impl CameraInfo {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

/// One read from the decode loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameRead {
    /// A QR code was decoded to text
    Decoded(String),
    /// Frame contained no code (normal scanning noise)
    NoCode,
    /// Transient read failure (busy frame, decode timeout)
    Transient(String),
}

/// An open camera stream: frames arrive on the channel until the handle is
/// dropped (teardown is dropping the receiver, and never fails).
pub struct CameraHandle {
    pub camera: CameraInfo,
    pub frames: mpsc::Receiver<FrameRead>,
}

/// Platform camera seam.
///
/// Acquisition-level failures surface as [`CameraError`] from these calls;
/// per-frame read noise travels in-band as [`FrameRead`] variants.
pub trait CameraBackend: Send + Sync {
    /// Enumerate available capture devices
    fn list_cameras(&self) -> Result<Vec<CameraInfo>, CameraError>;

    /// Probe camera permission explicitly, so permission failures are
    /// distinguished from device failures
    fn probe_permission(&self, camera: &CameraInfo) -> Result<(), CameraError>;

    /// Open the device and begin the frame feed
    fn open(&self, camera: &CameraInfo) -> Result<CameraHandle, CameraError>;
}

/// Select the rear/back-facing camera by label heuristic, else the first.
/// None only when the list is empty.
pub fn select_camera(cameras: &[CameraInfo]) -> Option<&CameraInfo> {
    cameras
        .iter()
        .find(|c| {
            let label = c.label.to_lowercase();
            label.contains("back") || label.contains("rear") || label.contains("arrière")
        })
        .or_else(|| cameras.first())
}

/// Channel-fed camera backend.
///
/// The collaborator capture layer pushes decoded frame text in through
/// [`FeedCamera::push_frame`]; faults can be armed to exercise every
/// acquisition failure path.
pub struct FeedCamera {
    cameras: Vec<CameraInfo>,
    list_fault: Mutex<Option<CameraError>>,
    permission_fault: Mutex<Option<CameraError>>,
    open_fault: Mutex<Option<CameraError>>,
    feed_tx: Mutex<Option<mpsc::Sender<FrameRead>>>,
    /// Successful acquisitions since construction (diagnostics)
    opens: AtomicUsize,
}

impl FeedCamera {
    pub fn new(cameras: Vec<CameraInfo>) -> Self {
        Self {
            cameras,
            list_fault: Mutex::new(None),
            permission_fault: Mutex::new(None),
            open_fault: Mutex::new(None),
            feed_tx: Mutex::new(None),
            opens: AtomicUsize::new(0),
        }
    }

    /// How many times the device was successfully acquired
    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// Conventional kiosk hardware: one front and one rear camera
    pub fn with_default_cameras() -> Self {
        Self::new(vec![
            CameraInfo::new("cam-front", "Caméra avant"),
            CameraInfo::new("cam-rear", "Caméra arrière"),
        ])
    }

    /// Arm an enumeration fault (e.g. UnsupportedEnvironment)
    pub fn set_list_fault(&self, fault: Option<CameraError>) {
        *self.list_fault.lock().unwrap() = fault;
    }

    /// Arm a permission-probe fault
    pub fn set_permission_fault(&self, fault: Option<CameraError>) {
        *self.permission_fault.lock().unwrap() = fault;
    }

    /// Arm an open/stream-start fault
    pub fn set_open_fault(&self, fault: Option<CameraError>) {
        *self.open_fault.lock().unwrap() = fault;
    }

    /// Push one frame read into the open stream.
    ///
    /// Returns false when no stream is open (frame discarded).
    pub fn push_frame(&self, read: FrameRead) -> bool {
        let guard = self.feed_tx.lock().unwrap();
        match guard.as_ref() {
            Some(tx) => tx.try_send(read).is_ok(),
            None => {
                debug!("Frame pushed while no camera stream is open, discarding");
                false
            }
        }
    }

    /// Push decoded QR text into the open stream
    pub fn push_decoded(&self, text: impl Into<String>) -> bool {
        self.push_frame(FrameRead::Decoded(text.into()))
    }
}

impl CameraBackend for FeedCamera {
    fn list_cameras(&self) -> Result<Vec<CameraInfo>, CameraError> {
        if let Some(fault) = self.list_fault.lock().unwrap().clone() {
            return Err(fault);
        }
        Ok(self.cameras.clone())
    }

    fn probe_permission(&self, _camera: &CameraInfo) -> Result<(), CameraError> {
        match self.permission_fault.lock().unwrap().clone() {
            Some(fault) => Err(fault),
            None => Ok(()),
        }
    }

    fn open(&self, camera: &CameraInfo) -> Result<CameraHandle, CameraError> {
        if let Some(fault) = self.open_fault.lock().unwrap().clone() {
            return Err(fault);
        }

        let (tx, rx) = mpsc::channel(FRAME_CHANNEL_CAPACITY);
        // Replacing the sender tears down any previous feed
        *self.feed_tx.lock().unwrap() = Some(tx);
        self.opens.fetch_add(1, Ordering::SeqCst);

        Ok(CameraHandle {
            camera: camera.clone(),
            frames: rx,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_camera_prefers_rear_label() {
        let cameras = vec![
            CameraInfo::new("0", "Front camera"),
            CameraInfo::new("1", "Back camera"),
        ];
        assert_eq!(select_camera(&cameras).unwrap().id, "1");

        let french = vec![
            CameraInfo::new("0", "Caméra avant"),
            CameraInfo::new("1", "Caméra arrière"),
        ];
        assert_eq!(select_camera(&french).unwrap().id, "1");
    }

    #[test]
    fn test_select_camera_falls_back_to_first() {
        let cameras = vec![
            CameraInfo::new("a", "Webcam C920"),
            CameraInfo::new("b", "Capture card"),
        ];
        assert_eq!(select_camera(&cameras).unwrap().id, "a");
    }

    #[test]
    fn test_feed_discards_frames_without_stream() {
        let camera = FeedCamera::with_default_cameras();
        assert!(!camera.push_decoded("ACM01"));
    }

    #[tokio::test]
    async fn test_feed_delivers_frames_to_open_stream() {
        let camera = FeedCamera::with_default_cameras();
        let cameras = camera.list_cameras().unwrap();
        let mut handle = camera.open(select_camera(&cameras).unwrap()).unwrap();

        assert!(camera.push_decoded("ACM01"));
        assert_eq!(
            handle.frames.recv().await,
            Some(FrameRead::Decoded("ACM01".to_string()))
        );
    }

    #[test]
    fn test_armed_faults_surface() {
        let camera = FeedCamera::with_default_cameras();
        let cameras = camera.list_cameras().unwrap();

        camera.set_permission_fault(Some(CameraError::PermissionDenied));
        assert_eq!(
            camera.probe_permission(&cameras[0]),
            Err(CameraError::PermissionDenied)
        );

        camera.set_open_fault(Some(CameraError::DeviceBusy));
        assert!(matches!(
            camera.open(&cameras[0]),
            Err(CameraError::DeviceBusy)
        ));
    }

    #[test]
    fn test_error_messages_are_distinct() {
        let kinds = [
            CameraError::PermissionDenied,
            CameraError::NoCameraFound,
            CameraError::UnsupportedEnvironment,
            CameraError::DeviceBusy,
            CameraError::StreamStartFailed,
            CameraError::Unknown("x".to_string()),
        ];
        let mut messages: Vec<String> = kinds.iter().map(|k| k.user_message()).collect();
        messages.sort();
        messages.dedup();
        assert_eq!(messages.len(), kinds.len());
    }
}
