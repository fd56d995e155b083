//! QR scanner subsystem
//!
//! Split at the platform boundary: `backend` owns device enumeration,
//! permission probing and the frame feed; `controller` owns the acquisition
//! lifecycle state machine and the scan-once decode loop. The controller is
//! independent of what is done with decoded text; consumers plug in via
//! [`DecodeSink`].

pub mod backend;
pub mod controller;

pub use backend::{CameraBackend, CameraError, CameraHandle, CameraInfo, FeedCamera, FrameRead};
pub use controller::{DecodeOutcome, DecodeSink, ScannerController};
