//! # ACMP Kiosk
//!
//! Attendance check-in service for the ACMP member portal: member registry
//! sync with demo fallback, camera-scanner lifecycle, check-in workflow
//! state machine, and the capped persisted attendance log, exposed to the
//! kiosk front-end over REST + SSE.

pub mod api;
pub mod checkin;
pub mod db;
pub mod error;
pub mod kiosk;
pub mod registry;
pub mod scanner;
pub mod state;

pub use error::{Error, Result};
pub use kiosk::CheckinKiosk;
pub use state::{KioskState, Notifier};
