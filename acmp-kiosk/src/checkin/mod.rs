//! Check-in workflow
//!
//! `session` owns the check-in state machine; `log` owns the capped,
//! persisted attendance record list. The session manager never writes the
//! store directly.

pub mod log;
pub mod session;

pub use log::{AttendanceLog, AttendanceRecord, LogStats};
pub use session::{CheckinSession, SessionManager};
