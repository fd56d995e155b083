//! # ACMP Common Library
//!
//! Shared code for the ACMP kiosk service including:
//! - Member data model, record cleaning and identifier normalization
//! - Kiosk event types (KioskEvent enum)
//! - Configuration loading
//! - Elapsed/duration time formatting

pub mod config;
pub mod error;
pub mod events;
pub mod member;
pub mod time;

pub use error::{Error, Result};
pub use member::{Member, Occupation};
