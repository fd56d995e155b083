//! Error types for acmp-kiosk
//!
//! Defines module-specific error types using thiserror for clear error
//! propagation.

use crate::scanner::CameraError;
use thiserror::Error;

/// Main error type for the kiosk service
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Database connection or query errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Member registry fetch/decode errors
    #[error("Registry error: {0}")]
    Registry(String),

    /// Camera acquisition or decode-loop failure
    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),

    /// Member lookup miss
    #[error("Member not found: {0}")]
    MemberNotFound(String),

    /// Operation rejected in the current workflow state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Operator input failed validation
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience Result type using the kiosk Error
pub type Result<T> = std::result::Result<T, Error>;
