//! # Error Types
//!
//! Custom error types for the bridge using `thiserror`.
//!
//! Protocol-level failures (bad packets, transmit failures) are not errors here:
//! they are reported to the host as status lines.

use thiserror::Error;

use crate::radio::RadioError;

/// Main error type for the bridge
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serial port could not be opened or configured
    #[error("Serial port error: {0}")]
    Serial(String),

    /// None of the candidate serial devices could be opened
    #[error("No serial device found (tried: {0})")]
    SerialPortNotFound(String),

    /// Radio settings outside the driver limits
    #[error("Radio error: {0}")]
    Radio(#[from] RadioError),

    /// Radio failed to initialize; the gateway is halted
    #[error("Radio failed to initialize (code {0})")]
    RadioInit(i16),
}

/// Result type alias for the bridge
pub type Result<T> = std::result::Result<T, BridgeError>;
