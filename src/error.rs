//! Error types for the rover-relay bridge.

use thiserror::Error;

/// The main error type for bridge operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Serial port error.
    #[error("serial port error: {0}")]
    Serial(#[from] tokio_serial::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Telemetry line is not a JSON object.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Line framing error.
    #[error("line error: {0}")]
    Line(#[from] LineError),

    /// No device session is open.
    #[error("not connected")]
    NotConnected,

    /// Channel send error.
    #[error("channel send error")]
    ChannelSend,
}

/// Line framing errors.
#[derive(Debug, Error)]
pub enum LineError {
    /// A line grew past the maximum length without a delimiter.
    #[error("line too long: {size} bytes exceeds maximum {max}")]
    TooLong { size: usize, max: usize },
}

/// Result type alias for bridge operations.
pub type Result<T> = std::result::Result<T, Error>;
