//! Error types for stream transports.

use thiserror::Error;

/// Errors raised while establishing or reading a stream.
///
/// None of these are fatal to the monitor: the owning connection reports
/// them as a lifecycle event and moves to `Disconnected`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The endpoint URL uses a scheme no transport understands.
    #[error("Unsupported endpoint scheme: {0}")]
    UnsupportedScheme(String),

    /// The endpoint URL could not be parsed.
    #[error("Invalid endpoint `{endpoint}`: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    /// The handshake with the peer failed.
    #[error("Failed to connect to {endpoint}: {reason}")]
    Connect { endpoint: String, reason: String },

    /// The established stream failed mid-read.
    #[error("Read error: {0}")]
    Read(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for TransportError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        TransportError::Read(err.to_string())
    }
}
