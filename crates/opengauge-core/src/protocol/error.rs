//! Protocol errors

use thiserror::Error;

/// Errors that can occur during stream communication
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Not connected to server")]
    NotConnected,

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Invalid message: {0}")]
    InvalidMessage(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
