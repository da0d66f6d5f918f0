//! Error types for the fishing session client.

use thiserror::Error;

/// Errors that can occur when using the fishing session client.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Failed to send a message through the transport.
    #[error("transport send error: {0}")]
    TransportSend(String),

    /// Failed to receive a message from the transport.
    #[error("transport receive error: {0}")]
    TransportReceive(String),

    /// The transport connection was closed unexpectedly.
    #[error("transport connection closed")]
    TransportClosed,

    /// The server refused the channel, typically because the token was rejected.
    #[error("channel rejected by server: {0}")]
    ChannelRejected(String),

    /// Failed to serialize or deserialize a protocol message.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Attempted to transmit while no channel is open.
    #[error("not connected to server")]
    NotConnected,

    /// The background session driver is no longer running.
    #[error("session driver stopped")]
    Stopped,

    /// An operation timed out.
    #[error("operation timed out")]
    Timeout,

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized [`Result`] type for fishing session client operations.
pub type Result<T> = std::result::Result<T, SessionError>;
