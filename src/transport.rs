//! Transport abstraction for the game channel.
//!
//! The [`Transport`] trait defines one live bidirectional text message channel
//! between the client and the game server. The game protocol uses JSON text
//! messages, so every transport implementation must handle message framing
//! internally (WebSocket frames in the default build).
//!
//! # Opening channels
//!
//! Unlike a one-shot client, the session client has to re-open its channel after
//! every loss, so channel setup lives behind a second trait, [`Connector`]. The
//! connector is handed the full channel URL (including the token query
//! parameter) on every attempt and returns a fresh, open transport.
//!
//! # Implementing a Custom Transport
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use fishing_session_client::error::SessionError;
//! use fishing_session_client::transport::{Connector, Transport};
//!
//! struct MyTransport { /* ... */ }
//!
//! #[async_trait]
//! impl Transport for MyTransport {
//!     async fn send(&mut self, message: String) -> Result<(), SessionError> {
//!         // Send the JSON text message over your transport
//!         Ok(())
//!     }
//!
//!     async fn recv(&mut self) -> Option<Result<String, SessionError>> {
//!         // Return None when the connection is closed cleanly
//!         None
//!     }
//!
//!     async fn close(&mut self) -> Result<(), SessionError> {
//!         Ok(())
//!     }
//! }
//!
//! struct MyConnector;
//!
//! #[async_trait]
//! impl Connector for MyConnector {
//!     type Transport = MyTransport;
//!
//!     async fn connect(&self, url: &str) -> Result<MyTransport, SessionError> {
//!         Ok(MyTransport {})
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::error::SessionError;

/// A bidirectional text message transport carrying the game protocol.
///
/// Implementors shuttle serialized JSON strings between the client and server.
/// Each call to [`send`](Transport::send) transmits one complete JSON message.
/// Each call to [`recv`](Transport::recv) returns one complete JSON message.
///
/// # Cancel Safety
///
/// The [`recv`](Transport::recv) method **MUST** be cancel-safe because it is used
/// inside `tokio::select!`. If `recv` is cancelled before completion, calling it
/// again must not lose data. Channel-based implementations (e.g., wrapping
/// `mpsc::Receiver`) are naturally cancel-safe.
#[async_trait]
pub trait Transport: Send + 'static {
    /// Send a JSON text message to the server.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::TransportSend`] if the message could not be sent
    /// (e.g., connection broken, write buffer full).
    async fn send(&mut self, message: String) -> Result<(), SessionError>;

    /// Receive the next JSON text message from the server.
    ///
    /// Returns:
    /// - `Some(Ok(text))`: a complete message was received
    /// - `Some(Err(SessionError::ChannelRejected(_)))`: the server refused the channel
    /// - `Some(Err(e))`: any other transport error
    /// - `None`: the connection was closed cleanly by the server
    async fn recv(&mut self) -> Option<Result<String, SessionError>>;

    /// Close the transport connection gracefully.
    ///
    /// # Errors
    ///
    /// Returns an error if the graceful shutdown fails. Implementations should
    /// still release resources even if the close handshake fails.
    async fn close(&mut self) -> Result<(), SessionError>;
}

/// Opens game channels.
///
/// Called once per connection attempt; the session client never holds more than
/// one transport produced by a connector at a time.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// The transport type produced by this connector.
    type Transport: Transport;

    /// Open a new channel to `url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel cannot be established.
    async fn connect(&self, url: &str) -> Result<Self::Transport, SessionError>;
}
