//! # Fishing Session Client
//!
//! Async Rust client for the real-time channel of a fishing minigame.
//!
//! The crate keeps a local mirror of one player's fishing session in sync with
//! an authoritative game server over a bidirectional JSON text channel: it owns
//! the connection (with automatic reconnect), encodes player actions, applies
//! server events to a phase state machine, drives continuous reel input during
//! a fight, and credits landed catches to the player's account optimistically.
//!
//! ## Features
//!
//! - **Transport-agnostic**: implement [`Connector`] and [`Transport`] for any backend
//! - **Wire-compatible**: protocol types match the game server's flat `type`-tagged JSON
//! - **WebSocket built-in**: the default `transport-websocket` feature provides
//!   [`WebSocketConnector`](transports::WebSocketConnector)
//! - **Observable**: session and account snapshots are published on `watch` channels
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use fishing_session_client::{ClientConfig, FileTokenStore, SessionClient};
//! use fishing_session_client::transports::WebSocketConnector;
//!
//! let tokens = Arc::new(FileTokenStore::new("/tmp/fishing-token"));
//! let client = SessionClient::start(WebSocketConnector, tokens, ClientConfig::default());
//! client.join_location(1)?;
//! ```

pub mod account;
pub mod client;
pub mod codec;
pub mod command;
pub mod config;
pub mod connection;
pub mod error;
pub mod event;
pub mod progression;
pub mod protocol;
pub mod reel;
pub mod session;
pub mod token;
pub mod transport;
pub mod transports;

// Re-export primary types for ergonomic imports.
pub use account::{Account, Profile};
pub use client::SessionClient;
pub use command::Command;
pub use config::{ClientConfig, ReconnectPolicy};
pub use error::SessionError;
pub use event::SessionEvent;
pub use protocol::{ClientMessage, ServerMessage};
pub use session::{CatchOutcome, Connectivity, Phase, Session};
pub use token::{FileTokenStore, MemoryTokenStore, TokenStore};
pub use transport::{Connector, Transport};
