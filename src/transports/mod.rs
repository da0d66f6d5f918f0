//! Transport implementations for the game channel.
//!
//! Concrete [`Transport`](crate::Transport) and [`Connector`](crate::Connector)
//! implementations live behind feature gates:
//!
//! | Feature                | Connector              | Transport              |
//! |------------------------|------------------------|------------------------|
//! | `transport-websocket`  | [`WebSocketConnector`] | [`WebSocketTransport`] |

#[cfg(feature = "transport-websocket")]
pub mod websocket;

#[cfg(feature = "transport-websocket")]
pub use websocket::{WebSocketConnector, WebSocketTransport};
