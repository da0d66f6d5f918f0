#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing,
    dead_code
)]
//! Shared test utilities for fishing session client integration tests.
//!
//! Provides a channel-backed [`MockConnector`] whose every successful
//! connection surfaces as a [`ServerLink`] on the paired [`MockServer`], and
//! helper functions for building the game server's JSON messages.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use fishing_session_client::protocol::{CatchPayload, FightStatePayload, FishState, JoinedPayload};
use fishing_session_client::{Connector, ServerMessage, SessionError, Transport};
use tokio::sync::{mpsc, watch};

/// Upper bound for any single wait in the tests (virtual time).
pub const WAIT: Duration = Duration::from_secs(30);

// ── MockTransport ───────────────────────────────────────────────────

/// What the mock server pushes down a link.
#[derive(Debug)]
enum Frame {
    Text(String),
    Close,
    Reject(String),
}

/// Client side of one mock connection.
pub struct MockTransport {
    incoming: mpsc::UnboundedReceiver<Frame>,
    outgoing: mpsc::UnboundedSender<String>,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, message: String) -> Result<(), SessionError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(SessionError::TransportClosed);
        }
        self.outgoing
            .send(message)
            .map_err(|_| SessionError::TransportSend("server link dropped".into()))
    }

    async fn recv(&mut self) -> Option<Result<String, SessionError>> {
        match self.incoming.recv().await {
            Some(Frame::Text(text)) => Some(Ok(text)),
            Some(Frame::Reject(reason)) => Some(Err(SessionError::ChannelRejected(reason))),
            Some(Frame::Close) | None => None,
        }
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

// ── MockConnector ───────────────────────────────────────────────────

#[derive(Default)]
struct Shared {
    attempts: AtomicUsize,
    urls: StdMutex<Vec<String>>,
    fail_next: AtomicUsize,
    reject_next: AtomicUsize,
}

/// A [`Connector`] that hands every new connection to a [`MockServer`].
#[derive(Clone)]
pub struct MockConnector {
    shared: Arc<Shared>,
    accepted: mpsc::UnboundedSender<ServerLink>,
}

#[async_trait]
impl Connector for MockConnector {
    type Transport = MockTransport;

    async fn connect(&self, url: &str) -> Result<MockTransport, SessionError> {
        self.shared.attempts.fetch_add(1, Ordering::SeqCst);
        self.shared.urls.lock().unwrap().push(url.to_owned());

        let refuse = self
            .shared
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        let reject = self
            .shared
            .reject_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if reject {
            return Err(SessionError::ChannelRejected("403 Forbidden".into()));
        }
        if refuse {
            return Err(SessionError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "connection refused",
            )));
        }

        let (to_client, incoming) = mpsc::unbounded_channel();
        let (outgoing, from_client) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));
        let link = ServerLink {
            to_client,
            from_client,
            closed: Arc::clone(&closed),
        };
        self.accepted
            .send(link)
            .map_err(|_| SessionError::TransportSend("mock server dropped".into()))?;

        Ok(MockTransport {
            incoming,
            outgoing,
            closed,
        })
    }
}

/// Test-side view of every connection attempt.
pub struct MockServer {
    shared: Arc<Shared>,
    accepted: mpsc::UnboundedReceiver<ServerLink>,
}

/// A connector/server pair.
pub fn mock_server() -> (MockConnector, MockServer) {
    let shared = Arc::new(Shared::default());
    let (tx, rx) = mpsc::unbounded_channel();
    (
        MockConnector {
            shared: Arc::clone(&shared),
            accepted: tx,
        },
        MockServer {
            shared,
            accepted: rx,
        },
    )
}

impl MockServer {
    /// Wait for the client to open the next connection.
    pub async fn accept(&mut self) -> ServerLink {
        tokio::time::timeout(WAIT, self.accepted.recv())
            .await
            .expect("timed out waiting for a connection")
            .expect("connector dropped")
    }

    /// A connection that was already opened, if any.
    pub fn try_accept(&mut self) -> Option<ServerLink> {
        self.accepted.try_recv().ok()
    }

    /// Number of connection attempts so far, failed ones included.
    pub fn attempts(&self) -> usize {
        self.shared.attempts.load(Ordering::SeqCst)
    }

    pub fn urls(&self) -> Vec<String> {
        self.shared.urls.lock().unwrap().clone()
    }

    /// Refuse the next `n` connection attempts.
    pub fn fail_next(&self, n: usize) {
        self.shared.fail_next.store(n, Ordering::SeqCst);
    }

    /// Refuse the next `n` handshakes as an authentication failure.
    pub fn reject_next(&self, n: usize) {
        self.shared.reject_next.store(n, Ordering::SeqCst);
    }
}

/// Server side of one mock connection.
pub struct ServerLink {
    to_client: mpsc::UnboundedSender<Frame>,
    from_client: mpsc::UnboundedReceiver<String>,
    closed: Arc<AtomicBool>,
}

impl ServerLink {
    /// Deliver one text frame to the client.
    pub fn push(&self, json: impl Into<String>) {
        let _ = self.to_client.send(Frame::Text(json.into()));
    }

    /// Close the channel cleanly.
    pub fn close(&self) {
        let _ = self.to_client.send(Frame::Close);
    }

    /// Close the channel with the authentication-failure code.
    pub fn reject(&self, reason: &str) {
        let _ = self.to_client.send(Frame::Reject(reason.into()));
    }

    /// Whether the client closed this connection.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Next message the client sent, parsed.
    pub async fn next_sent(&mut self) -> serde_json::Value {
        let text = tokio::time::timeout(WAIT, self.from_client.recv())
            .await
            .expect("timed out waiting for a client message")
            .expect("client transport dropped");
        serde_json::from_str(&text).expect("client sent invalid JSON")
    }

    /// Everything the client has sent so far, parsed.
    pub fn drain(&mut self) -> Vec<serde_json::Value> {
        let mut sent = Vec::new();
        while let Ok(text) = self.from_client.try_recv() {
            sent.push(serde_json::from_str(&text).expect("client sent invalid JSON"));
        }
        sent
    }
}

// ── Waiting ─────────────────────────────────────────────────────────

/// Wait until the published value satisfies `predicate` and return it.
pub async fn wait_until<T: Clone>(
    rx: &mut watch::Receiver<T>,
    predicate: impl FnMut(&T) -> bool,
) -> T {
    tokio::time::timeout(WAIT, rx.wait_for(predicate))
        .await
        .expect("timed out waiting for state")
        .expect("session driver stopped")
        .clone()
}

/// Let the driver run until it goes idle.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

// ── JSON helper functions ───────────────────────────────────────────

pub fn connected_json() -> String {
    serde_json::to_string(&ServerMessage::Connected {
        message: "Connected to game server".into(),
    })
    .expect("connected_json serialization")
}

pub fn joined_json(location_id: u64, location_name: &str) -> String {
    serde_json::to_string(&ServerMessage::Joined {
        session: JoinedPayload {
            location_id,
            location_name: location_name.into(),
            state: "idle".into(),
        },
    })
    .expect("joined_json serialization")
}

pub fn cast_result_json(distance: f64, depth: f64) -> String {
    serde_json::to_string(&ServerMessage::CastResult { distance, depth })
        .expect("cast_result_json serialization")
}

pub fn bite_json(fish: &str) -> String {
    serde_json::to_string(&ServerMessage::Bite {
        fish: fish.into(),
        intensity: 0.7,
    })
    .expect("bite_json serialization")
}

pub fn fight_started_json(fish: &str, weight: f64) -> String {
    serde_json::to_string(&ServerMessage::FightStarted {
        fish: fish.into(),
        weight,
    })
    .expect("fight_started_json serialization")
}

pub fn fight_update_json(line_tension: f64) -> String {
    serde_json::to_string(&ServerMessage::FightUpdate {
        state: FightStatePayload {
            fish_state: FishState::Active,
            fish_stamina: 70.0,
            fish_distance: 15.0,
            fish_direction: 30.0,
            line_tension,
            line_health: 90.0,
            drag_level: 0.5,
            is_critical: line_tension > 85.0,
        },
    })
    .expect("fight_update_json serialization")
}

pub fn catch_success_json(fish: &str, weight: f64, price: u64, experience: u64) -> String {
    serde_json::to_string(&ServerMessage::Catch {
        result: CatchPayload {
            success: true,
            fish_name: fish.into(),
            weight,
            price,
            experience,
            ..CatchPayload::default()
        },
    })
    .expect("catch_success_json serialization")
}

pub fn catch_failed_json(reason: &str) -> String {
    serde_json::to_string(&ServerMessage::Catch {
        result: CatchPayload {
            success: false,
            reason: reason.into(),
            ..CatchPayload::default()
        },
    })
    .expect("catch_failed_json serialization")
}

pub fn error_json(message: &str) -> String {
    serde_json::to_string(&ServerMessage::Error {
        message: message.into(),
    })
    .expect("error_json serialization")
}
